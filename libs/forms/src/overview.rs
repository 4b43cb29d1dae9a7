//! Dashboard home: headline totals, monthly trends and weekly performance

use serde::Serialize;
use serde_json::Value;

use crate::record::{self, Object};

pub const OVERVIEW_UNAVAILABLE: &str = "Failed to load dashboard data. Please try again later.";

/// A headline figure with its growth against the previous period
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatTotal {
    pub total: f64,
    pub growth: f64,
}

impl StatTotal {
    fn from_object(summary: &Object, key: &str) -> Self {
        record::object(summary, &[key])
            .map(|stat| Self {
                total: record::number(stat, &["total"]).unwrap_or(0.0),
                growth: record::number(stat, &["growth"]).unwrap_or(0.0),
            })
            .unwrap_or_default()
    }
}

/// Zeroed when the upstream summary is missing or malformed
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub bookings: StatTotal,
    pub revenue: StatTotal,
    pub certifications: StatTotal,
}

impl DashboardSummary {
    pub fn from_value(raw: &Value) -> Self {
        match raw.as_object() {
            Some(summary) => Self {
                bookings: StatTotal::from_object(summary, "bookings"),
                revenue: StatTotal::from_object(summary, "revenue"),
                certifications: StatTotal::from_object(summary, "certifications"),
            },
            None => Self::default(),
        }
    }
}

/// One point of the revenue and bookings chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub month: String,
    pub bookings: f64,
    pub revenue: f64,
}

pub fn trend_points(raw: &Value) -> Vec<TrendPoint> {
    record::list(raw, &["trends", "data"], "trends")
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_object)
        .map(|point| TrendPoint {
            month: record::text(point, &["month"]).unwrap_or_default(),
            bookings: record::number(point, &["bookings"]).unwrap_or(0.0),
            revenue: record::number(point, &["revenue"]).unwrap_or(0.0),
        })
        .collect()
}

/// Sessions per weekday by outcome. The backend has no "incomplete"
/// figure yet, so it stays zero unless sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyPerformance {
    pub day: String,
    pub completed: f64,
    pub incomplete: f64,
    pub canceled: f64,
}

/// Reads `{ "weekly": [{ day, completed, cancelled }] }`; both spellings
/// of "canceled" are accepted
pub fn weekly_performance(raw: &Value) -> Vec<WeeklyPerformance> {
    record::list(raw, &["weekly"], "weekly performance")
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_object)
        .map(|day| WeeklyPerformance {
            day: record::text(day, &["day"]).unwrap_or_default(),
            completed: record::number(day, &["completed"]).unwrap_or(0.0),
            incomplete: record::number(day, &["incomplete"]).unwrap_or(0.0),
            canceled: record::number(day, &["cancelled", "canceled"]).unwrap_or(0.0),
        })
        .collect()
}

/// Everything the dashboard home renders. `warning` is set when the data
/// could not be loaded and zeroed figures are shown instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardOverview {
    pub summary: DashboardSummary,
    pub trends: Vec<TrendPoint>,
    pub weekly: Vec<WeeklyPerformance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl DashboardOverview {
    pub fn new(summary: &Value, trends: &Value, weekly: &Value) -> Self {
        Self {
            summary: DashboardSummary::from_value(summary),
            trends: trend_points(trends),
            weekly: weekly_performance(weekly),
            warning: None,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            warning: Some(OVERVIEW_UNAVAILABLE.to_string()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_reads_totals_and_growth() {
        let summary = DashboardSummary::from_value(&json!({
            "bookings": {"total": 42, "growth": 12.5},
            "revenue": {"total": "1250.00", "growth": -3},
            "certifications": null
        }));
        assert_eq!(summary.bookings, StatTotal { total: 42.0, growth: 12.5 });
        assert_eq!(summary.revenue, StatTotal { total: 1250.0, growth: -3.0 });
        assert_eq!(summary.certifications, StatTotal::default());

        assert_eq!(DashboardSummary::from_value(&json!("oops")), DashboardSummary::default());
    }

    #[test]
    fn weekly_accepts_both_cancel_spellings() {
        let weekly = weekly_performance(&json!({"weekly": [
            {"day": "Mon", "completed": 3, "cancelled": 1},
            {"day": "Tue", "canceled": 2},
        ]}));
        assert_eq!(
            weekly,
            vec![
                WeeklyPerformance {
                    day: "Mon".to_string(),
                    completed: 3.0,
                    incomplete: 0.0,
                    canceled: 1.0
                },
                WeeklyPerformance {
                    day: "Tue".to_string(),
                    completed: 0.0,
                    incomplete: 0.0,
                    canceled: 2.0
                },
            ]
        );
        assert!(weekly_performance(&json!({})).is_empty());
    }

    #[test]
    fn trends_accept_bare_arrays() {
        let trends = trend_points(&json!([{"month": "Jan", "bookings": 4, "revenue": "400"}]));
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].month, "Jan");
        assert_eq!(trends[0].revenue, 400.0);
    }

    #[test]
    fn unavailable_overview_is_zeroed_with_a_warning() {
        let overview = DashboardOverview::unavailable();
        assert_eq!(overview.summary, DashboardSummary::default());
        assert!(overview.trends.is_empty());
        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["warning"], OVERVIEW_UNAVAILABLE);
        assert_eq!(json["summary"]["bookings"]["total"], 0.0);
    }
}
