//! Certificates as listed on the mentor's certification page

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::RecordError;
use crate::record::{self, Object};
use crate::slot::parse_date_time;

const NOT_AVAILABLE: &str = "N/A";

/// One certificate ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateView {
    pub id: Option<String>,
    pub certificate_number: Option<String>,
    pub program_name: String,
    pub mentor_name: String,
    pub student_name: String,
    pub student_id: String,
    pub start_date: String,
    pub end_date: String,
    pub duration: String,
    pub status: &'static str,
    pub issue_date: String,
}

/// `first last`, trimmed; either part may be missing
pub(crate) fn full_name(person: &Object) -> String {
    let first = record::text(person, &["first_name"]).unwrap_or_default();
    let last = record::text(person, &["last_name"]).unwrap_or_default();
    format!("{first} {last}").trim().to_string()
}

/// Leading characters of an id, upper-cased
pub(crate) fn short_id(id: &str, len: usize) -> String {
    id.chars().take(len).collect::<String>().to_uppercase()
}

pub(crate) fn instant(object: &Object, key: &str) -> Option<DateTime<Utc>> {
    record::text(object, &[key]).and_then(|text| parse_date_time(&text).ok())
}

/// `DD/MM/YYYY`
pub(crate) fn day_month_year(instant: &DateTime<Utc>) -> String {
    instant.format("%d/%m/%Y").to_string()
}

fn plural(count: i64, unit: &str) -> String {
    if count > 1 {
        format!("{count} {unit}s")
    } else {
        format!("{count} {unit}")
    }
}

/// Whole hours and minutes between two instants, e.g. `2 hours 30 mins`
pub fn duration_label(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Option<String> {
    let minutes_total = (*end - *start).num_minutes();
    if minutes_total < 0 {
        return None;
    }
    let (hours, minutes) = (minutes_total / 60, minutes_total % 60);
    Some(match (hours, minutes) {
        (0, m) => plural(m, "min"),
        (h, 0) => plural(h, "hour"),
        (h, m) => format!("{} {}", plural(h, "hour"), plural(m, "min")),
    })
}

impl CertificateView {
    pub fn from_object(cert: &Object) -> Self {
        let empty = Object::new();
        let booking = record::object(cert, &["Booking"]).unwrap_or(&empty);
        let student = record::object(cert, &["AccUser"]);

        let program_name = record::object(cert, &["Position"])
            .and_then(|position| record::text(position, &["position_name"]))
            .or_else(|| record::text(booking, &["position_name_snapshot"]))
            .unwrap_or_else(|| "Shadowing Program".to_string());

        let mentor_name = record::object(cert, &["Mentor"])
            .map(full_name)
            .unwrap_or_else(|| "Mentor".to_string());

        let student_name = match student {
            Some(student) => full_name(student),
            None => record::text(booking, &["acc_user_name_snapshot"])
                .unwrap_or_else(|| "Student".to_string()),
        };

        let student_id = student
            .and_then(|student| record::text(student, &["id"]))
            .map(|id| format!("U{}", short_id(&id, 4)))
            .unwrap_or_else(|| "U0000".to_string());

        let issued = instant(cert, "issue_date");
        let starts = instant(booking, "start_date_snapshot");
        let ends = instant(booking, "end_date_snapshot");
        let shown = |at: Option<DateTime<Utc>>| {
            at.or(issued)
                .map(|at| day_month_year(&at))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        };

        let duration = match (starts, ends) {
            (Some(start), Some(end)) => duration_label(&start, &end),
            _ => None,
        };

        Self {
            id: record::text(cert, &["id"]),
            certificate_number: record::text(cert, &["certificate_number"]),
            program_name,
            mentor_name,
            student_name,
            student_id,
            start_date: shown(starts),
            end_date: shown(ends),
            duration: duration.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            status: "Completed",
            issue_date: issued
                .map(|at| day_month_year(&at))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        }
    }
}

/// Map a certificate listing; entries that are not objects are skipped
pub fn certificate_views(raw: &Value) -> Result<Vec<CertificateView>, RecordError> {
    Ok(record::list(raw, &["certificates", "data"], "certificates")?
        .iter()
        .filter_map(Value::as_object)
        .map(CertificateView::from_object)
        .collect())
}
