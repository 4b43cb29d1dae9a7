//! Time-slot input parsing and session selection
//!
//! Accepted grammars, tried in order:
//!
//! 1. ISO-8601: RFC 3339 with an offset, a naive `YYYY-MM-DD[T ]HH:MM[:SS[.f]]`
//!    read as UTC, or a bare `YYYY-MM-DD` at midnight UTC.
//! 2. `DD/MM/YYYY, HH:MM AM/PM`, with the meridiem optional (24-hour clock
//!    when absent).
//!
//! Slash dates are always day-first. There is no locale-dependent fallback,
//! so `01/02/2025, 10:00 AM` is 1 February and never 2 January.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;
use tracing::debug;

use crate::error::SlotError;

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];

fn slash_date_regex() -> &'static Regex {
    static SLASH_DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    SLASH_DATE_REGEX.get_or_init(|| {
        Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("Failed to compile slash date regex")
    })
}

fn clock_regex() -> &'static Regex {
    static CLOCK_REGEX: OnceLock<Regex> = OnceLock::new();
    CLOCK_REGEX.get_or_init(|| {
        Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?\s*(?i:([ap])\.?m\.?)?$")
            .expect("Failed to compile clock regex")
    })
}

fn parse_iso(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    let with_offset = match text.strip_suffix(['Z', 'z']) {
        Some(rest) => format!("{rest}+00:00"),
        None => text.to_string(),
    };
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&with_offset, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    let caps = clock_regex().captures(text)?;
    let hour: u32 = caps[1].parse().ok()?;
    let minute: u32 = caps[2].parse().ok()?;
    let second: u32 = match caps.get(3) {
        Some(s) => s.as_str().parse().ok()?,
        None => 0,
    };

    let hour = match caps.get(4).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(meridiem) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (meridiem.as_str(), hour) {
                ("a", 12) => 0,
                ("a", h) => h,
                ("p", 12) => 12,
                (_, h) => h + 12,
            }
        }
        None => hour,
    };

    NaiveTime::from_hms_opt(hour, minute, second)
}

fn parse_day_first(text: &str) -> Option<DateTime<Utc>> {
    let (date_part, time_part) = text.split_once(',')?;
    let caps = slash_date_regex().captures(date_part.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = parse_clock(time_part.trim())?;
    Some(date.and_time(time).and_utc())
}

/// Parse one endpoint of a slot into an absolute instant
pub fn parse_date_time(text: &str) -> Result<DateTime<Utc>, SlotError> {
    let text = text.trim();
    parse_iso(text)
        .or_else(|| parse_day_first(text))
        .ok_or_else(|| {
            debug!("Rejected slot date/time input: {}", text);
            SlotError::Format {
                input: text.to_string(),
            }
        })
}

/// Canonical ISO-8601 form, e.g. `2025-12-23T10:00:00.000Z`
pub fn to_iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Raw slot input as typed by the mentor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSlotInput {
    #[serde(alias = "startDateTime", default)]
    pub start: String,
    #[serde(alias = "endDateTime", default)]
    pub end: String,
}

impl TimeSlotInput {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Parse both endpoints and enforce `start < end`
    pub fn parse(&self) -> Result<TimeSlotRange, SlotError> {
        if self.start.trim().is_empty() || self.end.trim().is_empty() {
            return Err(SlotError::Missing);
        }
        let start = parse_date_time(&self.start)?;
        let end = parse_date_time(&self.end)?;
        TimeSlotRange::new(start, end)
    }
}

/// A validated slot; `start` is strictly before `end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlotRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeSlotRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, SlotError> {
        if start >= end {
            return Err(SlotError::Range);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn payload(&self) -> TimeSlotPayload {
        TimeSlotPayload {
            start_time: to_iso(&self.start),
            end_time: to_iso(&self.end),
        }
    }

    /// Request body for the upstream "create time slots" call
    pub fn into_request(self, selection: &SessionSelection) -> CreateTimeSlots {
        CreateTimeSlots {
            session_id: selection.session_id().map(String::from),
            timeslots: vec![self.payload()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotPayload {
    pub start_time: String,
    pub end_time: String,
}

/// Upstream request body; a `null` session asks the backend to create one
/// from the mentor's profile defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTimeSlots {
    pub session_id: Option<String>,
    pub timeslots: Vec<TimeSlotPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionRef {
    pub position_name: Option<String>,
}

/// A session offering as listed by the upstream API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSummary {
    pub id: Option<String>,
    pub location_name: Option<String>,
    #[serde(rename = "Position")]
    pub position: Option<PositionRef>,
    #[serde(deserialize_with = "price_text")]
    pub price: Option<String>,
}

/// Prices arrive as numbers or as DECIMAL text. Text is kept as sent so
/// `"80.50"` still reads `80.50`; whole floats drop their fraction.
fn price_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
            _ => n.to_string(),
        }),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

impl SessionSummary {
    /// Display label: location, else position name, else id, followed by the price
    pub fn label(&self) -> String {
        let name = self
            .location_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.position
                    .as_ref()
                    .and_then(|p| p.position_name.as_deref())
                    .filter(|s| !s.is_empty())
            })
            .or(self.id.as_deref())
            .unwrap_or_default();
        let price = self.price.as_deref().unwrap_or_default();
        format!("{name} - ${price}")
    }
}

/// Which session new slots are created under
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionSelection {
    /// A session the mentor already offers
    Existing { id: String },
    /// No session yet; the backend derives one from profile defaults
    #[default]
    AutoCreate,
}

impl SessionSelection {
    /// First listed session if it has an id, otherwise auto-create
    pub fn default_for(sessions: &[SessionSummary]) -> Self {
        sessions
            .first()
            .and_then(|s| s.id.as_deref())
            .filter(|id| !id.is_empty())
            .map(|id| SessionSelection::Existing { id: id.to_string() })
            .unwrap_or(SessionSelection::AutoCreate)
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            SessionSelection::Existing { id } => Some(id),
            SessionSelection::AutoCreate => None,
        }
    }
}
