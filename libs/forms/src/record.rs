//! Lookups over loosely typed upstream JSON
//!
//! The backend mixes key spellings (`first_name` next to `firstName`) and
//! sends DECIMAL columns as strings. These helpers read a value from the
//! first key that holds something meaningful, so one odd field never blanks
//! the rest of a record.

use serde_json::{Map, Value};

use crate::error::RecordError;

pub type Object = Map<String, Value>;

pub fn as_object<'a>(value: &'a Value, what: &'static str) -> Result<&'a Object, RecordError> {
    value.as_object().ok_or(RecordError::NotAnObject { what })
}

pub fn as_array<'a>(value: &'a Value, what: &'static str) -> Result<&'a [Value], RecordError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or(RecordError::NotAnArray { what })
}

/// A list sent either bare or under one of `keys`
pub fn list<'a>(
    raw: &'a Value,
    keys: &[&str],
    what: &'static str,
) -> Result<&'a [Value], RecordError> {
    if let Ok(items) = as_array(raw, what) {
        return Ok(items);
    }
    raw.as_object()
        .and_then(|wrapper| {
            keys.iter()
                .find_map(|key| wrapper.get(*key).and_then(Value::as_array))
        })
        .map(Vec::as_slice)
        .ok_or(RecordError::NotAnArray { what })
}

/// Null, `false`, zero and the empty string count as absent
fn is_set(value: &&Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn set_values<'a>(object: &'a Object, keys: &'a [&str]) -> impl Iterator<Item = &'a Value> + 'a {
    keys.iter().filter_map(|key| object.get(*key)).filter(is_set)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text of the first key holding a scalar; numbers are rendered as text
pub fn text(object: &Object, keys: &[&str]) -> Option<String> {
    set_values(object, keys).find_map(scalar_text)
}

/// Number of the first key holding a number or numeric string
pub fn number(object: &Object, keys: &[&str]) -> Option<f64> {
    set_values(object, keys).find_map(|value| match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}

/// First key holding a nested object
pub fn object<'a>(object: &'a Object, keys: &'a [&str]) -> Option<&'a Object> {
    set_values(object, keys).find_map(Value::as_object)
}

/// Id of a related record sent either as `{ "id": ... }` or as the bare id
pub fn reference_id(object: &Object, keys: &[&str]) -> Option<String> {
    set_values(object, keys).find_map(|value| match value {
        Value::Object(related) => text(related, &["id"]),
        other => scalar_text(other),
    })
}
