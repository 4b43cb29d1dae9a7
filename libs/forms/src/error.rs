//! Error types for form parsing and validation
//!
//! User-correctable problems are reported as data ([`SlotError`],
//! [`FieldError`], [`ErrorMap`]). [`SchemaError`] is reserved for defects in
//! how a schema was written.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors produced while turning slot input into a time range
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    /// One of the endpoints was left empty
    #[error("Please enter both start and end date/time")]
    Missing,

    /// Text matches neither accepted date/time grammar
    #[error("Please use format: DD/MM/YYYY, HH:MM AM/PM")]
    Format {
        /// The rejected input, kept for logging
        input: String,
    },

    /// Both endpoints parsed but start is not strictly before end
    #[error("End time must be after start time")]
    Range,
}

/// Category of a failed field constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    /// A required field is empty
    Required,
    /// Text is shorter or longer than allowed
    Length,
    /// A number falls outside its declared bounds
    NumericRange,
    /// Text does not have the expected shape (regex, email, URL, number, choice)
    Pattern,
    /// A constraint against a sibling field failed
    CrossField,
}

/// A single failed constraint with its display message
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct FieldError {
    pub kind: FieldErrorKind,
    pub message: String,
}

impl FieldError {
    pub fn new(kind: FieldErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Schema authoring defects
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The same field was declared twice
    #[error("Field `{0}` is declared more than once")]
    DuplicateField(String),

    /// A cross-field constraint names a field the schema does not declare
    #[error("Field `{field}` references unknown field `{reference}`")]
    UnknownReference { field: String, reference: String },

    /// A lookup named a field the schema does not declare
    #[error("Unknown field `{0}`")]
    UnknownField(String),

    /// A pattern constraint failed to compile
    #[error("Invalid pattern for field `{field}`: {reason}")]
    InvalidPattern { field: String, reason: String },
}

/// Upstream payloads whose overall shape cannot be read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Expected {what} to be a JSON object")]
    NotAnObject { what: &'static str },

    #[error("Expected {what} to be a JSON array")]
    NotAnArray { what: &'static str },
}

/// Field name to message. A missing key means the field is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap(BTreeMap<String, String>);

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    /// Record the outcome of validating one field: insert on failure, delete on success
    pub fn apply(&mut self, field: &str, outcome: Option<FieldError>) {
        match outcome {
            Some(error) => self.insert(field, error.message),
            None => {
                self.remove(field);
            }
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl IntoIterator for ErrorMap {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
