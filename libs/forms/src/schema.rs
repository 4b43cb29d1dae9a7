//! Declarative, schema-driven form validation
//!
//! A [`Schema`] is an ordered list of [`FieldSpec`]s, each holding an ordered
//! chain of [`Constraint`]s. Whole-form validation stops at the first failing
//! constraint of each field and collects one message per failing field.
//! Every constraint except `Required` treats an empty value as absent and
//! passes it.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::error::{ErrorMap, FieldError, FieldErrorKind, SchemaError};

/// Predicate used by [`Constraint::Custom`]: `(value, all values) -> passes`
pub type Predicate = fn(&str, &FormValues) -> bool;

/// Current form state as plain strings keyed by field name
///
/// Missing keys read as the empty string. When deserialized from JSON,
/// numbers and booleans are kept as their textual form, `null` becomes the
/// empty string, and nested objects or arrays are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormValues(BTreeMap<String, String>);

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for FormValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let values = raw
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Bool(b) => b.to_string(),
                    serde_json::Value::Null => String::new(),
                    serde_json::Value::Array(_) | serde_json::Value::Object(_) => return None,
                };
                Some((key, text))
            })
            .collect();
        Ok(Self(values))
    }
}

/// One check in a field's constraint chain
#[derive(Debug, Clone)]
pub enum Constraint {
    Required { message: String },
    MinLength { min: usize, message: String },
    MaxLength { max: usize, message: String },
    /// Value must parse as a finite number
    Number { message: String },
    Min { min: f64, message: String },
    Max { max: f64, message: String },
    Pattern { regex: Regex, message: String },
    Email { message: String },
    /// Absolute http(s) or ftp URL with a host
    Url { message: String },
    OneOf { options: Vec<String>, message: String },
    /// Value must equal the current value of another field
    EqualsField { other: String, message: String },
    /// Value must differ from the current value of another field
    DiffersFrom { other: String, message: String },
    Custom {
        kind: FieldErrorKind,
        check: Predicate,
        message: String,
    },
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    })
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn is_valid_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https" | "ftp")
                && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

impl Constraint {
    /// Field this constraint reads besides its own
    pub fn reference(&self) -> Option<&str> {
        match self {
            Constraint::EqualsField { other, .. } | Constraint::DiffersFrom { other, .. } => {
                Some(other)
            }
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Constraint::Required { message }
            | Constraint::MinLength { message, .. }
            | Constraint::MaxLength { message, .. }
            | Constraint::Number { message }
            | Constraint::Min { message, .. }
            | Constraint::Max { message, .. }
            | Constraint::Pattern { message, .. }
            | Constraint::Email { message }
            | Constraint::Url { message }
            | Constraint::OneOf { message, .. }
            | Constraint::EqualsField { message, .. }
            | Constraint::DiffersFrom { message, .. }
            | Constraint::Custom { message, .. } => message,
        }
    }

    fn kind(&self) -> FieldErrorKind {
        match self {
            Constraint::Required { .. } => FieldErrorKind::Required,
            Constraint::MinLength { .. } | Constraint::MaxLength { .. } => FieldErrorKind::Length,
            Constraint::Min { .. } | Constraint::Max { .. } => FieldErrorKind::NumericRange,
            Constraint::Number { .. }
            | Constraint::Pattern { .. }
            | Constraint::Email { .. }
            | Constraint::Url { .. }
            | Constraint::OneOf { .. } => FieldErrorKind::Pattern,
            Constraint::EqualsField { .. } | Constraint::DiffersFrom { .. } => {
                FieldErrorKind::CrossField
            }
            Constraint::Custom { kind, .. } => *kind,
        }
    }

    fn passes(&self, value: &str, values: &FormValues) -> bool {
        if let Constraint::Required { .. } = self {
            return !value.is_empty();
        }
        if value.is_empty() {
            return true;
        }

        match self {
            Constraint::Required { .. } => true,
            Constraint::MinLength { min, .. } => value.chars().count() >= *min,
            Constraint::MaxLength { max, .. } => value.chars().count() <= *max,
            Constraint::Number { .. } => parse_number(value).is_some(),
            // Non-numeric input is left to a `Number` constraint
            Constraint::Min { min, .. } => parse_number(value).is_none_or(|n| n >= *min),
            Constraint::Max { max, .. } => parse_number(value).is_none_or(|n| n <= *max),
            Constraint::Pattern { regex, .. } => regex.is_match(value),
            Constraint::Email { .. } => email_regex().is_match(value),
            Constraint::Url { .. } => is_valid_url(value),
            Constraint::OneOf { options, .. } => options.iter().any(|o| o == value),
            Constraint::EqualsField { other, .. } => value == values.get(other),
            Constraint::DiffersFrom { other, .. } => value != values.get(other),
            Constraint::Custom { check, .. } => check(value, values),
        }
    }

    fn check(&self, value: &str, values: &FormValues) -> Option<FieldError> {
        if self.passes(value, values) {
            None
        } else {
            Some(FieldError::new(self.kind(), self.message()))
        }
    }
}

/// A field and its ordered constraint chain
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    trim: bool,
    constraints: Vec<Constraint>,
    defect: Option<SchemaError>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            trim: false,
            constraints: Vec::new(),
            defect: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Validate the trimmed value instead of the raw one
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn required(self, message: impl Into<String>) -> Self {
        self.constraint(Constraint::Required {
            message: message.into(),
        })
    }

    pub fn min_length(self, min: usize, message: impl Into<String>) -> Self {
        self.constraint(Constraint::MinLength {
            min,
            message: message.into(),
        })
    }

    pub fn max_length(self, max: usize, message: impl Into<String>) -> Self {
        self.constraint(Constraint::MaxLength {
            max,
            message: message.into(),
        })
    }

    pub fn number(self, message: impl Into<String>) -> Self {
        self.constraint(Constraint::Number {
            message: message.into(),
        })
    }

    pub fn min(self, min: f64, message: impl Into<String>) -> Self {
        self.constraint(Constraint::Min {
            min,
            message: message.into(),
        })
    }

    pub fn max(self, max: f64, message: impl Into<String>) -> Self {
        self.constraint(Constraint::Max {
            max,
            message: message.into(),
        })
    }

    /// Regex constraint. A pattern that fails to compile is reported by
    /// [`SchemaBuilder::build`].
    pub fn matches(mut self, pattern: &str, message: impl Into<String>) -> Self {
        match Regex::new(pattern) {
            Ok(regex) => self.constraint(Constraint::Pattern {
                regex,
                message: message.into(),
            }),
            Err(e) => {
                self.defect.get_or_insert(SchemaError::InvalidPattern {
                    field: self.name.clone(),
                    reason: e.to_string(),
                });
                self
            }
        }
    }

    pub fn email(self, message: impl Into<String>) -> Self {
        self.constraint(Constraint::Email {
            message: message.into(),
        })
    }

    pub fn url(self, message: impl Into<String>) -> Self {
        self.constraint(Constraint::Url {
            message: message.into(),
        })
    }

    pub fn one_of<I, S>(self, options: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraint(Constraint::OneOf {
            options: options.into_iter().map(Into::into).collect(),
            message: message.into(),
        })
    }

    pub fn equals_field(self, other: impl Into<String>, message: impl Into<String>) -> Self {
        self.constraint(Constraint::EqualsField {
            other: other.into(),
            message: message.into(),
        })
    }

    pub fn differs_from(self, other: impl Into<String>, message: impl Into<String>) -> Self {
        self.constraint(Constraint::DiffersFrom {
            other: other.into(),
            message: message.into(),
        })
    }

    pub fn custom(
        self,
        kind: FieldErrorKind,
        check: Predicate,
        message: impl Into<String>,
    ) -> Self {
        self.constraint(Constraint::Custom {
            kind,
            check,
            message: message.into(),
        })
    }

    fn normalize<'a>(&self, raw: &'a str) -> &'a str {
        if self.trim { raw.trim() } else { raw }
    }

    fn evaluate(&self, values: &FormValues) -> Option<FieldError> {
        let value = values.get(&self.name);
        self.constraints
            .iter()
            .find_map(|constraint| constraint.check(value, values))
    }
}

/// Builder collecting field specs; reference checks happen in [`build`](Self::build)
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        for (index, spec) in self.fields.iter().enumerate() {
            if let Some(defect) = &spec.defect {
                return Err(defect.clone());
            }
            if self.fields[..index].iter().any(|f| f.name == spec.name) {
                return Err(SchemaError::DuplicateField(spec.name.clone()));
            }
        }

        for spec in &self.fields {
            for reference in spec.constraints.iter().filter_map(Constraint::reference) {
                if !self.fields.iter().any(|f| f.name == reference) {
                    return Err(SchemaError::UnknownReference {
                        field: spec.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
        }

        Ok(Schema {
            fields: self.fields,
        })
    }
}

/// A validated, immutable form schema
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn contains(&self, field: &str) -> bool {
        self.spec(field).is_some()
    }

    fn spec(&self, field: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == field)
    }

    /// Values as the constraints see them: trimmed where the field asks for it
    fn normalized(&self, values: &FormValues) -> FormValues {
        let mut normalized = values.clone();
        for spec in &self.fields {
            let value = spec.normalize(values.get(&spec.name)).to_string();
            normalized.set(spec.name.clone(), value);
        }
        normalized
    }

    /// Validate every field and collect one message per failing field
    pub fn validate(&self, values: &FormValues) -> ErrorMap {
        let normalized = self.normalized(values);
        let mut errors = ErrorMap::new();
        for spec in &self.fields {
            if let Some(error) = spec.evaluate(&normalized) {
                errors.insert(spec.name.clone(), error.message);
            }
        }
        errors
    }

    /// Validate a single field against the full, current value set
    pub fn validate_field(
        &self,
        field: &str,
        values: &FormValues,
    ) -> Result<Option<FieldError>, SchemaError> {
        let spec = self
            .spec(field)
            .ok_or_else(|| SchemaError::UnknownField(field.to_string()))?;
        Ok(spec.evaluate(&self.normalized(values)))
    }

    /// Message of the first failing field in declaration order
    pub fn first_message<'e>(&self, errors: &'e ErrorMap) -> Option<&'e str> {
        self.fields.iter().find_map(|spec| errors.get(&spec.name))
    }

    /// Fields whose constraints read `field`
    pub fn dependents(&self, field: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|spec| {
                spec.constraints
                    .iter()
                    .any(|c| c.reference() == Some(field))
            })
            .map(|spec| spec.name.as_str())
            .collect()
    }
}
