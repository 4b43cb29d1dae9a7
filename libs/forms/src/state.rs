//! Live form state with incremental validation feedback

use std::collections::BTreeSet;

use crate::error::{ErrorMap, SchemaError};
use crate::schema::{FormValues, Schema};

/// When a field starts receiving feedback as it changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackPolicy {
    /// Only after the field was blurred once, or while the form is in edit mode
    OnTouch,
    /// On every change
    Always,
}

/// Values, touched fields and the error map of one form being edited
///
/// When a field changes, fields whose constraints read it are re-validated
/// too, but only if the user already interacted with them; an untouched
/// confirmation box does not light up while the password above it is typed.
#[derive(Debug, Clone)]
pub struct FormState<'s> {
    schema: &'s Schema,
    policy: FeedbackPolicy,
    values: FormValues,
    touched: BTreeSet<String>,
    dirty: BTreeSet<String>,
    edit_mode: bool,
    errors: ErrorMap,
}

impl<'s> FormState<'s> {
    pub fn new(schema: &'s Schema, policy: FeedbackPolicy, values: FormValues) -> Self {
        Self {
            schema,
            policy,
            values,
            touched: BTreeSet::new(),
            dirty: BTreeSet::new(),
            edit_mode: false,
            errors: ErrorMap::new(),
        }
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.contains(field)
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    fn ensure_field(&self, field: &str) -> Result<(), SchemaError> {
        if self.schema.contains(field) {
            Ok(())
        } else {
            Err(SchemaError::UnknownField(field.to_string()))
        }
    }

    fn gives_feedback(&self, field: &str) -> bool {
        match self.policy {
            FeedbackPolicy::Always => true,
            FeedbackPolicy::OnTouch => self.edit_mode || self.touched.contains(field),
        }
    }

    fn revalidate(&mut self, field: &str) -> Result<(), SchemaError> {
        let outcome = self.schema.validate_field(field, &self.values)?;
        self.errors.apply(field, outcome);
        Ok(())
    }

    /// Mark a field as touched
    pub fn blur(&mut self, field: &str) -> Result<(), SchemaError> {
        self.ensure_field(field)?;
        self.touched.insert(field.to_string());
        Ok(())
    }

    /// Update a value and refresh the error entries that are currently visible
    pub fn change(&mut self, field: &str, value: impl Into<String>) -> Result<(), SchemaError> {
        self.ensure_field(field)?;
        self.values.set(field, value);
        self.dirty.insert(field.to_string());

        if self.gives_feedback(field) {
            self.revalidate(field)?;
        }

        let dependents: Vec<String> = self
            .schema
            .dependents(field)
            .into_iter()
            .filter(|dep| self.dirty.contains(*dep) || self.touched.contains(*dep))
            .filter(|dep| self.gives_feedback(dep))
            .map(String::from)
            .collect();
        for dependent in dependents {
            self.revalidate(&dependent)?;
        }

        Ok(())
    }

    /// Validate the whole form, replacing the error map
    pub fn submit(&mut self) -> Result<FormValues, ErrorMap> {
        self.errors = self.schema.validate(&self.values);
        if self.errors.is_empty() {
            Ok(self.values.clone())
        } else {
            Err(self.errors.clone())
        }
    }

    /// Message of the first failing field in declaration order
    pub fn first_error(&self) -> Option<&str> {
        self.schema.first_message(&self.errors)
    }

    /// Start over with new values, e.g. after a cancel or a successful save
    pub fn reset(&mut self, values: FormValues) {
        self.values = values;
        self.touched.clear();
        self.dirty.clear();
        self.errors.clear();
        self.edit_mode = false;
    }
}
