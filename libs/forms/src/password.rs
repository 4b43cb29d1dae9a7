//! Password change form

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::ErrorMap;
use crate::schema::{FieldSpec, FormValues, Schema};

pub const CURRENT_PASSWORD: &str = "currentPassword";
pub const NEW_PASSWORD: &str = "newPassword";
pub const CONFIRM_PASSWORD: &str = "confirmPassword";

/// Requirement lines shown next to the password form
pub const PASSWORD_REQUIREMENTS: [&str; 4] = [
    "At least 8 characters long",
    "Contains uppercase and lowercase letters",
    "Contains at least one number",
    "Contains at least one special character",
];

/// Schema for the password change form
pub fn password_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder()
            .field(FieldSpec::new(CURRENT_PASSWORD).required("Current password is required"))
            .field(
                FieldSpec::new(NEW_PASSWORD)
                    .required("New password is required")
                    .min_length(8, "Password must be at least 8 characters long")
                    .matches("[A-Z]", "Password must contain at least one uppercase letter")
                    .matches("[a-z]", "Password must contain at least one lowercase letter")
                    .matches("[0-9]", "Password must contain at least one number")
                    .matches(
                        "[^A-Za-z0-9]",
                        "Password must contain at least one special character",
                    )
                    .differs_from(
                        CURRENT_PASSWORD,
                        "New password must be different from current password",
                    ),
            )
            .field(
                FieldSpec::new(CONFIRM_PASSWORD)
                    .required("Please confirm your password")
                    .equals_field(NEW_PASSWORD, "Passwords must match"),
            )
            .build()
            .expect("Failed to build password schema")
    })
}

/// Password change form as submitted by the client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

/// Outbound payload for the password change endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordChange {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

impl PasswordChangeForm {
    pub fn values(&self) -> FormValues {
        FormValues::new()
            .with(CURRENT_PASSWORD, self.current_password.as_str())
            .with(NEW_PASSWORD, self.new_password.as_str())
            .with(CONFIRM_PASSWORD, self.confirm_password.as_str())
    }

    pub fn validate(&self) -> ErrorMap {
        password_schema().validate(&self.values())
    }

    /// Validate and build the payload; both passwords are trimmed before sending
    pub fn into_change(self) -> Result<PasswordChange, ErrorMap> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(PasswordChange {
            current_password: self.current_password.trim().to_string(),
            new_password: self.new_password.trim().to_string(),
        })
    }
}
