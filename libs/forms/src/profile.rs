//! Mentor profile form
//!
//! Holds the profile schema, the form as the client edits it, the mapping
//! from the upstream mentor record (which mixes snake_case and camelCase
//! keys), and the outbound update payload.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::sync::OnceLock;
use url::Url;
use uuid::Uuid;

use crate::error::{ErrorMap, RecordError};
use crate::record::{self, Object};
use crate::schema::{FieldSpec, FormValues, Schema};

pub const GENDERS: [&str; 3] = ["male", "female", "other"];

/// Schema for the mentor profile form
pub fn profile_schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        Schema::builder()
            .field(
                FieldSpec::new("firstName")
                    .trim()
                    .required("First name is required")
                    .min_length(2, "First name must be at least 2 characters")
                    .max_length(50, "First name must be less than 50 characters"),
            )
            .field(
                FieldSpec::new("lastName")
                    .trim()
                    .required("Last name is required")
                    .min_length(2, "Last name must be at least 2 characters")
                    .max_length(50, "Last name must be less than 50 characters"),
            )
            .field(
                FieldSpec::new("email")
                    .trim()
                    .required("Email is required")
                    .email("Please enter a valid email address"),
            )
            .field(
                FieldSpec::new("phoneNumber")
                    .trim()
                    .required("Phone number is required")
                    .matches(r"^[0-9+\-\s()]+$", "Please enter a valid phone number")
                    .min_length(10, "Phone number must be at least 10 digits"),
            )
            .field(
                FieldSpec::new("gender")
                    .trim()
                    .one_of(GENDERS, "Please select a valid gender"),
            )
            .field(FieldSpec::new("dob").required("Date of birth is required"))
            .field(
                FieldSpec::new("jobTitle")
                    .trim()
                    .required("Job title is required")
                    .min_length(2, "Job title must be at least 2 characters")
                    .max_length(100, "Job title must be less than 100 characters"),
            )
            .field(
                FieldSpec::new("companyName")
                    .trim()
                    .max_length(100, "Company name must be less than 100 characters"),
            )
            .field(
                FieldSpec::new("experienceYears")
                    .trim()
                    .number("Experience years must be a number")
                    .min(0.0, "Experience years cannot be negative")
                    .max(50.0, "Experience years must be less than 50"),
            )
            .field(
                FieldSpec::new("expertiseAreas")
                    .trim()
                    .max_length(500, "Expertise areas must be less than 500 characters"),
            )
            .field(
                FieldSpec::new("aboutMentor")
                    .trim()
                    .max_length(1000, "About section must be less than 1000 characters"),
            )
            .field(
                FieldSpec::new("socialMedia")
                    .trim()
                    .url("Please enter a valid URL")
                    .max_length(255, "Social media URL must be less than 255 characters"),
            )
            .field(
                FieldSpec::new("sessionRate")
                    .trim()
                    .number("Session rate must be a number")
                    .min(0.0, "Session rate cannot be negative")
                    .max(10000.0, "Session rate must be less than 10000"),
            )
            .field(
                FieldSpec::new("meetingLocation")
                    .trim()
                    .max_length(255, "Meeting location must be less than 255 characters"),
            )
            .build()
            .expect("Failed to build profile schema")
    })
}

/// Numeric inputs travel as text so that half-typed values can be validated.
/// Accepts a JSON number, a string or `null`; emits a number when the text
/// parses, `null` when empty, and the raw string otherwise.
mod numeric_text {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) if !other.is_null() => {
                return Err(serde::de::Error::custom(format!(
                    "expected a number or string, got {other}"
                )));
            }
            _ => String::new(),
        })
    }

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(value: &String, serializer: S) -> Result<S::Ok, S::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return serializer.serialize_none();
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => serializer.serialize_f64(n),
            _ => serializer.serialize_str(value),
        }
    }
}

/// Mentor profile as edited in the settings form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub gender: String,
    pub dob: String,
    pub job_title: String,
    pub company_name: String,
    #[serde(with = "numeric_text")]
    pub experience_years: String,
    pub expertise_areas: String,
    pub about_mentor: String,
    pub social_media: String,
    #[serde(with = "numeric_text")]
    pub session_rate: String,
    pub meeting_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl ProfileForm {
    pub fn values(&self) -> FormValues {
        FormValues::new()
            .with("firstName", self.first_name.as_str())
            .with("lastName", self.last_name.as_str())
            .with("email", self.email.as_str())
            .with("phoneNumber", self.phone_number.as_str())
            .with("gender", self.gender.as_str())
            .with("dob", self.dob.as_str())
            .with("jobTitle", self.job_title.as_str())
            .with("companyName", self.company_name.as_str())
            .with("experienceYears", self.experience_years.as_str())
            .with("expertiseAreas", self.expertise_areas.as_str())
            .with("aboutMentor", self.about_mentor.as_str())
            .with("socialMedia", self.social_media.as_str())
            .with("sessionRate", self.session_rate.as_str())
            .with("meetingLocation", self.meeting_location.as_str())
    }

    pub fn validate(&self) -> ErrorMap {
        profile_schema().validate(&self.values())
    }

    /// Validate and build the outbound payload
    pub fn into_update(self) -> Result<ProfileUpdate, ErrorMap> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ProfileUpdate::from(self))
    }
}

/// Outbound payload for the profile update endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub gender: String,
    pub dob: String,
    pub job_title: String,
    pub company_name: String,
    pub experience_years: Option<f64>,
    pub expertise_areas: String,
    pub about_mentor: String,
    pub social_media: String,
    pub session_rate: Option<f64>,
    pub meeting_location: String,
    #[serde(rename = "position_id", skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    #[serde(rename = "industry_id", skip_serializing_if = "Option::is_none")]
    pub industry_id: Option<String>,
}

/// Zero and empty both mean "not set" to the backend
fn positive_number(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && *n != 0.0)
}

/// Only hyphenated UUIDs are forwarded as references
fn uuid_reference(id: Option<String>) -> Option<String> {
    let id = id?.trim().to_string();
    (id.len() == 36 && Uuid::try_parse(&id).is_ok()).then_some(id)
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        Self {
            experience_years: positive_number(&form.experience_years),
            session_rate: positive_number(&form.session_rate),
            position_id: uuid_reference(form.position_id),
            industry_id: uuid_reference(form.industry_id),
            first_name: form.first_name,
            last_name: form.last_name,
            email: form.email,
            phone_number: form.phone_number,
            gender: form.gender,
            dob: form.dob,
            job_title: form.job_title,
            company_name: form.company_name,
            expertise_areas: form.expertise_areas,
            about_mentor: form.about_mentor,
            social_media: form.social_media,
            meeting_location: form.meeting_location,
        }
    }
}

/// Mentor record as returned by the upstream API
///
/// Every field is optional; each one is read on its own so that an
/// unexpected key or type leaves the remaining fields intact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MentorRecord {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub user_email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub experience_years: Option<f64>,
    pub expertise_areas: Option<String>,
    pub about_mentor: Option<String>,
    pub social_media: Option<String>,
    pub session_rate: Option<f64>,
    pub meeting_location: Option<String>,
    pub profile_image: Option<String>,
    pub position_id: Option<String>,
    pub industry_id: Option<String>,
}

/// Upstream profile responses come either wrapped as `{ "mentor": ... }` or bare
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MentorEnvelope<'a> {
    Wrapped(&'a Object),
    Bare(&'a Object),
}

impl<'a> TryFrom<&'a Value> for MentorEnvelope<'a> {
    type Error = RecordError;

    fn try_from(raw: &'a Value) -> Result<Self, Self::Error> {
        let outer = record::as_object(raw, "mentor response")?;
        match outer.get("mentor") {
            Some(inner) if !inner.is_null() => {
                Ok(MentorEnvelope::Wrapped(record::as_object(inner, "mentor")?))
            }
            _ => Ok(MentorEnvelope::Bare(outer)),
        }
    }
}

impl<'a> MentorEnvelope<'a> {
    pub fn mentor(self) -> &'a Object {
        match self {
            MentorEnvelope::Wrapped(mentor) | MentorEnvelope::Bare(mentor) => mentor,
        }
    }
}

fn number_text(value: Option<f64>) -> Option<String> {
    value.filter(|n| *n != 0.0).map(|n| n.to_string())
}

impl MentorRecord {
    /// Read a record from a mentor object, taking snake_case before camelCase
    pub fn from_object(mentor: &Object) -> Self {
        Self {
            id: record::text(mentor, &["id"]),
            first_name: record::text(mentor, &["first_name", "firstName"]),
            last_name: record::text(mentor, &["last_name", "lastName"]),
            email: record::text(mentor, &["email"]),
            user_email: record::object(mentor, &["User", "user"])
                .and_then(|user| record::text(user, &["email"])),
            phone: record::text(mentor, &["phone", "phoneNumber"]),
            gender: record::text(mentor, &["gender"]),
            dob: record::text(mentor, &["dob"]),
            job_title: record::text(mentor, &["job_title", "jobTitle"]),
            company_name: record::text(mentor, &["company_name", "companyName"]),
            experience_years: record::number(mentor, &["experience_years", "experienceYears"]),
            expertise_areas: record::text(mentor, &["expertise_areas", "expertiseAreas"]),
            about_mentor: record::text(mentor, &["about_mentor", "aboutMentor"]),
            social_media: record::text(mentor, &["social_media", "socialMedia"]),
            session_rate: record::number(mentor, &["session_rate", "sessionRate"]),
            meeting_location: record::text(mentor, &["meeting_location", "meetingLocation"]),
            profile_image: record::text(mentor, &["profile_image", "profileImage"]),
            position_id: record::reference_id(mentor, &["Position", "position"]),
            industry_id: record::reference_id(mentor, &["Industry", "industry"]),
        }
    }

    /// Decode a profile response in either envelope shape
    pub fn from_response(raw: &Value) -> Result<Self, RecordError> {
        MentorEnvelope::try_from(raw).map(|envelope| Self::from_object(envelope.mentor()))
    }

    /// Build the editable form; `api_base_url` resolves relative image paths
    pub fn into_form(self, api_base_url: &str) -> ProfileForm {
        self.merge_into(ProfileForm::default(), api_base_url)
    }

    /// Overlay this record on `previous`, keeping previous values for fields
    /// the record leaves empty. The image always follows the record.
    pub fn merge_into(self, previous: ProfileForm, api_base_url: &str) -> ProfileForm {
        let email = self.user_email.or(self.email);
        ProfileForm {
            first_name: self.first_name.unwrap_or(previous.first_name),
            last_name: self.last_name.unwrap_or(previous.last_name),
            email: email.unwrap_or(previous.email),
            phone_number: self.phone.unwrap_or(previous.phone_number),
            gender: self.gender.unwrap_or(previous.gender),
            dob: self.dob.unwrap_or(previous.dob),
            job_title: self.job_title.unwrap_or(previous.job_title),
            company_name: self.company_name.unwrap_or(previous.company_name),
            experience_years: number_text(self.experience_years)
                .unwrap_or(previous.experience_years),
            expertise_areas: self.expertise_areas.unwrap_or(previous.expertise_areas),
            about_mentor: self.about_mentor.unwrap_or(previous.about_mentor),
            social_media: self.social_media.unwrap_or(previous.social_media),
            session_rate: number_text(self.session_rate).unwrap_or(previous.session_rate),
            meeting_location: self.meeting_location.unwrap_or(previous.meeting_location),
            position_id: self.position_id.or(previous.position_id),
            industry_id: self.industry_id.or(previous.industry_id),
            profile_image_url: self
                .profile_image
                .map(|image| resolve_image_url(api_base_url, &image)),
        }
    }
}

/// Absolute URLs are kept; bare file names are served from `/uploads/` next to
/// the API root, i.e. the base URL minus a trailing `/api` path segment
pub fn resolve_image_url(api_base_url: &str, image: &str) -> String {
    if image.starts_with("http") {
        return image.to_string();
    }
    let root = match Url::parse(api_base_url) {
        Ok(mut url) => {
            let path = url.path().trim_end_matches('/');
            let path = path.strip_suffix("/api").unwrap_or(path).to_string();
            url.set_path(&path);
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => api_base_url.to_string(),
    };
    format!(
        "{}/uploads/{}",
        root.trim_end_matches('/'),
        image.trim_start_matches('/')
    )
}
