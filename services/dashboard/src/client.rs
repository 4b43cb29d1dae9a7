//! HTTP client for the upstream mentor REST API

use forms::{
    SessionSummary,
    password::PasswordChange,
    profile::ProfileUpdate,
    slot::CreateTimeSlots,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors talking to the upstream API
#[derive(Error, Debug)]
pub enum ClientError {
    /// The upstream API rejected the bearer token (401 or 403)
    #[error("Upstream rejected the credentials")]
    Unauthorized,

    /// The upstream API answered with an error status
    #[error("Upstream returned {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The upstream API answered 2xx but reported a failure in its envelope
    #[error("Upstream rejected the request: {0}")]
    Rejected(String),

    /// Connection, timeout or decoding failure
    #[error("Upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// `{ success, data, message }` wrapper used by some upstream endpoints
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    message: Option<String>,
}

/// Thin typed wrapper over the upstream endpoints
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        debug!("Upstream responded with {}", status);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| status.to_string());
            return Err(ClientError::Status { status, message });
        }

        Ok(response.json::<T>().await?)
    }

    async fn get_json(&self, token: &str, path: &str) -> Result<Value, ClientError> {
        self.send(self.http.get(self.url(path)).bearer_auth(token))
            .await
    }

    /// `GET /auth/me`
    pub async fn current_user(&self, token: &str) -> Result<Value, ClientError> {
        self.get_json(token, "/auth/me").await
    }

    /// `GET /mentors/me`, raw so the caller can cache it as-is
    pub async fn mentor_profile(&self, token: &str) -> Result<Value, ClientError> {
        self.get_json(token, "/mentors/me").await
    }

    /// `PUT /mentors/me`
    pub async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<Value, ClientError> {
        self.send(
            self.http
                .put(self.url("/mentors/me"))
                .bearer_auth(token)
                .json(update),
        )
        .await
    }

    /// `PUT /mentors/me/password`
    pub async fn change_password(
        &self,
        token: &str,
        change: &PasswordChange,
    ) -> Result<Value, ClientError> {
        self.send(
            self.http
                .put(self.url("/mentors/me/password"))
                .bearer_auth(token)
                .json(change),
        )
        .await
    }

    /// `GET /mentors/me/sessions`; an unsuccessful envelope reads as no sessions
    pub async fn my_sessions(&self, token: &str) -> Result<Vec<SessionSummary>, ClientError> {
        let envelope: Envelope<Vec<SessionSummary>> = self
            .send(
                self.http
                    .get(self.url("/mentors/me/sessions"))
                    .bearer_auth(token),
            )
            .await?;

        if !envelope.success {
            warn!(
                "Upstream session listing unsuccessful: {}",
                envelope.message.as_deref().unwrap_or("no message")
            );
        }
        Ok(envelope
            .data
            .filter(|_| envelope.success)
            .unwrap_or_default())
    }

    /// `POST /timeslots`
    pub async fn add_timeslots(
        &self,
        token: &str,
        request: &CreateTimeSlots,
    ) -> Result<Value, ClientError> {
        let envelope: Envelope<Value> = self
            .send(
                self.http
                    .post(self.url("/timeslots"))
                    .bearer_auth(token)
                    .json(request),
            )
            .await?;

        if !envelope.success {
            return Err(ClientError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Failed to create timeslot".to_string()),
            ));
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }

    /// `GET /certificates/my`
    pub async fn my_certificates(&self, token: &str) -> Result<Value, ClientError> {
        self.get_json(token, "/certificates/my").await
    }

    /// `GET /invoices/my`
    pub async fn my_invoices(&self, token: &str) -> Result<Value, ClientError> {
        self.get_json(token, "/invoices/my").await
    }

    /// `GET /dashboard/mentor/{id}/summary`
    pub async fn dashboard_summary(
        &self,
        token: &str,
        mentor_id: &str,
    ) -> Result<Value, ClientError> {
        self.get_json(token, &format!("/dashboard/mentor/{mentor_id}/summary"))
            .await
    }

    /// `GET /dashboard/mentor/{id}/trends`
    pub async fn dashboard_trends(
        &self,
        token: &str,
        mentor_id: &str,
    ) -> Result<Value, ClientError> {
        self.get_json(token, &format!("/dashboard/mentor/{mentor_id}/trends"))
            .await
    }

    /// `GET /dashboard/mentor/{id}/weekly-performance`
    pub async fn weekly_performance(
        &self,
        token: &str,
        mentor_id: &str,
    ) -> Result<Value, ClientError> {
        self.get_json(
            token,
            &format!("/dashboard/mentor/{mentor_id}/weekly-performance"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let client =
            BackendClient::new("http://localhost:5001/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5001/api");
        assert_eq!(client.url("/auth/me"), "http://localhost:5001/api/auth/me");
    }

    #[test]
    fn envelope_without_success_flag_is_unsuccessful() {
        let envelope: Envelope<Vec<SessionSummary>> =
            serde_json::from_str(r#"{"data": [{"id": "s1"}]}"#).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.data.map(|d| d.len()), Some(1));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_http_error() {
        let client = BackendClient::new("http://127.0.0.1:9/api", Duration::from_secs(1)).unwrap();
        let result = client.current_user("token").await;
        assert!(matches!(result, Err(ClientError::Http(_))));
    }
}
