//! Custom error types for the dashboard service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use forms::{ErrorMap, SchemaError, SlotError};
use serde_json::json;
use thiserror::Error;

use crate::client::ClientError;

/// Custom error type for the dashboard service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing bearer token, or the upstream API rejected it
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unknown form or field
    #[error("Not found: {0}")]
    NotFound(String),

    /// Form validation failed; `message` is the first error in field order
    #[error("Validation failed: {message}")]
    Validation { message: String, fields: ErrorMap },

    /// Time-slot input could not be parsed or is out of order
    #[error(transparent)]
    Slot(#[from] SlotError),

    /// The upstream API failed or refused the request
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Session store error
    #[error("Session store error: {0}")]
    Store(#[from] common::StoreError),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized => ApiError::Unauthorized,
            ClientError::Status { status, message } if status.is_client_error() => {
                ApiError::BadRequest(message)
            }
            ClientError::Status { message, .. } | ClientError::Rejected(message) => {
                ApiError::Upstream(message)
            }
            ClientError::Http(e) => {
                tracing::error!("Upstream request failed: {}", e);
                ApiError::Upstream("Upstream service unavailable".to_string())
            }
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnknownField(field) => {
                ApiError::NotFound(format!("Unknown field: {field}"))
            }
            other => {
                tracing::error!("Schema defect: {}", other);
                ApiError::InternalServerError
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, fields) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Validation { message, fields } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, Some(fields))
            }
            ApiError::Slot(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg, None),
            ApiError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session store error".to_string(),
                None,
            ),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                None,
            ),
        };

        let body = match fields {
            Some(fields) => Json(json!({
                "error": error_message,
                "fields": fields,
            })),
            None => Json(json!({
                "error": error_message,
            })),
        };

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
