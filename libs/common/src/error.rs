//! Custom error types for the common library
//!
//! This module defines the errors raised by the session storage backends.

use thiserror::Error;

/// Custom error type for session storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error talking to Redis
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Session could not be encoded for storage
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for Result with StoreError
pub type StoreResult<T> = Result<T, StoreError>;
