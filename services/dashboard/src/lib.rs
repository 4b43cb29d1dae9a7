//! Mentor dashboard service
//!
//! An axum front for the mentor dashboard: it validates profile, password and
//! time-slot input with the `forms` crate before anything reaches the
//! upstream REST API, and keeps the signed-in mentor's session cached in a
//! [`common::SessionStore`].

pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

pub use client::{BackendClient, ClientError};
pub use config::DashboardConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
