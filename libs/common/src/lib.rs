//! Common library for the mentor dashboard
//!
//! This crate provides shared functionality used by the dashboard service:
//! session storage behind the [`session::SessionStore`] trait, with in-memory
//! and Redis backends, and the associated error types.

pub mod error;
pub mod session;

pub use error::{StoreError, StoreResult};
pub use session::{AuthSession, InMemorySessionStore, RedisSessionStore, SessionStore};
