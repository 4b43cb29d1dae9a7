//! Application state shared across handlers

use common::SessionStore;
use std::sync::Arc;

use crate::client::BackendClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(backend: BackendClient, sessions: Arc<dyn SessionStore>) -> Self {
        Self { backend, sessions }
    }

    /// Drop the cached session after the upstream API rejected its token
    pub async fn expire_session(&self, token: &str) {
        if let Err(e) = self.sessions.clear(token).await {
            tracing::error!("Failed to clear session: {}", e);
        }
    }
}
