//! Service configuration loaded from defaults and `DASHBOARD__*` variables

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

/// Dashboard service configuration
///
/// # Environment Variables
/// - `DASHBOARD__LISTEN_ADDR`: bind address (default: `0.0.0.0:3002`)
/// - `DASHBOARD__API_BASE_URL`: upstream REST API (default: `http://localhost:5001/api`)
/// - `DASHBOARD__REQUEST_TIMEOUT_SECS`: upstream request timeout (default: 30)
/// - `DASHBOARD__REDIS_URL`: Redis URL for sessions; in-memory store when unset
/// - `DASHBOARD__SESSION_TTL_SECS`: session lifetime in either store (default: 7 days)
/// - `DASHBOARD__LOG_LEVEL`: tracing filter directive (default: `info`)
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub listen_addr: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub redis_url: Option<String>,
    pub session_ttl_secs: u64,
    pub log_level: String,
}

impl DashboardConfig {
    /// Create a new DashboardConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("listen_addr", "0.0.0.0:3002")?
            .set_default("api_base_url", "http://localhost:5001/api")?
            .set_default("request_timeout_secs", 30)?
            .set_default("session_ttl_secs", 604_800)?
            .set_default("log_level", "info")?
            .add_source(
                Environment::with_prefix("DASHBOARD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}
