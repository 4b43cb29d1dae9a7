use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use common::{InMemorySessionStore, RedisSessionStore, SessionStore};
use dashboard::{AppState, BackendClient, DashboardConfig, create_router};

#[tokio::main]
async fn main() -> Result<()> {
    let config = DashboardConfig::from_env()?;

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting dashboard service");

    // Initialize the session store
    let sessions: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            let store = RedisSessionStore::open(url, config.session_ttl_secs)?;

            // Check Redis connectivity
            if store.health_check().await? {
                info!("Redis connection successful");
            } else {
                anyhow::bail!("Failed to connect to Redis");
            }
            Arc::new(store)
        }
        None => {
            info!("No Redis URL configured, keeping sessions in memory");
            Arc::new(InMemorySessionStore::new(config.session_ttl()))
        }
    };

    let backend = BackendClient::new(&config.api_base_url, config.request_timeout())?;
    info!("Forwarding to upstream API at {}", backend.base_url());

    // Start the web server
    let app = create_router(AppState::new(backend, sessions));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("Dashboard service listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
