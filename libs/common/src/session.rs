//! Session storage for authenticated mentors
//!
//! A session pairs the bearer token with the user object the upstream API
//! returned for it. Components that need identity receive a
//! [`SessionStore`] instead of reaching into global state.

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::StoreResult;

/// A mentor's authenticated session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    /// User object as returned by the upstream API
    pub user: Option<serde_json::Value>,
}

impl AuthSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: None,
        }
    }

    /// Whether the cached user already carries its mentor profile
    pub fn has_mentor(&self) -> bool {
        self.user
            .as_ref()
            .and_then(|u| u.get("Mentor"))
            .is_some_and(|m| !m.is_null())
    }

    /// Attach a mentor profile to the cached user, creating the user object if needed
    pub fn attach_mentor(&mut self, mentor: serde_json::Value) {
        match self.user.as_mut().and_then(|u| u.as_object_mut()) {
            Some(user) => {
                user.insert("Mentor".to_string(), mentor);
            }
            None => {
                self.user = Some(serde_json::json!({ "Mentor": mentor }));
            }
        }
    }
}

/// Storage for sessions keyed by bearer token
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get the session for a token
    async fn get(&self, token: &str) -> StoreResult<Option<AuthSession>>;

    /// Create or replace a session
    async fn set(&self, session: &AuthSession) -> StoreResult<()>;

    /// Forget a session
    async fn clear(&self, token: &str) -> StoreResult<()>;
}

/// Process-local session store
///
/// Entries expire `ttl` after they were last written, matching the Redis
/// store. Expired entries are evicted when read and swept on every write.
#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, (AuthSession, Instant)>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    fn is_live(&self, stored_at: Instant) -> bool {
        stored_at.elapsed() < self.ttl
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, token: &str) -> StoreResult<Option<AuthSession>> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(token) {
                None => return Ok(None),
                Some((session, stored_at)) if self.is_live(*stored_at) => {
                    return Ok(Some(session.clone()));
                }
                Some(_) => {}
            }
        }

        let mut sessions = self.sessions.write().await;
        // Re-check under the write lock; the entry may have been refreshed
        let expired = sessions
            .get(token)
            .is_some_and(|(_, stored_at)| !self.is_live(*stored_at));
        if expired {
            sessions.remove(token);
            debug!("Evicted expired in-memory session");
        }
        Ok(sessions.get(token).map(|(session, _)| session.clone()))
    }

    async fn set(&self, session: &AuthSession) -> StoreResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (_, stored_at)| stored_at.elapsed() < self.ttl);
        sessions.insert(session.token.clone(), (session.clone(), Instant::now()));
        Ok(())
    }

    async fn clear(&self, token: &str) -> StoreResult<()> {
        self.sessions.write().await.remove(token);
        Ok(())
    }
}

/// Session store backed by Redis, with sessions expiring after a TTL
///
/// Each session is one JSON string under `session:{token}`, written with
/// `SETEX` so a mentor who never logs out is forgotten after `ttl_seconds`.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    /// Open a client for `url`; no connection is made until first use
    pub fn open(url: &str, ttl_seconds: u64) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        info!("Redis session store initialized with URL: {}", url);
        Ok(Self {
            client,
            ttl_seconds,
        })
    }

    fn key(token: &str) -> String {
        format!("session:{}", token)
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Check if Redis is reachable
    pub async fn health_check(&self) -> StoreResult<bool> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, token: &str) -> StoreResult<Option<AuthSession>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.get(Self::key(token)).await?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        // A corrupted entry is treated as no session at all
        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("Discarding unreadable session entry: {}", e);
                Ok(None)
            }
        }
    }

    async fn set(&self, session: &AuthSession) -> StoreResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(Self::key(&session.token), raw, self.ttl_seconds)
            .await?;
        info!("Session stored in Redis");
        Ok(())
    }

    async fn clear(&self, token: &str) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: u64 = conn.del(Self::key(token)).await?;
        info!("Session cleared from Redis");
        Ok(())
    }
}
