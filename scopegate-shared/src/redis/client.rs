/// Redis client wrapper
///
/// Wraps `redis::aio::ConnectionManager`, which reconnects on its own, and
/// adds a PING health check with a command timeout. The API only needs Redis
/// as a lock store; without `REDIS_URL` it falls back to in-process locks.
///
/// # Example
///
/// ```no_run
/// use scopegate_shared::redis::client::{RedisClient, RedisConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// if let Some(config) = RedisConfig::from_env()? {
///     let client = RedisClient::new(config).await?;
///     assert!(client.ping().await?);
/// }
/// # Ok(())
/// # }
/// ```

use redis::aio::ConnectionManager;
use redis::{Client, RedisError};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Redis client errors
#[derive(Error, Debug)]
pub enum RedisClientError {
    /// Connection error
    #[error("Redis connection error: {0}")]
    ConnectionError(String),

    /// Command execution error
    #[error("Redis command error: {0}")]
    CommandError(String),

    /// Configuration error
    #[error("Redis configuration error: {0}")]
    ConfigError(String),

    /// Command did not finish in time
    #[error("Redis command timed out")]
    Timeout,
}

impl From<RedisError> for RedisClientError {
    fn from(err: RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::IoError => {
                RedisClientError::ConnectionError(format!("IO error: {}", err))
            }
            _ => RedisClientError::CommandError(err.to_string()),
        }
    }
}

/// Redis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Format: redis://[username:password@]host:port[/db]
    pub url: String,

    /// Command timeout in seconds
    pub command_timeout_secs: u64,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            command_timeout_secs: 5,
        }
    }

    /// Loads configuration from the environment
    ///
    /// # Environment Variables
    ///
    /// - `REDIS_URL`: connection URL; unset or empty yields `Ok(None)`
    /// - `REDIS_COMMAND_TIMEOUT_SECS`: command timeout (default: 5)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `REDIS_URL` is not a `redis://` or
    /// `rediss://` URL.
    pub fn from_env() -> Result<Option<Self>, RedisClientError> {
        dotenvy::dotenv().ok();

        let url = match env::var("REDIS_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => return Ok(None),
        };

        if !(url.starts_with("redis://") || url.starts_with("rediss://")) {
            return Err(RedisClientError::ConfigError(
                "REDIS_URL must start with redis:// or rediss://".to_string(),
            ));
        }

        let command_timeout_secs = env::var("REDIS_COMMAND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Some(Self {
            url,
            command_timeout_secs,
        }))
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

/// Redis client with automatic reconnection
#[derive(Clone)]
pub struct RedisClient {
    manager: ConnectionManager,
    config: Arc<RedisConfig>,
}

impl RedisClient {
    /// Connects to Redis
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn new(config: RedisConfig) -> Result<Self, RedisClientError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| RedisClientError::ConfigError(format!("Invalid Redis URL: {}", e)))?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            RedisClientError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        tracing::info!(url = %sanitize_url(&config.url), "Redis client connected");

        Ok(Self {
            manager,
            config: Arc::new(config),
        })
    }

    /// Sends PING; `Ok(true)` on PONG
    pub async fn ping(&self) -> Result<bool, RedisClientError> {
        let mut conn = self.manager.clone();

        let pong: String = tokio::time::timeout(
            self.config.command_timeout(),
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        .map_err(|_| RedisClientError::Timeout)??;

        Ok(pong == "PONG")
    }

    /// Connection handle; cheap to clone
    pub fn get_connection(&self) -> ConnectionManager {
        self.manager.clone()
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }
}

/// Replaces credentials in a Redis URL with `***:***` for logging
pub fn sanitize_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(scheme_end) = url.find("://") {
            let scheme = &url[..scheme_end + 3];
            let host = &url[at_pos + 1..];
            return format!("{}***:***@{}", scheme, host);
        }
    }
    url.to_string()
}
