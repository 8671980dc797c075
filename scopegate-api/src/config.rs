/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS and strict CORS (default: false)
/// - `APP_BASE_URL`: Base of links sent by mail (default: http://localhost:3000)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Token signing key, at least 32 characters (required)
/// - `ENCRYPTION_SECRET`: Payload encryption secret, at least 32 characters (required)
/// - `REDIS_URL`: Lock store; in-process locks when unset
/// - `LOCK_TTL_MS`: Lock expiry (default: 10000)
/// - `LOCK_WAIT_MS`: How long to wait for a busy lock (default: 3000)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use scopegate_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use anyhow::Context;
use scopegate_shared::lock::LockSettings;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Minimum length of `JWT_SECRET` and `ENCRYPTION_SECRET`
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub encryption: EncryptionConfig,
    pub lock: LockConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// `*` allows any origin
    pub cors_origins: Vec<String>,

    pub production: bool,

    /// Public base URL used to build links in outgoing mail
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Generate with: `openssl rand -hex 32`
    #[serde(skip_serializing)]
    pub secret: String,
}

/// Response payload encryption
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    #[serde(skip_serializing)]
    pub secret: String,
}

/// Distributed lock configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// `None` selects the in-process lock store
    pub redis_url: Option<String>,
    pub ttl_ms: u64,
    pub wait_ms: u64,
}

impl LockConfig {
    pub fn settings(&self) -> LockSettings {
        LockSettings {
            ttl: Duration::from_millis(self.ttl_ms),
            wait: Duration::from_millis(self.wait_ms),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value", key)),
        _ => Ok(default),
    }
}

fn required_secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    let secret = lookup(key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))?;

    if secret.len() < MIN_SECRET_LENGTH {
        anyhow::bail!("{} must be at least {} characters long", key, MIN_SECRET_LENGTH);
    }

    Ok(secret)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(&lookup, "API_PORT", 8080u16)?;

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| vec!["*".to_string()]);

        let production = parse_or(&lookup, "PRODUCTION", false)?;
        let base_url =
            lookup("APP_BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string());

        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;

        let jwt_secret = required_secret(&lookup, "JWT_SECRET")?;
        let encryption_secret = required_secret(&lookup, "ENCRYPTION_SECRET")?;

        let redis_url = lookup("REDIS_URL").filter(|s| !s.trim().is_empty());
        let ttl_ms = parse_or(&lookup, "LOCK_TTL_MS", 10_000u64)?;
        let wait_ms = parse_or(&lookup, "LOCK_WAIT_MS", 3_000u64)?;

        if ttl_ms == 0 {
            anyhow::bail!("LOCK_TTL_MS must be greater than zero");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
                base_url,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            encryption: EncryptionConfig {
                secret: encryption_secret,
            },
            lock: LockConfig {
                redis_url,
                ttl_ms,
                wait_ms,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Whether any origin may call the API
    pub fn allows_any_origin(&self) -> bool {
        self.api.cors_origins.iter().any(|o| o == "*")
    }
}
