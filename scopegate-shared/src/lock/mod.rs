/// Distributed locks
///
/// Serializes work on one key (a login attempt, a password reset, a post
/// update) across every API instance. Backends implement the two primitives
/// of [`DistributedLock`]; [`LockManager`] adds the wait loop and the
/// acquire/run/release wrapper handlers use.
///
/// # Keys
///
/// - `login:{user_id}`
/// - `password-reset:{user_id}`
/// - `post:{post_id}`
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use scopegate_shared::lock::{memory::MemoryLock, LockError, LockManager, LockSettings};
///
/// # async fn example() -> Result<(), LockError> {
/// let locks = LockManager::new(Arc::new(MemoryLock::new()), LockSettings::default());
///
/// let value = locks
///     .with_lock("post:42", || async { Ok::<_, LockError>(42) })
///     .await?;
/// assert_eq!(value, 42);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Delay between acquisition attempts
pub const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Lock errors
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// Another holder kept the key past the wait time
    #[error("Resource is busy, try again: {key}")]
    Busy { key: String },

    /// Backend failure
    #[error("Lock backend error: {0}")]
    Backend(String),
}

impl From<::redis::RedisError> for LockError {
    fn from(err: ::redis::RedisError) -> Self {
        LockError::Backend(err.to_string())
    }
}

/// Lock store primitives
///
/// `token` identifies the holder; release must only delete a key still
/// held under the same token, so an expired holder cannot release a lock
/// that has since been taken by someone else.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Takes `key` if free; `Ok(false)` if held
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Releases `key` if still held by `token`; `Ok(false)` otherwise
    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}

/// Lock timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSettings {
    /// Expiry of a held lock; bounds how long a crashed holder blocks others
    pub ttl: Duration,

    /// How long to keep retrying before giving up
    pub wait: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_millis(10_000),
            wait: Duration::from_millis(3_000),
        }
    }
}

/// A held lock; pass back to [`LockManager::release`]
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    token: String,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Shared lock handle kept in application state
#[derive(Clone)]
pub struct LockManager {
    backend: Arc<dyn DistributedLock>,
    settings: LockSettings,
}

impl LockManager {
    pub fn new(backend: Arc<dyn DistributedLock>, settings: LockSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> LockSettings {
        self.settings
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend()
    }

    /// Acquires `key`, polling until the wait time runs out
    ///
    /// # Errors
    ///
    /// `LockError::Busy` if the key is still held after `settings.wait`.
    pub async fn acquire(&self, key: &str) -> Result<LockGuard, LockError> {
        let token = Uuid::new_v4().to_string();
        let deadline = tokio::time::Instant::now() + self.settings.wait;

        loop {
            if self.backend.try_acquire(key, &token, self.settings.ttl).await? {
                tracing::debug!(key = %key, backend = self.backend.backend(), "lock acquired");
                return Ok(LockGuard {
                    key: key.to_string(),
                    token,
                });
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::debug!(key = %key, "lock busy, giving up");
                return Err(LockError::Busy {
                    key: key.to_string(),
                });
            }

            tokio::time::sleep(RETRY_INTERVAL.min(deadline - now)).await;
        }
    }

    /// Releases a held lock
    ///
    /// Returns false if the lock had already expired and been lost.
    pub async fn release(&self, guard: LockGuard) -> Result<bool, LockError> {
        let released = self.backend.release(&guard.key, &guard.token).await?;
        if !released {
            tracing::warn!(key = %guard.key, "lock expired before release");
        }
        Ok(released)
    }

    /// Runs `f` while holding `key`
    ///
    /// The lock is released whether `f` succeeds or fails. A failed release
    /// is logged, not returned; the TTL reclaims the key.
    pub async fn with_lock<F, Fut, T, E>(&self, key: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<LockError>,
    {
        let guard = self.acquire(key).await?;
        let result = f().await;

        if let Err(e) = self.release(guard).await {
            tracing::warn!(key = %key, error = %e, "failed to release lock");
        }

        result
    }
}

impl std::fmt::Debug for LockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockManager")
            .field("backend", &self.backend.backend())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Lock key for a login attempt
pub fn login_key(user_id: Uuid) -> String {
    format!("login:{}", user_id)
}

/// Lock key for a password reset
pub fn password_reset_key(user_id: Uuid) -> String {
    format!("password-reset:{}", user_id)
}

/// Lock key for mutating a post
pub fn post_key(post_id: Uuid) -> String {
    format!("post:{}", post_id)
}
