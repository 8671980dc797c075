/// In-process lock store
///
/// Same contract as the Redis backend over a map guarded by a mutex. Only
/// serializes work inside one process; used when no `REDIS_URL` is set and
/// in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{DistributedLock, LockError};

#[derive(Debug)]
struct Entry {
    token: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct MemoryLock {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired locks
    pub async fn held(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.expires_at > now)
            .count()
    }
}

#[async_trait]
impl DistributedLock for MemoryLock {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        // Sweep expired entries
        entries.retain(|_, e| e.expires_at > now);

        if entries.contains_key(key) {
            return Ok(false);
        }

        entries.insert(
            key.to_string(),
            Entry {
                token: token.to_string(),
                expires_at: now + ttl,
            },
        );

        Ok(true)
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some(entry) if entry.expires_at <= now => {
                entries.remove(key);
                Ok(false)
            }
            Some(entry) if entry.token == token => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(1);

    #[tokio::test]
    async fn test_exclusive() {
        let lock = MemoryLock::new();

        assert!(lock.try_acquire("k", "a", TTL).await.unwrap());
        assert!(!lock.try_acquire("k", "b", TTL).await.unwrap());
        assert_eq!(lock.held().await, 1);
    }

    #[tokio::test]
    async fn test_release_requires_matching_token() {
        let lock = MemoryLock::new();
        lock.try_acquire("k", "a", TTL).await.unwrap();

        assert!(!lock.release("k", "b").await.unwrap());
        assert!(lock.release("k", "a").await.unwrap());
        assert!(!lock.release("k", "a").await.unwrap());
        assert_eq!(lock.held().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_lock_can_be_taken() {
        let lock = MemoryLock::new();
        lock.try_acquire("k", "a", TTL).await.unwrap();

        tokio::time::advance(TTL + Duration::from_millis(1)).await;

        assert!(lock.try_acquire("k", "b", TTL).await.unwrap());
        // The original holder no longer owns it
        assert!(!lock.release("k", "a").await.unwrap());
        assert!(lock.release("k", "b").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_swept() {
        let lock = MemoryLock::new();
        lock.try_acquire("a", "t", TTL).await.unwrap();
        lock.try_acquire("b", "t", TTL).await.unwrap();
        lock.try_acquire("c", "t", TTL).await.unwrap();

        tokio::time::advance(TTL + Duration::from_millis(1)).await;

        // Releasing an expired key drops it even without the owner's token
        assert!(!lock.release("a", "other").await.unwrap());
        assert_eq!(lock.entries.lock().await.len(), 2);

        // Any acquire clears the rest
        assert!(lock.try_acquire("d", "t", TTL).await.unwrap());
        let entries = lock.entries.lock().await;
        assert_eq!(entries.len(), 1);
        assert!(entries.contains_key("d"));
    }
}
