/// Redis lock store
///
/// Acquire is `SET key token NX PX ttl`. Release runs a Lua script that
/// deletes the key only if it still holds the caller's token, so a holder
/// whose lock expired cannot free a lock someone else now holds.

use async_trait::async_trait;
use std::time::Duration;

use super::{DistributedLock, LockError};
use crate::redis::RedisClient;

const KEY_PREFIX: &str = "lock:";

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisLock {
    client: RedisClient,
    release: ::redis::Script,
}

impl RedisLock {
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            release: ::redis::Script::new(RELEASE_SCRIPT),
        }
    }

    fn redis_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

#[async_trait]
impl DistributedLock for RedisLock {
    async fn try_acquire(&self, key: &str, token: &str, ttl: Duration) -> Result<bool, LockError> {
        let mut conn = self.client.get_connection();

        let reply: Option<String> = ::redis::cmd("SET")
            .arg(Self::redis_key(key))
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        Ok(reply.is_some())
    }

    async fn release(&self, key: &str, token: &str) -> Result<bool, LockError> {
        let mut conn = self.client.get_connection();

        let deleted: i64 = self
            .release
            .key(Self::redis_key(key))
            .arg(token)
            .invoke_async(&mut conn)
            .await?;

        Ok(deleted == 1)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
