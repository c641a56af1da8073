//! Redis cache store
//!
//! Uses a multiplexed `ConnectionManager`, which reconnects on its own after
//! connection loss. Failures surface as `CacheUnavailable`; nothing retries.

use crate::cache::CacheStore;
use crate::error::{ScanCacheError, ScanCacheResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, info};

/// Cache store backed by a Redis server
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379`)
    pub async fn connect(url: &str) -> ScanCacheResult<Self> {
        let client =
            redis::Client::open(url).map_err(|e| ScanCacheError::cache_unavailable("connect", e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| ScanCacheError::cache_unavailable("connect", e))?;

        info!("Connected to Redis at {}", redact(url));
        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> ScanCacheResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| ScanCacheError::cache_unavailable("get", e))
    }

    async fn set(&self, key: &str, value: &str) -> ScanCacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(|e| ScanCacheError::cache_unavailable("set", e))?;
        debug!("SET {}", key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> ScanCacheResult<bool> {
        let mut conn = self.conn.clone();
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        conn.expire(key, secs)
            .await
            .map_err(|e| ScanCacheError::cache_unavailable("expire", e))
    }

    async fn delete(&self, key: &str) -> ScanCacheResult<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .del(key)
            .await
            .map_err(|e| ScanCacheError::cache_unavailable("delete", e))?;
        Ok(removed > 0)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Strip credentials from a Redis URL before logging it
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
