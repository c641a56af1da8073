//! Store factory
//!
//! Picks the configured backend and connects to it.

use crate::cache::{CacheStore, MemoryStore, RedisStore};
use crate::config::schema::{CacheBackend, CacheConfig};
use crate::error::ScanCacheResult;
use std::sync::Arc;
use tracing::warn;

/// Create the cache store selected by `config.backend`
///
/// # Returns
/// * `Ok(Arc<dyn CacheStore>)` - A connected store
/// * `Err` - If the Redis URL is invalid or the server is unreachable
pub async fn create_store(config: &CacheConfig) -> ScanCacheResult<Arc<dyn CacheStore>> {
    match config.backend {
        CacheBackend::Redis => Ok(Arc::new(RedisStore::connect(&config.redis_url).await?)),
        CacheBackend::Memory => {
            warn!("Using in-memory cache; scan results are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
