//! Key-value cache for scan results
//!
//! Scan results live in an external string-keyed store with per-key expiry.
//! Each scanned image occupies three keys (counts, full report, timestamp);
//! the database-freshness flag is a single key with a 24 hour TTL.
//!
//! # Key layout
//!
//! | Key | Value | TTL |
//! |-----|-------|-----|
//! | `{scanName}&vulnerabilities` | severity counts (JSON object) | none |
//! | `{scanName}&everything` | full scanner report (JSON) | none |
//! | `{scanName}&timestamp` | scan completion time (JSON string) | none |
//! | `cachedDbStatus` | `true` | 24h |
//!
//! The three scan keys are written one after another. The store offers no
//! multi-key transaction, so a failure part-way leaves a partial entry.

pub mod codec;
mod factory;
pub mod key;
mod memory;
#[cfg(test)]
pub mod mock;
mod redis_store;

pub use codec::ScanResultCodec;
pub use factory::create_store;
pub use key::{ScanKeys, DB_STATUS_KEY};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::error::ScanCacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// String-keyed store with per-key expiry
///
/// Implementations must make each single-key operation atomic; nothing more
/// is assumed.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a key; `None` if absent or expired
    async fn get(&self, key: &str) -> ScanCacheResult<Option<String>>;

    /// Write a key, replacing any value and clearing any expiry
    async fn set(&self, key: &str, value: &str) -> ScanCacheResult<()>;

    /// Expire a key after `ttl`; `false` if the key does not exist
    async fn expire(&self, key: &str, ttl: Duration) -> ScanCacheResult<bool>;

    /// Remove a key; `false` if it did not exist
    async fn delete(&self, key: &str) -> ScanCacheResult<bool>;

    /// Get the backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}
