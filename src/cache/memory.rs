//! In-process cache store
//!
//! Same semantics as the Redis backend (SET clears TTL, EXPIRE on a missing key
//! returns false). Expiry follows the tokio clock, so tests can pause and
//! advance time.

use crate::cache::CacheStore;
use crate::error::ScanCacheResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// HashMap-backed store for tests and single-process runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.lock()
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Every update is a single map operation, so a poisoned map is still consistent
    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove `key` if it has expired, returning the live entry otherwise
    fn live<'a>(entries: &'a mut HashMap<String, Entry>, key: &str) -> Option<&'a mut Entry> {
        let now = Instant::now();
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> ScanCacheResult<Option<String>> {
        let mut entries = self.lock();
        Ok(Self::live(&mut entries, key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> ScanCacheResult<()> {
        self.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> ScanCacheResult<bool> {
        let mut entries = self.lock();
        match Self::live(&mut entries, key) {
            Some(entry) => {
                // A deadline past the clock's range never arrives
                entry.expires_at = Instant::now().checked_add(ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> ScanCacheResult<bool> {
        let mut entries = self.lock();
        let existed = Self::live(&mut entries, key).is_some();
        entries.remove(key);
        Ok(existed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
