//! Store double with injectable failures

use crate::cache::{CacheStore, MemoryStore};
use crate::error::{ScanCacheError, ScanCacheResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// [`MemoryStore`] that can be told to fail reads or specific writes
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_gets: AtomicBool,
    fail_expires: AtomicBool,
    fail_set_suffix: Mutex<Option<String>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_expires(&self, fail: bool) {
        self.fail_expires.store(fail, Ordering::SeqCst);
    }

    /// Fail every `set` whose key ends with `suffix`
    pub fn fail_sets_ending_with(&self, suffix: &str) {
        *self.fail_set_suffix.lock().unwrap() = Some(suffix.to_string());
    }
}

#[async_trait]
impl CacheStore for FlakyStore {
    async fn get(&self, key: &str) -> ScanCacheResult<Option<String>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(ScanCacheError::cache_unavailable("get", "connection refused"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> ScanCacheResult<()> {
        let fail = self
            .fail_set_suffix
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|suffix| key.ends_with(suffix));
        if fail {
            return Err(ScanCacheError::cache_unavailable("set", "connection reset by peer"));
        }
        self.inner.set(key, value).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> ScanCacheResult<bool> {
        if self.fail_expires.load(Ordering::SeqCst) {
            return Err(ScanCacheError::cache_unavailable("expire", "connection reset by peer"));
        }
        self.inner.expire(key, ttl).await
    }

    async fn delete(&self, key: &str) -> ScanCacheResult<bool> {
        self.inner.delete(key).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}
