//! Per-image scan locks
//!
//! When two requests miss the cache for the same image at once, only the
//! first should run the scanner. The lock is taken before lookup and held
//! until the response is built, so the second request's lookup sees the
//! first request's write as a hit.

use crate::error::ScanCacheResult;
use crate::pipeline::{ScanContext, Stage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Async mutex per scan name
#[derive(Debug, Default)]
pub struct ScanLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ScanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `scan_name`
    pub async fn acquire(&self, scan_name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop locks nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(scan_name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        if let Ok(guard) = lock.clone().try_lock_owned() {
            return guard;
        }
        debug!(scan_name, "Waiting for in-flight scan");
        lock.lock_owned().await
    }

    /// Number of scan names currently tracked
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Pipeline stage holding the scan lock for the rest of the request
pub struct AcquireScanLock(pub Arc<ScanLocks>);

#[async_trait]
impl Stage<ScanContext> for AcquireScanLock {
    fn name(&self) -> &'static str {
        "scan-lock"
    }

    async fn run(&self, mut ctx: ScanContext) -> ScanCacheResult<ScanContext> {
        ctx.scan_lock = Some(self.0.acquire(&ctx.scan_name).await);
        Ok(ctx)
    }
}
