//! Scan cache orchestration
//!
//! Lookup, scan and write-back stages for the scan and rescan routes. Lookup
//! always precedes the scan and write-back always follows it; a stage that
//! fails stops the request before anything is written.

use crate::cache::{CacheStore, ScanKeys, ScanResultCodec};
use crate::error::{ScanCacheError, ScanCacheResult};
use crate::pipeline::{ScanContext, ScanOutcome, Stage};
use crate::scanner::{ScanPayload, ScanResult, ScannerInvoker};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Reads, computes and persists scan results
pub struct CacheOrchestrator {
    store: Arc<dyn CacheStore>,
    invoker: ScannerInvoker,
}

impl CacheOrchestrator {
    pub fn new(store: Arc<dyn CacheStore>, invoker: ScannerInvoker) -> Self {
        Self { store, invoker }
    }

    /// Read the cached entry for `scan_name`.
    ///
    /// `None` is a miss. A hit may be partial if an earlier write-back
    /// failed part-way. Store errors propagate.
    pub async fn lookup(&self, scan_name: &str) -> ScanCacheResult<Option<ScanPayload>> {
        let keys = ScanKeys::for_scan(scan_name);

        let vulnerabilities = self.store.get(&keys.vulnerabilities).await?;
        let everything = self.store.get(&keys.everything).await?;
        let timestamp = self.store.get(&keys.timestamp).await?;

        let cached = ScanResultCodec::decode(vulnerabilities, everything, timestamp);
        if cached.is_none() {
            info!("Cache miss: {}", scan_name);
        }
        Ok(cached)
    }

    /// Run the scanner for `scan_name`
    pub async fn scan(&self, scan_name: &str) -> ScanCacheResult<ScanResult> {
        self.invoker.invoke(scan_name).await
    }

    /// Persist a completed scan, overwriting any previous entry.
    ///
    /// Keys are written in order; the first failure stops the remaining
    /// writes. Keys already written stay written.
    pub async fn write_back(&self, result: &ScanResult) -> ScanCacheResult<()> {
        let scan_name = result.scan_name();
        let keys = ScanKeys::for_scan(scan_name);
        let encoded = ScanResultCodec::encode(result)?;

        for (written, (key, value)) in keys.all().into_iter().zip(encoded.values()).enumerate() {
            if let Err(e) = self.store.set(key, value).await {
                return Err(match written {
                    0 => e,
                    _ => ScanCacheError::PartialCacheWrite {
                        scan_name: scan_name.to_string(),
                        key: key.to_string(),
                        written,
                        source: Box::new(e),
                    },
                });
            }
        }

        debug!("Cached scan of {}", scan_name);
        Ok(())
    }

    /// Remove the cached entry for `scan_name`; `true` if anything was removed
    pub async fn evict(&self, scan_name: &str) -> ScanCacheResult<bool> {
        let keys = ScanKeys::for_scan(scan_name);
        let mut removed = false;
        for key in keys.all() {
            removed |= self.store.delete(key).await?;
        }

        if removed {
            info!("Evicted cached scan of {}", scan_name);
        }
        Ok(removed)
    }
}

/// Attach a cached entry to the context when one exists
pub struct Lookup(pub Arc<CacheOrchestrator>);

#[async_trait]
impl Stage<ScanContext> for Lookup {
    fn name(&self) -> &'static str {
        "cache-lookup"
    }

    async fn run(&self, mut ctx: ScanContext) -> ScanCacheResult<ScanContext> {
        if let Some(cached) = self.0.lookup(&ctx.scan_name).await? {
            debug!(request_id = %ctx.request_id, "Cache hit: {}", ctx.scan_name);
            ctx.outcome = Some(ScanOutcome::Cached(cached));
        }
        Ok(ctx)
    }
}

/// Scan only when lookup left the context empty
pub struct ScanIfMiss(pub Arc<CacheOrchestrator>);

#[async_trait]
impl Stage<ScanContext> for ScanIfMiss {
    fn name(&self) -> &'static str {
        "scan-if-miss"
    }

    async fn run(&self, mut ctx: ScanContext) -> ScanCacheResult<ScanContext> {
        if ctx.outcome.is_some() {
            return Ok(ctx);
        }
        let result = self.0.scan(&ctx.scan_name).await?;
        ctx.outcome = Some(ScanOutcome::Scanned(result));
        ctx.add_to_cache = true;
        Ok(ctx)
    }
}

/// Scan regardless of cache state
pub struct ScanAlways(pub Arc<CacheOrchestrator>);

#[async_trait]
impl Stage<ScanContext> for ScanAlways {
    fn name(&self) -> &'static str {
        "scan-always"
    }

    async fn run(&self, mut ctx: ScanContext) -> ScanCacheResult<ScanContext> {
        let result = self.0.scan(&ctx.scan_name).await?;
        ctx.outcome = Some(ScanOutcome::Scanned(result));
        ctx.add_to_cache = true;
        Ok(ctx)
    }
}

/// Persist a freshly scanned result when `add_to_cache` is set
pub struct WriteBack(pub Arc<CacheOrchestrator>);

#[async_trait]
impl Stage<ScanContext> for WriteBack {
    fn name(&self) -> &'static str {
        "cache-write"
    }

    async fn run(&self, ctx: ScanContext) -> ScanCacheResult<ScanContext> {
        if !ctx.add_to_cache {
            return Ok(ctx);
        }
        match &ctx.outcome {
            Some(ScanOutcome::Scanned(result)) => self.0.write_back(result).await?,
            _ => {
                return Err(ScanCacheError::Internal(format!(
                    "no fresh scan of {} to cache",
                    ctx.scan_name
                )))
            }
        }
        Ok(ctx)
    }
}
