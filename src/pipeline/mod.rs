//! Request pipelines
//!
//! A request is served by running an ordered list of stages over a context
//! record. Each stage takes the context by value and returns it, possibly
//! updated; the first error stops the run.
//!
//! | Route | Stages |
//! |-------|--------|
//! | `GET /images` | db-freshness-check, list-images, db-update-if-stale, mark-db-fresh |
//! | `POST /images/scan` | scan-lock, cache-lookup, scan-if-miss, cache-write |
//! | `POST /images/rescan` | scan-lock, scan-always, cache-write |
//!
//! `scan-lock` is only present when concurrent scan deduplication is enabled.

pub mod context;
pub mod freshness;
pub mod inflight;
pub mod scan;

pub use context::{ImagesContext, ScanContext, ScanOutcome};
pub use freshness::DbFreshnessGate;
pub use inflight::ScanLocks;
pub use scan::CacheOrchestrator;

use crate::cache::CacheStore;
use crate::docker::ImageCatalog;
use crate::error::ScanCacheResult;
use crate::scanner::ScannerInvoker;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One unit of request processing
#[async_trait]
pub trait Stage<C: Send + 'static>: Send + Sync {
    /// Stage name used in logs and error messages
    fn name(&self) -> &'static str;

    /// Run the stage, returning the updated context
    async fn run(&self, ctx: C) -> ScanCacheResult<C>;
}

/// Ordered stages executed sequentially
pub struct Pipeline<C: Send + 'static> {
    name: &'static str,
    stages: Vec<Arc<dyn Stage<C>>>,
}

impl<C: Send + 'static> Pipeline<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stages: Vec::new(),
        }
    }

    /// Append a stage
    pub fn stage(mut self, stage: impl Stage<C> + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Append a stage only when `enabled`
    pub fn stage_if(self, enabled: bool, stage: impl Stage<C> + 'static) -> Self {
        if enabled {
            self.stage(stage)
        } else {
            self
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure
    pub async fn run(&self, mut ctx: C) -> ScanCacheResult<C> {
        for stage in &self.stages {
            debug!(pipeline = self.name, stage = stage.name(), "Running stage");
            ctx = stage.run(ctx).await.map_err(|e| e.in_stage(stage.name()))?;
        }
        Ok(ctx)
    }
}

/// Knobs for building the route pipelines
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Serialize scans of the same image
    pub dedupe_concurrent_scans: bool,

    /// Lifetime of the database freshness flag
    pub db_status_ttl: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            dedupe_concurrent_scans: true,
            db_status_ttl: freshness::DB_STATUS_TTL,
        }
    }
}

/// The three route pipelines sharing one store and scanner
pub struct Pipelines {
    pub images: Pipeline<ImagesContext>,
    pub scan: Pipeline<ScanContext>,
    pub rescan: Pipeline<ScanContext>,
    pub orchestrator: Arc<CacheOrchestrator>,
}

impl Pipelines {
    pub fn build(
        store: Arc<dyn CacheStore>,
        invoker: ScannerInvoker,
        catalog: Arc<dyn ImageCatalog>,
        options: &PipelineOptions,
    ) -> Self {
        let orchestrator = Arc::new(CacheOrchestrator::new(store.clone(), invoker.clone()));
        let gate = Arc::new(DbFreshnessGate::new(store, options.db_status_ttl));
        let locks = Arc::new(ScanLocks::new());
        let dedupe = options.dedupe_concurrent_scans;

        let images = Pipeline::new("images")
            .stage(freshness::CheckDbFreshness(gate.clone()))
            .stage(freshness::ListImages(catalog))
            .stage(freshness::UpdateDbIfStale(invoker))
            .stage(freshness::MarkDbFresh(gate));

        let scan = Pipeline::new("scan")
            .stage_if(dedupe, inflight::AcquireScanLock(locks.clone()))
            .stage(scan::Lookup(orchestrator.clone()))
            .stage(scan::ScanIfMiss(orchestrator.clone()))
            .stage(scan::WriteBack(orchestrator.clone()));

        let rescan = Pipeline::new("rescan")
            .stage_if(dedupe, inflight::AcquireScanLock(locks))
            .stage(scan::ScanAlways(orchestrator.clone()))
            .stage(scan::WriteBack(orchestrator.clone()));

        Self {
            images,
            scan,
            rescan,
            orchestrator,
        }
    }
}
