//! Vulnerability database freshness
//!
//! Listing images doubles as the trigger for refreshing the scanner's
//! database. A flag in the cache records a recent refresh; while it is set,
//! listings skip the update.

use crate::cache::{codec, CacheStore, DB_STATUS_KEY};
use crate::docker::ImageCatalog;
use crate::error::ScanCacheResult;
use crate::pipeline::{ImagesContext, Stage};
use crate::scanner::ScannerInvoker;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default lifetime of the freshness flag (24 hours)
pub const DB_STATUS_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Reads and sets the database freshness flag
pub struct DbFreshnessGate {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl DbFreshnessGate {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Whether the database was refreshed within the TTL.
    ///
    /// A missing, `false` or unreadable flag all count as stale.
    pub async fn check(&self) -> ScanCacheResult<bool> {
        let raw = self.store.get(DB_STATUS_KEY).await?;
        Ok(codec::decode_value::<bool>(DB_STATUS_KEY, raw).unwrap_or(false))
    }

    /// Record a refresh; the flag expires after the TTL.
    ///
    /// The flag is never left without an expiry: if the TTL cannot be
    /// applied the flag is removed again before the error is returned.
    pub async fn mark(&self) -> ScanCacheResult<()> {
        self.store
            .set(DB_STATUS_KEY, &codec::encode_value(&true)?)
            .await?;

        if let Err(e) = self.store.expire(DB_STATUS_KEY, self.ttl).await {
            warn!(error = %e, "Could not expire freshness flag, clearing it");
            if let Err(cleanup) = self.store.delete(DB_STATUS_KEY).await {
                warn!(error = %cleanup, "Failed to clear freshness flag");
            }
            return Err(e);
        }

        debug!(ttl_secs = self.ttl.as_secs(), "Marked vulnerability database fresh");
        Ok(())
    }
}

pub struct CheckDbFreshness(pub Arc<DbFreshnessGate>);

#[async_trait]
impl Stage<ImagesContext> for CheckDbFreshness {
    fn name(&self) -> &'static str {
        "db-freshness-check"
    }

    async fn run(&self, mut ctx: ImagesContext) -> ScanCacheResult<ImagesContext> {
        ctx.db_fresh = self.0.check().await?;
        Ok(ctx)
    }
}

pub struct ListImages(pub Arc<dyn ImageCatalog>);

#[async_trait]
impl Stage<ImagesContext> for ListImages {
    fn name(&self) -> &'static str {
        "list-images"
    }

    async fn run(&self, mut ctx: ImagesContext) -> ScanCacheResult<ImagesContext> {
        ctx.images = self.0.list_images().await?;
        Ok(ctx)
    }
}

/// Refresh the scanner database unless the flag says it is fresh
pub struct UpdateDbIfStale(pub ScannerInvoker);

#[async_trait]
impl Stage<ImagesContext> for UpdateDbIfStale {
    fn name(&self) -> &'static str {
        "db-update-if-stale"
    }

    async fn run(&self, mut ctx: ImagesContext) -> ScanCacheResult<ImagesContext> {
        if ctx.db_fresh {
            return Ok(ctx);
        }
        info!(request_id = %ctx.request_id, "Updating vulnerability database");
        self.0.update_database().await?;
        ctx.db_updated = true;
        Ok(ctx)
    }
}

/// Set the flag after an update; an already fresh flag keeps its expiry
pub struct MarkDbFresh(pub Arc<DbFreshnessGate>);

#[async_trait]
impl Stage<ImagesContext> for MarkDbFresh {
    fn name(&self) -> &'static str {
        "mark-db-fresh"
    }

    async fn run(&self, ctx: ImagesContext) -> ScanCacheResult<ImagesContext> {
        if ctx.db_fresh {
            return Ok(ctx);
        }
        self.0.mark().await?;
        Ok(ctx)
    }
}
