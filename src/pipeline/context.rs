//! Per-request context records threaded through pipeline stages

use crate::docker::ImageSummary;
use crate::error::{ScanCacheError, ScanCacheResult};
use crate::scanner::{ScanPayload, ScanResult};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

/// Where a request's scan data came from
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    /// Decoded from the cache; may be partial
    Cached(ScanPayload),
    /// Produced by the scanner during this request
    Scanned(ScanResult),
}

impl ScanOutcome {
    pub fn into_payload(self) -> ScanPayload {
        match self {
            Self::Cached(payload) => payload,
            Self::Scanned(result) => result.into(),
        }
    }
}

/// State of one scan or rescan request
#[derive(Debug)]
pub struct ScanContext {
    pub request_id: Uuid,

    /// Image reference; also the cache key root
    pub scan_name: String,

    /// Set by lookup on a hit, or by a scan stage
    pub outcome: Option<ScanOutcome>,

    /// Whether the write-back stage should persist `outcome`
    pub add_to_cache: bool,

    /// Held for the rest of the request when scans are deduplicated
    pub(crate) scan_lock: Option<OwnedMutexGuard<()>>,
}

impl ScanContext {
    /// Start a context for `scan_name`, which must not be blank
    pub fn new(scan_name: impl Into<String>) -> ScanCacheResult<Self> {
        let scan_name = scan_name.into().trim().to_string();
        if scan_name.is_empty() {
            return Err(ScanCacheError::InvalidRequest(
                "scanName is required".to_string(),
            ));
        }

        Ok(Self {
            request_id: Uuid::new_v4(),
            scan_name,
            outcome: None,
            add_to_cache: false,
            scan_lock: None,
        })
    }

    /// Whether lookup found a cached entry
    pub fn is_cache_hit(&self) -> bool {
        matches!(self.outcome, Some(ScanOutcome::Cached(_)))
    }

    /// Finish the request, releasing any scan lock
    pub fn into_payload(self) -> ScanCacheResult<ScanPayload> {
        self.outcome
            .map(ScanOutcome::into_payload)
            .ok_or_else(|| {
                ScanCacheError::Internal(format!("pipeline produced no result for {}", self.scan_name))
            })
    }
}

/// State of one image listing request
#[derive(Debug)]
pub struct ImagesContext {
    pub request_id: Uuid,

    /// The freshness flag was set when the request started
    pub db_fresh: bool,

    /// The database update ran during this request
    pub db_updated: bool,

    pub images: Vec<ImageSummary>,
}

impl ImagesContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            db_fresh: false,
            db_updated: false,
            images: Vec::new(),
        }
    }
}

impl Default for ImagesContext {
    fn default() -> Self {
        Self::new()
    }
}
