//! Vulnerability scanner abstraction
//!
//! The cache pipeline only knows the [`Scanner`] trait; [`GrypeScanner`] is the
//! production implementation. [`ScannerInvoker`] wraps a scanner and stamps
//! each completed scan.

pub mod grype;
#[cfg(test)]
pub mod mock;
mod result;
pub mod severity;

pub use grype::GrypeScanner;
pub use result::{ScanPayload, ScanReport, ScanResult};
pub use severity::{Severity, SeverityCounts};

use crate::error::ScanCacheResult;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// External vulnerability scanner
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scan an image reference and summarize the findings
    async fn scan(&self, image: &str) -> ScanCacheResult<ScanReport>;

    /// Refresh the scanner's vulnerability database
    async fn update_database(&self) -> ScanCacheResult<()>;

    /// Get the human-readable scanner name for logs
    fn scanner_name(&self) -> &'static str;
}

/// Runs scans and turns reports into timestamped [`ScanResult`]s
#[derive(Clone)]
pub struct ScannerInvoker {
    scanner: Arc<dyn Scanner>,
}

impl ScannerInvoker {
    pub fn new(scanner: Arc<dyn Scanner>) -> Self {
        Self { scanner }
    }

    /// Scan `scan_name`, stamping the result at completion
    pub async fn invoke(&self, scan_name: &str) -> ScanCacheResult<ScanResult> {
        let started = Instant::now();
        info!(
            image = scan_name,
            scanner = self.scanner.scanner_name(),
            "Scanning image"
        );

        let report = self.scanner.scan(scan_name).await?;
        let result = ScanResult::new(scan_name, report, Utc::now());

        info!(
            image = scan_name,
            total = result.severity_counts().total(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scan complete"
        );
        Ok(result)
    }

    /// Refresh the vulnerability database
    pub async fn update_database(&self) -> ScanCacheResult<()> {
        self.scanner.update_database().await
    }
}
