//! Scriptable scanner for unit tests

use crate::error::{ScanCacheError, ScanCacheResult};
use crate::scanner::{ScanReport, Scanner, SeverityCounts};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scanner double that counts invocations and returns canned counts
pub struct MockScanner {
    counts: Mutex<SeverityCounts>,
    delay: Option<Duration>,
    fail_scans: AtomicBool,
    fail_db_update: AtomicBool,
    scans: AtomicUsize,
    db_updates: AtomicUsize,
}

impl MockScanner {
    pub fn new(counts: SeverityCounts) -> Self {
        Self {
            counts: Mutex::new(counts),
            delay: None,
            fail_scans: AtomicBool::new(false),
            fail_db_update: AtomicBool::new(false),
            scans: AtomicUsize::new(0),
            db_updates: AtomicUsize::new(0),
        }
    }

    /// Sleep (on the tokio clock) before each scan returns
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_counts(&self, counts: SeverityCounts) {
        *self.counts.lock().unwrap() = counts;
    }

    pub fn fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::SeqCst);
    }

    pub fn fail_db_update(&self, fail: bool) {
        self.fail_db_update.store(fail, Ordering::SeqCst);
    }

    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    pub fn db_update_count(&self) -> usize {
        self.db_updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scanner for MockScanner {
    async fn scan(&self, image: &str) -> ScanCacheResult<ScanReport> {
        let run = self.scans.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(ScanCacheError::ScanExecution {
                image: image.to_string(),
                reason: "exit code 1: could not fetch image".to_string(),
            });
        }

        Ok(ScanReport {
            severity_counts: self.counts.lock().unwrap().clone(),
            full_report: json!({ "matches": [], "source": { "target": image }, "run": run }),
        })
    }

    async fn update_database(&self) -> ScanCacheResult<()> {
        self.db_updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_db_update.load(Ordering::SeqCst) {
            return Err(ScanCacheError::DbUpdate("network unreachable".to_string()));
        }
        Ok(())
    }

    fn scanner_name(&self) -> &'static str {
        "mock"
    }
}
