//! Completed scans and the shape handed back to clients

use crate::scanner::severity::SeverityCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw scanner output reduced to what the cache needs
#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    /// Matches tallied by severity
    pub severity_counts: SeverityCounts,

    /// The scanner's complete JSON document, uninterpreted
    pub full_report: Value,
}

/// One completed scan of one image.
///
/// Immutable once built; a rescan produces a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    scan_name: String,
    severity_counts: SeverityCounts,
    full_report: Value,
    timestamp: DateTime<Utc>,
}

impl ScanResult {
    /// Stamp a finished report
    pub fn new(scan_name: impl Into<String>, report: ScanReport, timestamp: DateTime<Utc>) -> Self {
        Self {
            scan_name: scan_name.into(),
            severity_counts: report.severity_counts,
            full_report: report.full_report,
            timestamp,
        }
    }

    pub fn scan_name(&self) -> &str {
        &self.scan_name
    }

    pub fn severity_counts(&self) -> &SeverityCounts {
        &self.severity_counts
    }

    pub fn full_report(&self) -> &Value {
        &self.full_report
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Response body for scan endpoints, also the decoded view of a cache entry.
///
/// `everything` and `timestamp` are `None` when a cache entry was only
/// partially written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPayload {
    pub vulnerabilities: SeverityCounts,
    pub everything: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<ScanResult> for ScanPayload {
    fn from(result: ScanResult) -> Self {
        Self {
            vulnerabilities: result.severity_counts,
            everything: Some(result.full_report),
            timestamp: Some(result.timestamp),
        }
    }
}
