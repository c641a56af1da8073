//! Encoding of scan results to and from cache values
//!
//! Every field is stored as its own JSON document. Decoding distinguishes an
//! absent value (`None`) from a present-but-empty one, and treats corrupt
//! JSON as absent rather than failing the request.

use crate::error::ScanCacheResult;
use crate::scanner::{ScanPayload, ScanResult, SeverityCounts};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// The three encoded values of one scan, in key order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedScan {
    pub vulnerabilities: String,
    pub everything: String,
    pub timestamp: String,
}

impl EncodedScan {
    /// Values paired with their position in [`ScanKeys::all`](crate::cache::ScanKeys::all)
    pub fn values(&self) -> [&str; 3] {
        [&self.vulnerabilities, &self.everything, &self.timestamp]
    }
}

/// Serializes scan results field-by-field for the cache
pub struct ScanResultCodec;

impl ScanResultCodec {
    /// Encode a completed scan into its three cache values
    pub fn encode(result: &ScanResult) -> ScanCacheResult<EncodedScan> {
        Ok(EncodedScan {
            vulnerabilities: encode_value(result.severity_counts())?,
            everything: encode_value(result.full_report())?,
            timestamp: encode_value(&result.timestamp())?,
        })
    }

    /// Decode raw cache values.
    ///
    /// Returns `None` (a miss) when the counts are absent or unreadable. The
    /// report and timestamp are passed through as `None` when missing, which
    /// happens after a partial write.
    pub fn decode(
        vulnerabilities: Option<String>,
        everything: Option<String>,
        timestamp: Option<String>,
    ) -> Option<ScanPayload> {
        let vulnerabilities: SeverityCounts = decode_value("vulnerabilities", vulnerabilities)?;
        let everything: Option<Value> = decode_value("everything", everything);
        let timestamp: Option<DateTime<Utc>> = decode_value("timestamp", timestamp);

        Some(ScanPayload {
            vulnerabilities,
            everything,
            timestamp,
        })
    }
}

/// Encode any value as cache text
pub fn encode_value<T: Serialize + ?Sized>(value: &T) -> ScanCacheResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode cache text.
///
/// Absent values and JSON `null` decode to `None`. Corrupt values are logged
/// and also decode to `None`.
pub fn decode_value<T: DeserializeOwned>(field: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match serde_json::from_str::<Option<T>>(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(field, error = %e, "Discarding malformed cache value");
            None
        }
    }
}
