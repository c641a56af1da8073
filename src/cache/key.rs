//! Cache key scheme

/// Key of the "vulnerability database refreshed today" flag
pub const DB_STATUS_KEY: &str = "cachedDbStatus";

/// The three keys holding one image's scan result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanKeys {
    pub vulnerabilities: String,
    pub everything: String,
    pub timestamp: String,
}

impl ScanKeys {
    /// Keys for a scan name (the image reference)
    pub fn for_scan(scan_name: &str) -> Self {
        Self {
            vulnerabilities: format!("{}&vulnerabilities", scan_name),
            everything: format!("{}&everything", scan_name),
            timestamp: format!("{}&timestamp", scan_name),
        }
    }

    /// All keys, in write order
    pub fn all(&self) -> [&str; 3] {
        [&self.vulnerabilities, &self.everything, &self.timestamp]
    }
}
