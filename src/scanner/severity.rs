//! Severity labels and per-severity tallies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity levels grype can assign to a vulnerability match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Unknown,
    Negligible,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Every severity the scanner can emit
    pub const ALL: [Severity; 6] = [
        Self::Unknown,
        Self::Negligible,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    /// Label as it appears in scanner output and in cached counts
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Negligible => "Negligible",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    /// Parse a label, ignoring case
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.as_label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Vulnerability count per severity label.
///
/// Always carries a key for every [`Severity`], zero when nothing was found
/// at that level. Labels outside the known set are kept under their own name
/// so nothing reported by the scanner is dropped. Deserializing fills in any
/// missing severities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u64>")]
pub struct SeverityCounts(BTreeMap<String, u64>);

impl SeverityCounts {
    /// Counts with every known severity at zero
    pub fn zeroed() -> Self {
        Self(
            Severity::ALL
                .iter()
                .map(|s| (s.as_label().to_string(), 0))
                .collect(),
        )
    }

    /// Build from (label, count) pairs on top of the zeroed set
    pub fn from_counts<'a>(counts: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        let mut tally = Self::zeroed();
        for (label, count) in counts {
            *tally.slot(label) += count;
        }
        tally
    }

    /// Count one match at the given label
    pub fn record(&mut self, label: &str) {
        *self.slot(label) += 1;
    }

    /// Count for a known severity
    pub fn get(&self, severity: Severity) -> u64 {
        self.count(severity.as_label())
    }

    /// Count for an arbitrary label (0 if never seen)
    pub fn count(&self, label: &str) -> u64 {
        self.0.get(label).copied().unwrap_or(0)
    }

    /// Total matches across all labels
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn slot(&mut self, label: &str) -> &mut u64 {
        let key = match Severity::from_label(label) {
            Some(severity) => severity.as_label().to_string(),
            None if label.trim().is_empty() => Severity::Unknown.as_label().to_string(),
            None => label.to_string(),
        };
        self.0.entry(key).or_insert(0)
    }
}

impl From<BTreeMap<String, u64>> for SeverityCounts {
    fn from(raw: BTreeMap<String, u64>) -> Self {
        Self::from_counts(raw.iter().map(|(label, count)| (label.as_str(), *count)))
    }
}

impl Default for SeverityCounts {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_has_every_severity() {
        let counts = SeverityCounts::zeroed();
        for severity in Severity::ALL {
            assert_eq!(counts.get(severity), 0);
        }
        assert_eq!(counts.iter().count(), Severity::ALL.len());
    }

    #[test]
    fn record_normalizes_labels() {
        let mut counts = SeverityCounts::zeroed();
        counts.record("high");
        counts.record("High");
        counts.record("");
        counts.record("Moderate");

        assert_eq!(counts.get(Severity::High), 2);
        assert_eq!(counts.get(Severity::Unknown), 1);
        assert_eq!(counts.count("Moderate"), 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn serializes_as_plain_map() {
        let counts = SeverityCounts::from_counts([("Low", 19), ("Medium", 11), ("Negligible", 3)]);
        let json = serde_json::to_value(&counts).unwrap();

        assert_eq!(json["Low"], 19);
        assert_eq!(json["Medium"], 11);
        assert_eq!(json["Negligible"], 3);
        assert_eq!(json["Critical"], 0);
    }

    #[test]
    fn deserializing_fills_missing_severities() {
        let counts: SeverityCounts =
            serde_json::from_str(r#"{"Low":19,"Medium":11,"Negligible":3}"#).unwrap();

        assert_eq!(counts.iter().count(), Severity::ALL.len());
        for severity in [Severity::Unknown, Severity::High, Severity::Critical] {
            assert_eq!(counts.get(severity), 0);
        }
        assert_eq!(
            counts,
            SeverityCounts::from_counts([("Low", 19), ("Medium", 11), ("Negligible", 3)])
        );
    }

    #[test]
    fn deserializing_normalizes_label_case() {
        let counts: SeverityCounts = serde_json::from_str(r#"{"high":2,"Moderate":1}"#).unwrap();

        assert_eq!(counts.get(Severity::High), 2);
        assert_eq!(counts.count("Moderate"), 1);
        assert_eq!(counts.count("high"), 0);
    }

    #[test]
    fn from_label_roundtrip() {
        for severity in Severity::ALL {
            assert_eq!(Severity::from_label(severity.as_label()), Some(severity));
        }
        assert_eq!(Severity::from_label(" critical "), Some(Severity::Critical));
        assert_eq!(Severity::from_label("severe"), None);
    }
}
