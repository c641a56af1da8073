//! grype-backed scanner
//!
//! Runs `grype <image> -o json` and tallies the `matches` array by severity.

use crate::error::{ScanCacheError, ScanCacheResult};
use crate::process::{output_tail, run_captured, RunError};
use crate::scanner::result::ScanReport;
use crate::scanner::severity::SeverityCounts;
use crate::scanner::Scanner;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Scanner that shells out to the grype CLI
pub struct GrypeScanner {
    binary: String,
    timeout: Option<Duration>,
}

impl GrypeScanner {
    /// Create a scanner using the given grype executable
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    /// Kill scans that run longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn run_error(&self, image: &str, command: String, err: RunError) -> ScanCacheError {
        match err {
            RunError::NotFound => ScanCacheError::ScannerNotFound(self.binary.clone()),
            RunError::TimedOut(limit) => ScanCacheError::ScanTimeout {
                image: image.to_string(),
                secs: limit.as_secs(),
            },
            RunError::Spawn(source) => ScanCacheError::command_failed(command, source),
        }
    }
}

impl Default for GrypeScanner {
    fn default() -> Self {
        Self::new("grype")
    }
}

#[async_trait]
impl Scanner for GrypeScanner {
    async fn scan(&self, image: &str) -> ScanCacheResult<ScanReport> {
        let args = [image, "-o", "json"];
        let output = run_captured(&self.binary, &args, self.timeout)
            .await
            .map_err(|e| self.run_error(image, format!("{} {}", self.binary, args.join(" ")), e))?;

        interpret_scan(image, output.status.code(), &output.stdout, &output.stderr)
    }

    async fn update_database(&self) -> ScanCacheResult<()> {
        debug!("Running {} db update", self.binary);

        let output = run_captured(&self.binary, &["db", "update"], self.timeout)
            .await
            .map_err(|e| match e {
                RunError::TimedOut(limit) => {
                    ScanCacheError::DbUpdate(format!("timed out after {}s", limit.as_secs()))
                }
                other => self.run_error(
                    "vulnerability database",
                    format!("{} db update", self.binary),
                    other,
                ),
            })?;

        if output.status.success() {
            debug!(
                "grype db update: {}",
                String::from_utf8_lossy(&output.stdout).trim()
            );
            Ok(())
        } else {
            Err(ScanCacheError::DbUpdate(output_tail(
                &output.stdout,
                &output.stderr,
            )))
        }
    }

    fn scanner_name(&self) -> &'static str {
        "grype"
    }
}

/// Decide whether a finished grype process produced a usable report.
///
/// grype exits non-zero when a `--fail-on` threshold is met while still
/// writing the full report, so a non-zero exit with a report on stdout is a
/// successful scan. A non-zero exit with nothing on stdout is an execution
/// failure.
pub(crate) fn interpret_scan(
    image: &str,
    code: Option<i32>,
    stdout: &[u8],
    stderr: &[u8],
) -> ScanCacheResult<ScanReport> {
    let has_report = stdout.iter().any(|b| !b.is_ascii_whitespace());

    match code {
        Some(0) => parse_report(image, stdout),
        Some(code) if has_report => {
            debug!(image, code, "grype exited non-zero with a report");
            parse_report(image, stdout)
        }
        Some(code) => Err(ScanCacheError::ScanExecution {
            image: image.to_string(),
            reason: format!("exit code {}: {}", code, output_tail(b"", stderr)),
        }),
        None => Err(ScanCacheError::ScanExecution {
            image: image.to_string(),
            reason: "terminated by signal".to_string(),
        }),
    }
}

/// Parse grype JSON output into severity counts plus the full document
pub(crate) fn parse_report(image: &str, stdout: &[u8]) -> ScanCacheResult<ScanReport> {
    let full_report: Value =
        serde_json::from_slice(stdout).map_err(|e| ScanCacheError::ScanOutput {
            image: image.to_string(),
            reason: e.to_string(),
        })?;

    let matches = full_report
        .get("matches")
        .and_then(Value::as_array)
        .ok_or_else(|| ScanCacheError::ScanOutput {
            image: image.to_string(),
            reason: "report has no `matches` array".to_string(),
        })?;

    let mut severity_counts = SeverityCounts::zeroed();
    for m in matches {
        let label = m
            .pointer("/vulnerability/severity")
            .and_then(Value::as_str)
            .unwrap_or("Unknown");
        severity_counts.record(label);
    }

    Ok(ScanReport {
        severity_counts,
        full_report,
    })
}
