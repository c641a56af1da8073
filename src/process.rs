//! Helpers for running external CLIs (grype, docker) and capturing output

use std::io::ErrorKind;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Max number of output lines to include in error messages.
const ERROR_TAIL_LINES: usize = 20;

/// Why a captured command produced no output
#[derive(Debug)]
pub(crate) enum RunError {
    /// Executable is not on PATH
    NotFound,
    /// Deadline elapsed; the child was killed
    TimedOut(Duration),
    /// Any other spawn or wait failure
    Spawn(std::io::Error),
}

/// Run `binary args...` to completion, capturing stdout and stderr.
///
/// With a timeout the child is killed when the deadline passes.
pub(crate) async fn run_captured(
    binary: &str,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<Output, RunError> {
    debug!("Executing: {} {:?}", binary, args);

    let mut command = Command::new(binary);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let pending = command.output();
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, pending)
            .await
            .map_err(|_| RunError::TimedOut(limit))?,
        None => pending.await,
    };

    result.map_err(|e| match e.kind() {
        ErrorKind::NotFound => RunError::NotFound,
        _ => RunError::Spawn(e),
    })
}

/// Extract the useful tail of command output for error diagnostics.
///
/// Combines stdout and stderr, then returns the last `ERROR_TAIL_LINES`
/// non-empty lines.
pub(crate) fn output_tail(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|l| !l.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}
