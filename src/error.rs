//! Error types for scancache
//!
//! All modules use `ScanCacheResult<T>` as their return type.

use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scancache operations
pub type ScanCacheResult<T> = Result<T, ScanCacheError>;

/// All errors that can occur in scancache
#[derive(Error, Debug)]
pub enum ScanCacheError {
    // Cache store errors
    #[error("Cache store unavailable during {op}: {reason}")]
    CacheUnavailable { op: &'static str, reason: String },

    #[error("Partial cache write for {scan_name}: {written} key(s) stored before {key} failed")]
    PartialCacheWrite {
        scan_name: String,
        key: String,
        written: usize,
        #[source]
        source: Box<ScanCacheError>,
    },

    // Scanner errors
    #[error("Scanner not found: {0}")]
    ScannerNotFound(String),

    #[error("Scan of {image} failed: {reason}")]
    ScanExecution { image: String, reason: String },

    #[error("Scan of {image} timed out after {secs}s")]
    ScanTimeout { image: String, secs: u64 },

    #[error("Unreadable scanner output for {image}: {reason}")]
    ScanOutput { image: String, reason: String },

    #[error("Vulnerability database update failed: {0}")]
    DbUpdate(String),

    // Docker errors
    #[error("Failed to list images: {0}")]
    ImageList(String),

    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<ScanCacheError>,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Server errors
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, stderr: {stderr}")]
    CommandExecution { command: String, stderr: String },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a cache store error for the named operation
    pub fn cache_unavailable(op: &'static str, reason: impl Display) -> Self {
        Self::CacheUnavailable {
            op,
            reason: reason.to_string(),
        }
    }

    /// Attach the name of the pipeline stage that raised this error
    pub fn in_stage(self, stage: &'static str) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The underlying error with any stage wrapping removed
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Whether the caller, not the service, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self.root_cause(), Self::InvalidRequest(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self.root_cause() {
            Self::ScannerNotFound(_) => {
                Some("Install grype: https://github.com/anchore/grype#installation")
            }
            Self::CacheUnavailable { .. } => {
                Some("Check that Redis is running, or start with: scancache serve --memory")
            }
            Self::Bind { .. } => Some("Pick another port with: scancache serve --port <PORT>"),
            Self::ConfigInvalid { .. } => Some("Regenerate defaults with: scancache config init --force"),
            _ => None,
        }
    }
}
