//! Configuration schema for scancache
//!
//! Configuration is stored at `~/.config/scancache/config.toml`

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// HTTP listener settings
    pub server: ServerConfig,

    /// Cache store settings
    pub cache: CacheConfig,

    /// Scanner and Docker CLI settings
    pub scanner: ScannerConfig,
}

/// Longest accepted freshness flag lifetime (one year)
pub const MAX_DB_STATUS_TTL_SECS: u64 = 60 * 60 * 24 * 365;

impl Config {
    /// Check values the type system cannot, returning a reason for the
    /// first problem found
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        if !(1..=MAX_DB_STATUS_TTL_SECS).contains(&self.cache.db_status_ttl_secs) {
            return Err(format!(
                "cache.db_status_ttl_secs must be between 1 and {}, got {}",
                MAX_DB_STATUS_TTL_SECS, self.cache.db_status_ttl_secs
            ));
        }
        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.trim().is_empty() {
            return Err("cache.redis_url is required when cache.backend = \"redis\"".to_string());
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to bind
    pub port: u16,
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Which key-value store backs the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Redis,
    Memory,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Store backend
    pub backend: CacheBackend,

    /// Redis connection URL (used when backend = "redis")
    pub redis_url: String,

    /// Lifetime of the "vulnerability database is fresh" flag
    pub db_status_ttl_secs: u64,
}

impl CacheConfig {
    pub fn db_status_ttl(&self) -> Duration {
        Duration::from_secs(self.db_status_ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            db_status_ttl_secs: 60 * 60 * 24,
        }
    }
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// grype executable
    pub grype_bin: String,

    /// docker executable
    pub docker_bin: String,

    /// Kill a scan or database update after N seconds (0 = wait indefinitely)
    pub timeout_secs: u64,

    /// Serialize concurrent scans of the same image so only one runs
    pub dedupe_concurrent_scans: bool,
}

impl ScannerConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            grype_bin: "grype".to_string(),
            docker_bin: "docker".to_string(),
            timeout_secs: 0,
            dedupe_concurrent_scans: true,
        }
    }
}
