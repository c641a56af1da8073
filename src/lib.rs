//! scancache - vulnerability scan cache for local container images
//!
//! Lists local images, scans them with grype and caches each result in
//! Redis, serving everything over a small HTTP API.

pub mod cache;
pub mod cli;
pub mod config;
pub mod docker;
pub mod error;
pub mod pipeline;
pub(crate) mod process;
pub mod scanner;
pub mod server;

pub use error::{ScanCacheError, ScanCacheResult};
