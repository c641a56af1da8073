//! Serve command - wire the store, scanner and catalog into the HTTP server

use crate::cache::create_store;
use crate::cli::args::ServeArgs;
use crate::config::{CacheBackend, Config};
use crate::docker::DockerCli;
use crate::error::ScanCacheResult;
use crate::pipeline::{PipelineOptions, Pipelines};
use crate::scanner::{GrypeScanner, ScannerInvoker};
use crate::server::{self, AppState};
use std::sync::Arc;
use tracing::info;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> ScanCacheResult<()> {
    let config = apply_overrides(config.clone(), args);

    let store = create_store(&config.cache).await?;
    let backend = store.backend_name();

    let scanner = GrypeScanner::new(config.scanner.grype_bin.clone())
        .with_timeout(config.scanner.timeout());
    let catalog = DockerCli::new(config.scanner.docker_bin.clone());

    let options = PipelineOptions {
        dedupe_concurrent_scans: config.scanner.dedupe_concurrent_scans,
        db_status_ttl: config.cache.db_status_ttl(),
    };
    let pipelines = Pipelines::build(
        store,
        ScannerInvoker::new(Arc::new(scanner)),
        Arc::new(catalog),
        &options,
    );

    info!(
        cache = backend,
        dedupe = options.dedupe_concurrent_scans,
        "Starting scancache server"
    );

    server::serve(&config.server, Arc::new(AppState::new(pipelines, backend))).await
}

/// Layer command-line flags over file configuration
fn apply_overrides(mut config: Config, args: ServeArgs) -> Config {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(url) = args.redis_url {
        config.cache.redis_url = url;
    }
    if args.memory {
        config.cache.backend = CacheBackend::Memory;
    }
    if args.no_dedupe {
        config.scanner.dedupe_concurrent_scans = false;
    }
    config
}
