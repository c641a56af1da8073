//! HTTP surface
//!
//! | Method | Path | Pipeline |
//! |--------|------|----------|
//! | GET | `/images` | images |
//! | POST | `/images/scan` | scan |
//! | POST | `/images/rescan` | rescan |
//! | DELETE | `/images/cache/{*scanName}` | eviction |
//! | GET | `/health` | none |

pub mod error;
pub mod handlers;

pub use error::AppError;

use crate::config::schema::ServerConfig;
use crate::error::{ScanCacheError, ScanCacheResult};
use crate::pipeline::Pipelines;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Shared state for all handlers
pub struct AppState {
    pub pipelines: Pipelines,

    /// Cache backend name reported by `/health`
    pub backend: &'static str,
}

impl AppState {
    pub fn new(pipelines: Pipelines, backend: &'static str) -> Self {
        Self { pipelines, backend }
    }
}

/// Build the router over `state`
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/images", get(handlers::list_images))
        .route("/images/scan", post(handlers::scan))
        .route("/images/rescan", post(handlers::rescan))
        .route("/images/cache/{*scan_name}", delete(handlers::evict))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve until Ctrl+C
pub async fn serve(config: &ServerConfig, state: Arc<AppState>) -> ScanCacheResult<()> {
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ScanCacheError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("Listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ScanCacheError::io("serving HTTP", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down gracefully"),
        Err(e) => {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
