//! Route handlers
//!
//! Each handler builds a fresh context, runs the route's pipeline over it and
//! renders the finished context. Errors go through [`AppError`].

use crate::docker::ImageSummary;
use crate::error::ScanCacheError;
use crate::pipeline::{ImagesContext, ScanContext};
use crate::scanner::ScanPayload;
use crate::server::error::AppError;
use crate::server::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, info_span, Instrument};

/// Body of the scan and rescan routes
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(rename = "scanName")]
    pub scan_name: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub cache: &'static str,
}

fn scan_context(body: Result<Json<ScanRequest>, JsonRejection>) -> Result<ScanContext, AppError> {
    let Json(request) = body.map_err(|e| ScanCacheError::InvalidRequest(e.body_text()))?;
    Ok(ScanContext::new(request.scan_name)?)
}

/// `GET /images`
pub async fn list_images(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ImageSummary>>, AppError> {
    let ctx = ImagesContext::new();
    let span = info_span!("images", request_id = %ctx.request_id);

    let ctx = state.pipelines.images.run(ctx).instrument(span).await?;
    Ok(Json(ctx.images))
}

/// `POST /images/scan`
pub async fn scan(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanPayload>, AppError> {
    let ctx = scan_context(body)?;
    let span = info_span!("scan", request_id = %ctx.request_id, scan_name = %ctx.scan_name);

    let ctx = state.pipelines.scan.run(ctx).instrument(span).await?;
    Ok(Json(ctx.into_payload()?))
}

/// `POST /images/rescan`
pub async fn rescan(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanPayload>, AppError> {
    let ctx = scan_context(body)?;
    let span = info_span!("rescan", request_id = %ctx.request_id, scan_name = %ctx.scan_name);

    let ctx = state.pipelines.rescan.run(ctx).instrument(span).await?;
    Ok(Json(ctx.into_payload()?))
}

/// `DELETE /images/cache/{*scan_name}`
pub async fn evict(
    State(state): State<Arc<AppState>>,
    Path(scan_name): Path<String>,
) -> Result<StatusCode, AppError> {
    let scan_name = scan_name.trim();
    if scan_name.is_empty() {
        return Err(ScanCacheError::InvalidRequest("scanName is required".to_string()).into());
    }

    let removed = state.pipelines.orchestrator.evict(scan_name).await?;
    info!(scan_name, removed, "Cache eviction requested");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.backend,
    })
}
