//! Mapping of pipeline errors to HTTP responses

use crate::error::ScanCacheError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{error, warn};

const INTERNAL_MESSAGE: &str = "internal server error";

/// Error returned from handlers.
///
/// Client errors echo their message with a 400. Everything else is logged in
/// full and answered with a generic 500.
#[derive(Debug)]
pub struct AppError(pub ScanCacheError);

impl From<ScanCacheError> for AppError {
    fn from(err: ScanCacheError) -> Self {
        Self(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::BAD_REQUEST {
            warn!(error = %self.0, "Rejected request");
            self.0.root_cause().to_string()
        } else {
            error!(error = %self.0, cause = %self.0.root_cause(), "Request failed");
            INTERNAL_MESSAGE.to_string()
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_bad_request() {
        let err = AppError(
            ScanCacheError::InvalidRequest("scanName is required".to_string())
                .in_stage("cache-lookup"),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_errors_are_internal() {
        let err = AppError(ScanCacheError::cache_unavailable("get", "connection refused"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
