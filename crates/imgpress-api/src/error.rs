//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>` and wrap domain
//! errors with [`HttpAppError::new`], passing whether the deployment hides
//! error details. Every failure renders with the same status mapping, JSON
//! body and log level.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgpress_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    /// Build the client body for an error, hiding details when asked to.
    pub fn from_app_error(error: &AppError, hide_details: bool) -> Self {
        let hide = hide_details || error.is_sensitive();
        Self {
            error: error.client_message(),
            details: (!hide).then(|| error.detailed_message()),
            error_type: (!hide).then(|| error.error_type().to_string()),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// (`AppError` lives in imgpress-core, `IntoResponse` in axum).
#[derive(Debug)]
pub struct HttpAppError {
    pub error: AppError,
    /// Strip details and error type from the body (production deployments)
    pub hide_details: bool,
}

impl HttpAppError {
    pub fn new(error: AppError, hide_details: bool) -> Self {
        Self {
            error,
            hide_details,
        }
    }
}

pub(crate) fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(
                error = %error,
                details = %error.detailed_message(),
                error_type = error_type,
                "Error occurred"
            );
        }
    }
}

pub(crate) fn status_of(error: &AppError) -> StatusCode {
    StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.error;

        log_error(app_error);

        let body = ErrorResponse::from_app_error(app_error, self.hide_details);
        (status_of(app_error), Json(body)).into_response()
    }
}
