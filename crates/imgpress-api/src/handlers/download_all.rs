use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::Response,
};
use imgpress_core::AppError;
use imgpress_services::ArchiveError;
use std::sync::Arc;

/// Stream every converted file as one ZIP attachment.
#[tracing::instrument(skip(state))]
pub async fn download_all(State(state): State<Arc<AppState>>) -> Result<Response, HttpAppError> {
    archive_response(&state)
        .await
        .map_err(|e| HttpAppError::new(e, state.config.is_production()))
}

async fn archive_response(state: &AppState) -> Result<Response, AppError> {
    let stream = state.archive.stream().await.map_err(|e| match e {
        ArchiveError::NotFound => AppError::NotFound("No files to download".to_string()),
        ArchiveError::Storage(e) => AppError::Internal(format!("Failed to list results: {}", e)),
    })?;

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", state.config.archive_filename),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(format!("Failed to build archive response: {}", e)))
}
