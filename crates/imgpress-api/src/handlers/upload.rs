use crate::error::{log_error, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::stage_multipart;
use crate::views;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use imgpress_core::models::ConversionConfig;
use imgpress_core::{AppError, ErrorMetadata};
use std::sync::Arc;

/// Convert an uploaded batch and render the result page.
///
/// A request that is not a multipart form carries no files and is answered
/// like an empty form.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_images(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, HttpAppError> {
    convert_upload(&state, multipart)
        .await
        .map_err(|e| HttpAppError::new(e, state.config.is_production()))
}

async fn convert_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(rejection = %rejection.body_text(), "Upload is not a multipart form");
        AppError::NoInput
    })?;

    let form = stage_multipart(multipart, &state.staging, state.config.max_files_per_batch).await?;
    let config = ConversionConfig::from_raw(&form.config);

    tracing::info!(
        files = form.inputs.len(),
        format = %config.format(),
        quality = config.quality(),
        "Upload staged"
    );

    match state.orchestrator.run(form.inputs, &config).await {
        Ok(report) => Ok(Html(views::render_success(&report)).into_response()),
        Err(e) => {
            let error = AppError::from(e);
            if let AppError::BatchFailure { .. } = error {
                log_error(&error);
                let page = views::render_error(&error.client_message());
                return Ok((StatusCode::INTERNAL_SERVER_ERROR, Html(page)).into_response());
            }
            Err(error)
        }
    }
}
