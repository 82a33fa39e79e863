//! Upload collaborator: moves multipart file parts into the staging area.

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use imgpress_core::models::RawConversionConfig;
use imgpress_core::AppError;
use imgpress_services::{StagedInput, StagingArea, StorageError};

/// Multipart field carrying the images
pub const IMAGES_FIELD: &str = "images";
const QUALITY_FIELD: &str = "quality";
const FORMAT_FIELD: &str = "format";

/// Staged files plus the raw conversion fields of one upload form
#[derive(Debug, Default)]
pub struct UploadForm {
    pub inputs: Vec<StagedInput>,
    pub config: RawConversionConfig,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::BadRequest(format!("Failed to read multipart: {}", e.body_text()))
    }
}

fn storage_error(e: StorageError) -> AppError {
    match e {
        StorageError::TooLarge { max } => AppError::PayloadTooLarge(format!(
            "File size exceeds maximum allowed size of {} MB",
            max / 1024 / 1024
        )),
        StorageError::InvalidName(name) => AppError::BadRequest(format!("Invalid file name: {}", name)),
        other => AppError::Internal(format!("Failed to stage upload: {}", other)),
    }
}

/// Stream every file part of the form into its own staging file.
///
/// Parts are read chunk by chunk, so an upload never sits in memory as a
/// whole. Parts without a file name or without content (a file input left
/// empty) are skipped. On any error the files staged so far are dropped,
/// which removes them.
pub async fn stage_multipart(
    mut multipart: Multipart,
    staging: &StagingArea,
    max_files: usize,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();

        match field_name.as_str() {
            IMAGES_FIELD => {
                let Some(file_name) = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|name| !name.is_empty())
                else {
                    continue;
                };

                if form.inputs.len() >= max_files {
                    return Err(AppError::BadRequest(format!(
                        "Too many files: at most {} per upload",
                        max_files
                    )));
                }

                let mut writer = staging.begin(&file_name).await.map_err(storage_error)?;
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    writer.write_chunk(&chunk).await.map_err(storage_error)?;
                }
                let input = writer.finish().await.map_err(storage_error)?;

                if input.size_bytes() == 0 {
                    tracing::debug!(file = %file_name, "Skipping empty file part");
                    continue;
                }
                form.inputs.push(input);
            }
            QUALITY_FIELD => {
                form.config.quality = Some(field.text().await.map_err(multipart_error)?);
            }
            FORMAT_FIELD => {
                form.config.format = Some(field.text().await.map_err(multipart_error)?);
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown form field");
            }
        }
    }

    Ok(form)
}
