//! Conversion unit: one staged input in, one converted artifact out

use crate::compression::ImageCompressor;
use async_trait::async_trait;
use bytes::Bytes;
use imgpress_core::models::{
    compression_ratio_percent, converted_file_name, ConversionConfig, ConversionOutcome,
    RequestedFormat,
};
use imgpress_storage::{ResultsDir, StagedInput, StorageError};
use std::time::Instant;
use thiserror::Error;

/// Why a single item could not be converted
#[derive(Debug, Error)]
pub enum ConversionCause {
    #[error("failed to read staged input: {0}")]
    Read(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("failed to write converted file: {0}")]
    Write(#[source] StorageError),

    #[error("unsupported target format: {0}")]
    UnsupportedFormat(String),
}

/// A failed conversion, tagged with the item it concerns
#[derive(Debug, Error)]
#[error("{item}: {cause}")]
pub struct ConversionError {
    pub item: String,
    #[source]
    pub cause: ConversionCause,
}

impl ConversionError {
    pub fn new(item: impl Into<String>, cause: ConversionCause) -> Self {
        Self {
            item: item.into(),
            cause,
        }
    }
}

/// Converts one staged input according to a batch configuration.
///
/// On success the staged file has been removed and the converted artifact is
/// durably present in the results directory. On failure nothing is written;
/// the staged file is left to its handle.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(
        &self,
        input: &mut StagedInput,
        config: &ConversionConfig,
    ) -> Result<ConversionOutcome, ConversionError>;
}

/// Converter backed by the image codecs and a results directory
#[derive(Debug, Clone)]
pub struct ImageConverter {
    results: ResultsDir,
}

impl ImageConverter {
    pub fn new(results: ResultsDir) -> Self {
        Self { results }
    }
}

#[async_trait]
impl Converter for ImageConverter {
    async fn convert(
        &self,
        input: &mut StagedInput,
        config: &ConversionConfig,
    ) -> Result<ConversionOutcome, ConversionError> {
        let start = Instant::now();
        let item = input.original_name().to_string();
        let fail = |cause| ConversionError::new(item.clone(), cause);

        let format = match config.format() {
            RequestedFormat::Supported(format) => *format,
            RequestedFormat::Unsupported(name) => {
                return Err(fail(ConversionCause::UnsupportedFormat(name.clone())));
            }
        };
        let quality = config.quality();

        let raw = tokio::fs::read(input.path())
            .await
            .map_err(|e| fail(ConversionCause::Read(e.to_string())))?;
        let original_size = raw.len() as u64;

        let encoded: Bytes = tokio::task::spawn_blocking(move || {
            let img = ImageCompressor::decode(&raw)
                .map_err(|e| ConversionCause::Decode(format!("{:#}", e)))?;
            ImageCompressor::encode(&img, format, quality)
                .map_err(|e| ConversionCause::Encode(format!("{:#}", e)))
        })
        .await
        .map_err(|e| fail(ConversionCause::Encode(format!("Codec task failed: {}", e))))?
        .map_err(fail)?;

        let converted_name = converted_file_name(&item, format.extension());
        let stored = self
            .results
            .store(&converted_name, encoded)
            .await
            .map_err(|e| fail(ConversionCause::Write(e)))?;

        input.remove().await;

        let ratio = compression_ratio_percent(original_size, stored.size_bytes);

        tracing::info!(
            item = %item,
            converted = %stored.name,
            format = %format,
            quality = quality,
            original_bytes = original_size,
            converted_bytes = stored.size_bytes,
            ratio_percent = ratio,
            duration_ms = start.elapsed().as_millis() as u64,
            "Image converted"
        );

        Ok(ConversionOutcome {
            original_name: item,
            converted_name: stored.name,
            original_size_bytes: original_size,
            converted_size_bytes: stored.size_bytes,
            compression_ratio_percent: ratio,
            public_path: stored.public_path,
        })
    }
}
