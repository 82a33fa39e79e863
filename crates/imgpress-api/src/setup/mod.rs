//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use imgpress_core::Config;
use imgpress_services::{
    ArchiveStreamer, BatchOrchestrator, ImageConverter, ResultsDir, StagingArea,
};
use std::sync::Arc;
use std::time::Instant;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format)
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment,
        "Configuration loaded and validated successfully"
    );

    let state = build_state(config).await?;
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}

/// Create the staging area and results directory and wire the pipeline.
pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let staging = StagingArea::new(&config.staging_dir, config.max_file_size_bytes as u64)
        .await
        .context("Failed to prepare staging area")?;

    let results = ResultsDir::new(&config.results_dir, config.public_path_prefix.clone())
        .await
        .context("Failed to prepare results directory")?;

    let converter = Arc::new(ImageConverter::new(results.clone()));
    let orchestrator = BatchOrchestrator::new(converter)
        .with_policy(config.batch_policy)
        .with_strict_format_validation(config.strict_format_validation)
        .with_max_parallel(config.max_parallel_conversions);

    tracing::info!(
        results_dir = %config.results_dir.display(),
        staging_dir = %config.staging_dir.display(),
        batch_policy = ?config.batch_policy,
        strict_format_validation = config.strict_format_validation,
        max_parallel_conversions = config.max_parallel_conversions,
        "Conversion pipeline ready"
    );

    Ok(Arc::new(AppState {
        archive: ArchiveStreamer::new(results.clone()),
        staging,
        results,
        orchestrator,
        config,
        started_at: Instant::now(),
    }))
}
