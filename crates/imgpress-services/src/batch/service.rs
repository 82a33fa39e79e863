use futures::stream::{self, StreamExt};
use imgpress_core::models::{ConversionConfig, ConversionOutcome, RequestedFormat};
use imgpress_core::{AppError, BatchPolicy};
use imgpress_processing::{ConversionError, Converter};
use imgpress_storage::StagedInput;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Outcomes of a batch, in submission order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ConversionOutcome>,
    /// Items that failed; always empty under [`BatchPolicy::AllOrNothing`]
    pub failures: Vec<ConversionError>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("no input files were provided")]
    NoInput,

    #[error("unsupported target format: {0}")]
    UnsupportedFormat(String),

    #[error("batch aborted at {0}")]
    Conversion(#[from] ConversionError),

    #[error("all {} items failed", .0.len())]
    AllFailed(Vec<ConversionError>),
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::NoInput => AppError::NoInput,
            BatchError::UnsupportedFormat(name) => AppError::UnsupportedFormat(name),
            BatchError::Conversion(e) => AppError::BatchFailure {
                item: e.item,
                message: e.cause.to_string(),
            },
            BatchError::AllFailed(failures) => {
                let summary = failures
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                AppError::BatchFailure {
                    item: failures
                        .first()
                        .map(|e| e.item.clone())
                        .unwrap_or_default(),
                    message: summary,
                }
            }
        }
    }
}

/// Drives the conversion unit over the inputs of one request.
///
/// Outcomes are reported in submission order regardless of how many
/// conversions run at once. The orchestrator owns the staged inputs for the
/// duration of the batch: whatever was not consumed by a successful
/// conversion is removed when the batch returns.
#[derive(Clone)]
pub struct BatchOrchestrator {
    converter: Arc<dyn Converter>,
    policy: BatchPolicy,
    strict_format_validation: bool,
    max_parallel: usize,
}

impl BatchOrchestrator {
    pub fn new(converter: Arc<dyn Converter>) -> Self {
        Self {
            converter,
            policy: BatchPolicy::default(),
            strict_format_validation: true,
            max_parallel: 1,
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_strict_format_validation(mut self, strict: bool) -> Self {
        self.strict_format_validation = strict;
        self
    }

    /// Number of conversions allowed in flight (at least 1)
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel.max(1);
        self
    }

    #[tracing::instrument(
        skip(self, inputs, config),
        fields(
            batch.items = inputs.len(),
            batch.format = %config.format(),
            batch.quality = config.quality(),
        )
    )]
    pub async fn run(
        &self,
        mut inputs: Vec<StagedInput>,
        config: &ConversionConfig,
    ) -> Result<BatchReport, BatchError> {
        if inputs.is_empty() {
            return Err(BatchError::NoInput);
        }

        if self.strict_format_validation {
            if let RequestedFormat::Unsupported(name) = config.format() {
                tracing::debug!(format = %name, "Rejecting batch with unsupported format");
                return Err(BatchError::UnsupportedFormat(name.clone()));
            }
        }

        let start = Instant::now();
        let total = inputs.len();
        let converter = self.converter.as_ref();

        let mut report = BatchReport {
            outcomes: Vec::with_capacity(total),
            failures: Vec::new(),
        };

        let mut results = stream::iter(inputs.iter_mut())
            .map(|input| converter.convert(input, config))
            .buffered(self.max_parallel)
            .boxed();

        while let Some(result) = results.next().await {
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => match self.policy {
                    BatchPolicy::AllOrNothing => {
                        tracing::warn!(
                            item = %e.item,
                            error = %e.cause,
                            converted = report.outcomes.len(),
                            total = total,
                            "Batch aborted"
                        );
                        return Err(BatchError::Conversion(e));
                    }
                    BatchPolicy::PartialSuccess => {
                        tracing::warn!(
                            item = %e.item,
                            error = %e.cause,
                            "Item failed, continuing batch"
                        );
                        report.failures.push(e);
                    }
                },
            }
        }
        drop(results);

        if report.outcomes.is_empty() {
            return Err(BatchError::AllFailed(report.failures));
        }

        tracing::info!(
            converted = report.outcomes.len(),
            failed = report.failures.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch completed"
        );

        Ok(report)
    }
}
