//! Imgpress Services Layer
//!
//! Coordination on top of storage and processing: the batch orchestrator that
//! drives the conversion unit over a request's inputs, and the archive
//! streamer behind the bulk download. The API crate depends on this facade
//! only; HTTP concerns stay there.

pub mod archive;
pub mod batch;

pub use archive::{ArchiveError, ArchiveStream, ArchiveStreamer};
pub use batch::{BatchError, BatchOrchestrator, BatchReport};
pub use imgpress_processing::{ConversionCause, ConversionError, Converter, ImageConverter};
pub use imgpress_storage::{ResultsDir, StagedInput, StagingArea, StorageError};
