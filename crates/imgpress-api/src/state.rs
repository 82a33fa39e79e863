//! Application state shared by every handler.

use imgpress_core::Config;
use imgpress_services::{ArchiveStreamer, BatchOrchestrator, ResultsDir, StagingArea};
use std::time::Instant;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Where the upload collaborator stages raw files
    pub staging: StagingArea,
    pub results: ResultsDir,
    pub orchestrator: BatchOrchestrator,
    pub archive: ArchiveStreamer,
    /// Process start, for the health endpoint's uptime
    pub started_at: Instant,
}
