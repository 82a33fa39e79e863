mod service;

pub use service::{BatchError, BatchOrchestrator, BatchReport};
