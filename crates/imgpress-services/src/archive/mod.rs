mod service;

pub use service::{ArchiveError, ArchiveStream, ArchiveStreamer};
