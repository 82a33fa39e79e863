//! Imgpress Storage Library
//!
//! Filesystem layout of the conversion pipeline:
//!
//! - **Staging area**: raw uploads, one collision-resistant file per input
//!   (`<unix-millis>-<random>`). Every staged file is owned by a
//!   [`StagedInput`] handle that removes it on drop.
//! - **Results directory**: converted artifacts named `<stem>.<format>`, shared
//!   by all requests. Writes are atomic (temp file + rename) and serialized per
//!   file name.

pub mod error;
pub mod results;
pub mod staging;

pub use error::{StorageError, StorageResult};
pub use results::{ManifestEntry, ResultsDir, StoredFile};
pub use staging::{StagedInput, StagingArea, StagingWriter};
