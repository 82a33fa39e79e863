//! Staging area for raw uploads

use crate::error::{StorageError, StorageResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// A client upload persisted in the staging area, awaiting conversion.
///
/// The handle owns its file: dropping it removes the file (best-effort), so a
/// staged input never outlives the request that created it, whichever way the
/// request ends.
#[derive(Debug)]
pub struct StagedInput {
    original_name: String,
    path: PathBuf,
    size_bytes: u64,
    armed: bool,
}

impl StagedInput {
    /// Take ownership of a file that is already staged at `path`.
    pub fn new(original_name: impl Into<String>, path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        Self {
            original_name: original_name.into(),
            path: path.into(),
            size_bytes,
            armed: true,
        }
    }

    /// Client-supplied file name
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Whether this handle still owns a file on disk
    pub fn is_staged(&self) -> bool {
        self.armed
    }

    /// Delete the staged file now.
    ///
    /// Failures are logged and swallowed: they never change the outcome of the
    /// conversion that consumed this input.
    pub async fn remove(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;

        match fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Staged input removed");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    item = %self.original_name,
                    "Failed to remove staged input"
                );
            }
        }
    }
}

impl Drop for StagedInput {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(
                    path = %self.path.display(),
                    item = %self.original_name,
                    "Unconverted staged input removed"
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Failed to remove staged input on drop"
                );
            }
        }
    }
}

/// Directory where uploads are persisted before conversion
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    max_file_size: u64,
}

impl StagingArea {
    /// Create the staging directory if needed.
    pub async fn new(root: impl Into<PathBuf>, max_file_size: u64) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create staging directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            root,
            max_file_size,
        })
    }

    /// Open a new staging file for an upload.
    ///
    /// The file name is `<unix-millis>-<random>`, independent of the client's
    /// name, so concurrent uploads of the same file never collide.
    pub async fn begin(&self, original_name: &str) -> StorageResult<StagingWriter> {
        let root = self.root.clone();
        let prefix = format!("{}-", chrono::Utc::now().timestamp_millis());

        let (file, path) = tokio::task::spawn_blocking(
            move || -> std::io::Result<(std::fs::File, PathBuf)> {
                tempfile::Builder::new()
                    .prefix(&prefix)
                    .tempfile_in(&root)?
                    .keep()
                    .map_err(|e| e.error)
            },
        )
        .await
        .map_err(|e| StorageError::WriteFailed(format!("Staging task failed: {}", e)))??;

        tracing::debug!(path = %path.display(), item = %original_name, "Staging upload");

        Ok(StagingWriter {
            file: fs::File::from_std(file),
            input: StagedInput::new(original_name, path, 0),
            max_file_size: self.max_file_size,
        })
    }

    /// Stage an in-memory payload in one call.
    pub async fn stage_bytes(&self, original_name: &str, data: &[u8]) -> StorageResult<StagedInput> {
        let mut writer = self.begin(original_name).await?;
        writer.write_chunk(data).await?;
        writer.finish().await
    }
}

/// In-progress staging file.
///
/// Dropping the writer before [`StagingWriter::finish`] removes the partial file.
#[derive(Debug)]
pub struct StagingWriter {
    file: fs::File,
    input: StagedInput,
    max_file_size: u64,
}

impl StagingWriter {
    /// Append a chunk, enforcing the per-file size limit.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> StorageResult<()> {
        let next_size = self.input.size_bytes + chunk.len() as u64;
        if next_size > self.max_file_size {
            return Err(StorageError::TooLarge {
                max: self.max_file_size,
            });
        }

        self.file.write_all(chunk).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to write staging file {}: {}",
                self.input.path.display(),
                e
            ))
        })?;
        self.input.size_bytes = next_size;
        Ok(())
    }

    /// Flush the file and hand over the staged input.
    pub async fn finish(self) -> StorageResult<StagedInput> {
        let StagingWriter {
            mut file, input, ..
        } = self;

        file.flush().await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to flush staging file {}: {}",
                input.path.display(),
                e
            ))
        })?;

        tracing::debug!(
            path = %input.path.display(),
            item = %input.original_name,
            size_bytes = input.size_bytes,
            "Upload staged"
        );

        Ok(input)
    }
}
