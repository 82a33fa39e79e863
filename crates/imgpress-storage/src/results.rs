//! Results directory: converted artifacts shared by every request

use crate::error::{StorageError, StorageResult};
use bytes::Bytes;
use imgpress_core::models::{has_converted_extension, public_path};
use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::fs;

type FileLock = Arc<tokio::sync::Mutex<()>>;

/// A converted artifact written to the results directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub path: PathBuf,
    /// Size read back from disk after the write completed
    pub size_bytes: u64,
    pub public_path: String,
}

/// One entry of the results directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Flat directory of converted files.
///
/// Two conversions may target the same name (`a.png` and `a.jpg` both become
/// `a.webp`). Writes to one name are serialized and each write lands through a
/// rename, so readers see either the previous file or the new one, never a
/// partial file. The last writer wins.
#[derive(Debug, Clone)]
pub struct ResultsDir {
    root: PathBuf,
    public_prefix: String,
    locks: Arc<Mutex<HashMap<String, FileLock>>>,
}

impl ResultsDir {
    /// Create the results directory if needed.
    pub async fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create results directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(Self {
            root,
            public_prefix: public_prefix.into(),
            locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a file name inside the directory, rejecting anything that is
    /// not a single path segment.
    pub fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Atomically write `data` under `name`, replacing any previous file.
    pub async fn store(&self, name: &str, data: Bytes) -> StorageResult<StoredFile> {
        let start = Instant::now();
        let target = self.path_for(name)?;

        let slot = self.acquire(name);
        let written = {
            let _guard = slot.lock.lock().await;

            let root = self.root.clone();
            let target = target.clone();
            tokio::task::spawn_blocking(move || write_atomic(&root, &target, &data))
                .await
                .map_err(|e| StorageError::WriteFailed(format!("Write task failed: {}", e)))
                .and_then(|result| result)
        };
        drop(slot);
        let size_bytes = written?;

        tracing::debug!(
            file = %name,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_millis() as u64,
            "Converted file stored"
        );

        Ok(StoredFile {
            name: name.to_string(),
            path: target,
            size_bytes,
            public_path: public_path(&self.public_prefix, name),
        })
    }

    /// List the converted files currently in the directory, sorted by name.
    ///
    /// Only regular files directly inside the directory with a converted
    /// extension are listed. A missing directory lists as empty.
    pub async fn manifest(&self) -> StorageResult<Vec<ManifestEntry>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to list {}: {}",
                    self.root.display(),
                    e
                )))
            }
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !has_converted_extension(&name) {
                continue;
            }
            entries.push(ManifestEntry {
                name,
                path: entry.path(),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn acquire<'a>(&'a self, name: &'a str) -> LockSlot<'a> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        let lock = locks.entry(name.to_string()).or_default().clone();
        LockSlot {
            table: &self.locks,
            name,
            lock,
        }
    }
}

/// A claim on one file name's write lock.
///
/// Dropping it, including when a `store` future is cancelled, prunes the
/// table entry once nobody else claims the name.
struct LockSlot<'a> {
    table: &'a Mutex<HashMap<String, FileLock>>,
    name: &'a str,
    lock: FileLock,
}

impl Drop for LockSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self.table.lock().unwrap_or_else(|p| p.into_inner());
        // Table entry plus ours: nobody else is waiting on this name
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(self.name);
        }
    }
}

fn write_atomic(root: &Path, target: &Path, data: &[u8]) -> StorageResult<u64> {
    let mut part = tempfile::Builder::new()
        .prefix(".")
        .suffix(".part")
        .tempfile_in(root)
        .map_err(|e| StorageError::WriteFailed(format!("Failed to create temp file: {}", e)))?;

    part.write_all(data)
        .map_err(|e| StorageError::WriteFailed(format!("Failed to write temp file: {}", e)))?;
    part.as_file()
        .sync_all()
        .map_err(|e| StorageError::WriteFailed(format!("Failed to sync temp file: {}", e)))?;
    part.persist(target).map_err(|e| {
        StorageError::WriteFailed(format!("Failed to move {} into place: {}", target.display(), e.error))
    })?;

    let size = std::fs::metadata(target)
        .map_err(|e| StorageError::ReadFailed(format!("Failed to stat {}: {}", target.display(), e)))?
        .len();
    Ok(size)
}
