use bytes::Bytes;
use futures::Stream;
use imgpress_storage::{ManifestEntry, ResultsDir, StorageError};
use std::fs::File;
use std::io::{self, ErrorKind, Write};
use std::pin::Pin;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Chunks in flight between the archive writer and the response body
const CHANNEL_CAPACITY: usize = 16;

/// Maximum zlib compression level
const COMPRESSION_LEVEL: i64 = 9;

/// Byte stream of a ZIP archive. An `Err` item means the archive is truncated.
pub type ArchiveStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("no converted files to download")]
    NotFound,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Streams every converted file of the results directory as one ZIP archive.
///
/// The archive is produced while it is sent: a blocking task compresses each
/// file into a bounded channel, so memory stays flat whatever the directory
/// size and a slow client slows the writer down. Entries are flat, named after
/// the files, in name order. Entry timestamps are fixed, so the same directory
/// always yields the same bytes.
#[derive(Debug, Clone)]
pub struct ArchiveStreamer {
    results: ResultsDir,
}

impl ArchiveStreamer {
    pub fn new(results: ResultsDir) -> Self {
        Self { results }
    }

    /// Snapshot the results directory and start streaming it.
    ///
    /// Fails with [`ArchiveError::NotFound`] before producing any byte when the
    /// directory is missing or holds no converted file.
    pub async fn stream(&self) -> Result<ArchiveStream, ArchiveError> {
        let entries = self.results.manifest().await?;
        if entries.is_empty() {
            return Err(ArchiveError::NotFound);
        }

        Ok(stream_entries(entries))
    }
}

/// Compress `entries` on a blocking task and expose the output as a stream.
fn stream_entries(entries: Vec<ManifestEntry>) -> ArchiveStream {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let sink = ChannelWriter { tx: tx.clone() };

        match write_archive(&entries, sink) {
            Ok(written) => {
                tracing::info!(
                    files = written,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Archive streamed"
                );
            }
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                tracing::warn!("Archive receiver dropped, client disconnected");
            }
            Err(e) => {
                tracing::error!(error = %e, "Archive stream failed");
                // Surfaces as a broken response body
                let _ = tx.blocking_send(Err(e));
            }
        }
    });

    let body = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });

    Box::pin(body)
}

/// Write all entries into a streaming ZIP writer; returns the number of
/// entries added.
fn write_archive(entries: &[ManifestEntry], sink: ChannelWriter) -> io::Result<usize> {
    let mut zip = ZipWriter::new_stream(sink);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .unix_permissions(0o644);

    let mut written = 0;
    for entry in entries {
        let mut file = match File::open(&entry.path) {
            Ok(file) => file,
            // Replaced or removed since the listing
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(file = %entry.name, "Skipping vanished file");
                continue;
            }
            Err(e) => return Err(e),
        };

        zip.start_file(entry.name.as_str(), options)
            .map_err(io::Error::from)?;
        io::copy(&mut file, &mut zip)?;
        written += 1;
    }

    zip.finish().map_err(io::Error::from)?;
    Ok(written)
}

/// `Write` adapter feeding the response channel.
///
/// Blocks while the channel is full. Fails with `BrokenPipe` once the
/// receiving body has been dropped.
struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(ErrorKind::BrokenPipe, "archive receiver dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, TryStreamExt};
    use std::io::{Cursor, Read};
    use tempfile::tempdir;

    /// Poorly compressible bytes, so deflate emits many blocks
    fn noise(len: u32) -> Vec<u8> {
        (0..len)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect()
    }

    async fn collect(stream: ArchiveStream) -> Vec<u8> {
        stream
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path().join("uploads"), "/uploads")
            .await
            .unwrap();
        std::fs::remove_dir(dir.path().join("uploads")).unwrap();

        let result = ArchiveStreamer::new(results).stream().await;
        assert!(matches!(result, Err(ArchiveError::NotFound)));
    }

    #[tokio::test]
    async fn test_directory_without_converted_files_is_not_found() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path(), "/uploads").await.unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hello").unwrap();

        let result = ArchiveStreamer::new(results).stream().await;
        assert!(matches!(result, Err(ArchiveError::NotFound)));
    }

    #[tokio::test]
    async fn test_single_file_archive() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path(), "/uploads").await.unwrap();
        let content = b"RIFF\x10\x00\x00\x00WEBPVP8 fake payload".repeat(50);
        std::fs::write(dir.path().join("photo.webp"), &content).unwrap();

        let stream = ArchiveStreamer::new(results).stream().await.unwrap();
        let bytes = collect(stream).await;

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);

        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "photo.webp");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut extracted = Vec::new();
        entry.read_to_end(&mut extracted).unwrap();
        assert_eq!(extracted, content);
    }

    #[tokio::test]
    async fn test_archive_holds_only_converted_files() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path(), "/uploads").await.unwrap();
        std::fs::write(dir.path().join("b.jpeg"), b"jpeg").unwrap();
        std::fs::write(dir.path().join("a.avif"), b"avif").unwrap();
        std::fs::write(dir.path().join("c.webp"), b"webp").unwrap();
        std::fs::write(dir.path().join("raw.png"), b"png").unwrap();

        let stream = ArchiveStreamer::new(results).stream().await.unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(collect(stream).await)).unwrap();

        let names: Vec<_> = archive.file_names().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, ["a.avif", "b.jpeg", "c.webp"]);
        assert_eq!(names.len(), 3);
    }

    #[tokio::test]
    async fn test_unchanged_directory_yields_identical_archives() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path(), "/uploads").await.unwrap();
        std::fs::write(dir.path().join("one.webp"), vec![7u8; 4096]).unwrap();
        std::fs::write(dir.path().join("two.avif"), vec![3u8; 1024]).unwrap();

        let streamer = ArchiveStreamer::new(results);
        let first = collect(streamer.stream().await.unwrap()).await;
        let second = collect(streamer.stream().await.unwrap()).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_large_archive_streams_in_chunks() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path(), "/uploads").await.unwrap();
        let noise = noise(2_000_000);
        std::fs::write(dir.path().join("big.webp"), &noise).unwrap();

        let stream = ArchiveStreamer::new(results).stream().await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
        assert!(chunks.len() > 1);

        let bytes: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut extracted = Vec::new();
        archive
            .by_name("big.webp")
            .unwrap()
            .read_to_end(&mut extracted)
            .unwrap();
        assert_eq!(extracted, noise);
    }

    #[tokio::test]
    async fn test_dropped_receiver_stops_writer_with_broken_pipe() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path(), "/uploads").await.unwrap();
        std::fs::write(dir.path().join("big.webp"), noise(4_000_000)).unwrap();
        let entries = results.manifest().await.unwrap();

        let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);
        let writer =
            tokio::task::spawn_blocking(move || write_archive(&entries, ChannelWriter { tx }));

        let first = rx.recv().await.unwrap();
        assert!(first.is_ok());
        drop(rx);

        let err = writer.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_read_failure_after_first_bytes_ends_stream_with_error() {
        let dir = tempdir().unwrap();
        let results = ResultsDir::new(dir.path(), "/uploads").await.unwrap();
        std::fs::write(dir.path().join("a.webp"), noise(64 * 1024)).unwrap();
        std::fs::write(dir.path().join("x.webp"), b"soon a directory").unwrap();
        let entries = results.manifest().await.unwrap();
        assert_eq!(entries.len(), 2);

        // Opening a directory succeeds, reading it fails
        std::fs::remove_file(dir.path().join("x.webp")).unwrap();
        std::fs::create_dir(dir.path().join("x.webp")).unwrap();

        let items: Vec<io::Result<Bytes>> = stream_entries(entries).collect().await;

        assert!(items.len() >= 2);
        assert!(items[0].is_ok());
        let (last, before) = items.split_last().unwrap();
        assert!(last.is_err());
        assert!(before.iter().all(|item| item.is_ok()));
    }
}
