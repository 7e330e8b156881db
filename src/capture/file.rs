//! File-based media backend
//!
//! Streams chunks from a media file at a fixed pace, looping back to the
//! start on EOF so the stream behaves like a live source. Used for soak
//! testing and batch runs where no capture device is attached.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{CaptureError, MediaBackend, MediaChunk};

pub struct FileBackend {
    path: PathBuf,
    chunk_bytes: usize,
    chunk_interval: Duration,
    stream_task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: PathBuf, chunk_bytes: usize, chunk_interval_ms: u64) -> Self {
        Self {
            path,
            chunk_bytes,
            chunk_interval: Duration::from_millis(chunk_interval_ms),
            stream_task: None,
        }
    }
}

#[async_trait]
impl MediaBackend for FileBackend {
    async fn open(&mut self) -> Result<mpsc::Receiver<MediaChunk>, CaptureError> {
        // Access is requested exactly once per session
        if self.stream_task.is_some() {
            return Err(CaptureError::PermissionDenied(
                "media stream already open".to_string(),
            ));
        }

        // An unreadable file is this backend's equivalent of a denied
        // device: the session stays on Instructions.
        let mut file = tokio::fs::File::open(&self.path).await.map_err(|e| {
            CaptureError::PermissionDenied(format!("cannot open {:?}: {}", self.path, e))
        })?;

        let (tx, rx) = mpsc::channel(32);
        let chunk_bytes = self.chunk_bytes;
        let chunk_interval = self.chunk_interval;
        let path = self.path.clone();

        let task = tokio::spawn(async move {
            let opened_at = Instant::now();
            let mut interval = tokio::time::interval(chunk_interval);
            let mut buf = vec![0u8; chunk_bytes];

            loop {
                interval.tick().await;

                let n = match file.read(&mut buf).await {
                    Ok(0) => {
                        // Loop back to emulate a continuous live stream
                        if let Err(e) = file.seek(SeekFrom::Start(0)).await {
                            warn!("File backend seek failed on {:?}: {}", path, e);
                            break;
                        }
                        continue;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        warn!("File backend read failed on {:?}: {}", path, e);
                        break;
                    }
                };

                let chunk = MediaChunk {
                    data: buf[..n].to_vec(),
                    timestamp_ms: opened_at.elapsed().as_millis() as u64,
                };

                if tx.send(chunk).await.is_err() {
                    debug!("Chunk receiver dropped, stopping file stream");
                    break;
                }
            }
        });

        self.stream_task = Some(task);
        Ok(rx)
    }

    async fn close(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
            let _ = task.await;
            debug!("File backend stream closed");
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_streams_chunks_in_file_order() {
        let dir = std::env::temp_dir().join(format!("interview-agent-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.webm");
        std::fs::write(&path, b"abcdefgh").unwrap();

        let mut backend = FileBackend::new(path, 4, 1);
        let mut rx = backend.open().await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.data, b"abcd");
        assert_eq!(second.data, b"efgh");

        // EOF wraps around to the start of the file
        let third = rx.recv().await.unwrap();
        assert_eq!(third.data, b"abcd");

        backend.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn missing_file_is_reported_as_denied_access() {
        let mut backend = FileBackend::new(PathBuf::from("/nonexistent/answer.webm"), 4096, 50);
        match backend.open().await {
            Err(CaptureError::PermissionDenied(_)) => {}
            other => panic!("expected PermissionDenied, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn open_twice_is_rejected() {
        let dir = std::env::temp_dir().join(format!("interview-agent-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sample.webm");
        std::fs::write(&path, b"data").unwrap();

        let mut backend = FileBackend::new(path, 4, 1);
        let _rx = backend.open().await.unwrap();
        assert!(matches!(
            backend.open().await,
            Err(CaptureError::PermissionDenied(_))
        ));

        backend.close().await;
        std::fs::remove_dir_all(&dir).ok();
    }
}
