//! Media capture backend trait

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{CaptureError, FileBackend};
use crate::config::{CaptureSource, Config};

/// A slice of recorded media as delivered by the backend
#[derive(Debug, Clone)]
pub struct MediaChunk {
    /// Raw encoded bytes, opaque to the agent
    pub data: Vec<u8>,
    /// Milliseconds since the stream was opened
    pub timestamp_ms: u64,
}

/// Trait for media capture backends
///
/// `open` is the permission gate: it requests access to the underlying
/// source exactly once per session and, on success, starts streaming chunks
/// to the returned channel. Denial or device unavailability surfaces as
/// `CaptureError::PermissionDenied`.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Request access and begin streaming chunks
    async fn open(&mut self) -> Result<mpsc::Receiver<MediaChunk>, CaptureError>;

    /// Stop streaming and release the source
    async fn close(&mut self);

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Create the media backend selected by configuration
pub fn create_media_backend(config: &Config) -> Result<Box<dyn MediaBackend>> {
    match config.capture.source {
        CaptureSource::File => {
            let path = config.capture.media_file.clone().ok_or_else(|| {
                anyhow::anyhow!("capture.media_file must be set when capture.source is \"file\"")
            })?;

            tracing::info!("Using file backend for media capture: {:?}", path);
            Ok(Box::new(FileBackend::new(
                path,
                config.capture.chunk_bytes,
                config.capture.chunk_interval_ms,
            )))
        }
    }
}
