//! Upload dispatch to the ingestion endpoint
//!
//! The dispatcher is a capability seam: the engine talks to an `UploadSink`
//! and never sees HTTP. The default (and only shipped) policy is a single
//! attempt with no retry or queueing - a failed upload is surfaced and the
//! payload is discarded, and the interview proceeds regardless.

mod http;

pub use http::HttpUploader;

use async_trait::async_trait;
use thiserror::Error;

/// Upload failure taxonomy. No transient/permanent distinction is made;
/// every failure is terminal for that question's payload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("ingestion endpoint not configured")]
    NotConfigured,

    /// The endpoint answered outside 2xx
    #[error("ingestion endpoint returned HTTP {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Destination for finalized answer payloads.
///
/// `send` borrows the payload to build the request; ownership (and the
/// decision to discard) stays with the caller.
#[async_trait]
pub trait UploadSink: Send + Sync {
    /// Dispatch one answer payload, tagged with its question index
    async fn send(&self, question_index: usize, payload: &[u8]) -> Result<(), UploadError>;

    /// Whether a destination is configured at all
    fn is_configured(&self) -> bool {
        true
    }
}
