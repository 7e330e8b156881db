//! Media capture module
//!
//! Provides the stream acquisition seam (the permission gate) and the
//! per-question capture recorder. Backends deliver raw media chunks over a
//! channel; the engine owns the receiving end for the lifetime of a session.

mod backend;
mod file;
mod permissions;
mod recorder;

pub use backend::{create_media_backend, MediaBackend, MediaChunk};
pub use file::FileBackend;
pub use permissions::describe_missing_permissions;
pub use recorder::{CaptureRecorder, RecorderState};

use thiserror::Error;

/// Capture failure taxonomy
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Access to the capture source was denied or the source is unavailable.
    /// Halts progression; the operator must retry manually.
    #[error("media access denied: {0}")]
    PermissionDenied(String),

    /// A recorder operation was called in the wrong state. Programming
    /// error - the caller's screen guards must prevent this, not retry it.
    #[error("recorder is {state:?}, cannot {op}")]
    InvalidState { state: RecorderState, op: &'static str },
}
