//! Interview engine - drives the session state machine from driver commands

mod controller;

pub use controller::{create_engine_channels, InterviewEngine};

use std::path::PathBuf;

use crate::session::Screen;

/// Commands that can be sent to the interview engine
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Request camera/microphone access and bind the media stream
    RequestAccess,
    /// Confirm the preview setup and show the first question
    ConfirmSetup,
    /// Start recording the active question
    StartRecording,
    /// Stop recording and dispatch the answer upload
    StopRecording,
    /// Shutdown the engine
    Shutdown,
}

/// Status updates from the interview engine
#[derive(Debug, Clone)]
pub enum EngineStatus {
    /// The session moved to a new screen
    ScreenChanged {
        screen: Screen,
        question_index: usize,
    },
    /// Media access was denied; the session stays on Instructions
    AccessDenied { reason: String },
    /// A question is on screen, waiting for recording to start
    AwaitingAnswer {
        question_index: usize,
        prompt: String,
        audio_prompt: PathBuf,
    },
    /// Recording in progress for a question
    Recording {
        question_index: usize,
        buffered_bytes: usize,
    },
    /// An answer upload was dispatched
    UploadStarted { question_index: usize },
    /// An answer upload finished successfully
    UploadComplete { question_index: usize },
    /// An answer upload failed; the payload is discarded and the
    /// interview proceeds
    UploadFailed {
        question_index: usize,
        reason: String,
    },
    /// An error occurred
    Error(String),
}
