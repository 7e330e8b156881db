//! Per-question capture recorder
//!
//! Accumulates media chunks for the question currently being answered and
//! finalizes them into a single payload on stop. The buffer never spans two
//! questions: stop always leaves it empty, whatever happens to the upload.

use tracing::{debug, warn};

use super::{CaptureError, MediaChunk};

/// Soft cap before warning about unbounded buffer growth. Accumulation has
/// no hard limit; long answers on a high-bitrate stream can grow past this.
const BUFFER_WARN_BYTES: usize = 256 * 1024 * 1024;

/// Recorder lifecycle: Idle -> Recording -> Stopped, then reset back to
/// Idle for the next question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
    Stopped,
}

/// Buffer for collecting media chunks during capture
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<MediaChunk>,
    total_bytes: usize,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk to the buffer
    pub fn push(&mut self, chunk: MediaChunk) {
        self.total_bytes += chunk.data.len();
        self.chunks.push(chunk);
    }

    /// Get the number of chunks in the buffer
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total payload size accumulated so far
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Clear the buffer
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_bytes = 0;
    }

    /// Drain all chunks from the buffer
    pub fn drain(&mut self) -> Vec<MediaChunk> {
        self.total_bytes = 0;
        std::mem::take(&mut self.chunks)
    }
}

/// Records one answer at a time from a bound media stream.
///
/// State misuse (start while recording, stop while idle) is a caller bug and
/// returns `CaptureError::InvalidState`; the engine's screen guards keep
/// these paths unreachable in normal operation.
#[derive(Debug, Default)]
pub struct CaptureRecorder {
    state: RecorderState,
    buffer: ChunkBuffer,
    warned_buffer_growth: bool,
}

impl CaptureRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Number of bytes buffered for the active answer
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.total_bytes()
    }

    /// True when no chunks are buffered
    pub fn buffer_is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Begin accumulating chunks. Valid only from Idle; the caller must have
    /// a live stream bound before starting.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != RecorderState::Idle {
            return Err(CaptureError::InvalidState {
                state: self.state,
                op: "start",
            });
        }

        self.buffer.clear();
        self.warned_buffer_growth = false;
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Buffer a chunk from the live stream. Valid only while Recording.
    pub fn push(&mut self, chunk: MediaChunk) -> Result<(), CaptureError> {
        if self.state != RecorderState::Recording {
            return Err(CaptureError::InvalidState {
                state: self.state,
                op: "push",
            });
        }

        self.buffer.push(chunk);

        if self.buffer.total_bytes() > BUFFER_WARN_BYTES && !self.warned_buffer_growth {
            warn!(
                "Capture buffer exceeds {} MB and keeps growing",
                BUFFER_WARN_BYTES / (1024 * 1024)
            );
            self.warned_buffer_growth = true;
        }

        Ok(())
    }

    /// Finalize the buffered chunks into a single payload, concatenated in
    /// arrival order. Valid only from Recording; leaves the buffer empty.
    pub fn stop(&mut self) -> Result<Vec<u8>, CaptureError> {
        if self.state != RecorderState::Recording {
            return Err(CaptureError::InvalidState {
                state: self.state,
                op: "stop",
            });
        }

        let chunks = self.buffer.drain();
        let payload: Vec<u8> = chunks.into_iter().flat_map(|c| c.data).collect();

        debug!("Recorder stopped with {} byte payload", payload.len());
        self.state = RecorderState::Stopped;
        Ok(payload)
    }

    /// Return to Idle so the next question can be recorded
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.state = RecorderState::Idle;
    }
}
