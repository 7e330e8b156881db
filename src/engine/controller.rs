//! Interview engine loop
//!
//! Integrates the permission gate, question sequencer, capture recorder and
//! upload dispatcher behind a single command-driven loop. One logical thread:
//! driver commands, media chunks and the completion timer interleave through
//! `select!`, so only one recorder session can ever be active at a time.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::capture::{CaptureRecorder, MediaBackend, MediaChunk};
use crate::config::Config;
use crate::session::{Advance, Question, QuestionSet, Screen, Session, SessionEvent};
use crate::upload::UploadSink;

use super::{EngineCommand, EngineStatus};

/// The interview engine owns the session value and every capture resource
pub struct InterviewEngine {
    /// Explicit session value, advanced only through pure transitions
    session: Session,
    /// Fixed question list with its cursor
    questions: QuestionSet,
    /// Media backend (permission gate + chunk stream)
    backend: Box<dyn MediaBackend>,
    /// Per-question capture recorder
    recorder: CaptureRecorder,
    /// Upload dispatcher
    uploader: Arc<dyn UploadSink>,
    /// Command receiver
    cmd_rx: mpsc::Receiver<EngineCommand>,
    /// Status broadcaster
    status_tx: broadcast::Sender<EngineStatus>,
    /// Delay between the last answer and the Completed screen
    processing_delay: Duration,
    /// Identifier for this interview pass
    session_id: String,
    /// When the engine was created
    started_at: chrono::DateTime<chrono::Utc>,
}

impl InterviewEngine {
    /// Create a new interview engine
    pub fn new(
        config: &Config,
        backend: Box<dyn MediaBackend>,
        uploader: Arc<dyn UploadSink>,
        cmd_rx: mpsc::Receiver<EngineCommand>,
        status_tx: broadcast::Sender<EngineStatus>,
    ) -> Result<Self> {
        let questions = QuestionSet::from_config(config)?;

        Ok(Self {
            session: Session::new(questions.len()),
            questions,
            backend,
            recorder: CaptureRecorder::new(),
            uploader,
            cmd_rx,
            status_tx,
            processing_delay: Duration::from_secs(config.interview.processing_delay_secs),
            session_id: uuid::Uuid::new_v4().to_string(),
            started_at: chrono::Utc::now(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn recorder(&self) -> &CaptureRecorder {
        &self.recorder
    }

    /// Run the engine main loop
    pub async fn run(&mut self) -> Result<()> {
        info!(
            "Interview engine starting: session={}, questions={}, backend={}",
            self.session_id,
            self.questions.len(),
            self.backend.name()
        );
        debug!("Session created at {}", self.started_at.to_rfc3339());

        // The live media stream, bound once per session when access is
        // granted
        let mut media_rx: Option<mpsc::Receiver<MediaChunk>> = None;

        // Armed when the last answer is stopped; fires the
        // Processing -> Completed transition after the fixed delay
        let mut completion_timer: Option<tokio::time::Interval> = None;

        self.broadcast_screen();

        loop {
            tokio::select! {
                // Handle driver commands
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => {
                            let shutdown = self
                                .handle_command(cmd, &mut media_rx, &mut completion_timer)
                                .await?;
                            if shutdown {
                                break;
                            }
                        }
                        None => {
                            info!("Command channel closed, shutting down");
                            break;
                        }
                    }
                }

                // Drain the live media stream
                chunk = async {
                    match media_rx.as_mut() {
                        Some(rx) => rx.recv().await,
                        None => std::future::pending().await,
                    }
                } => {
                    match chunk {
                        Some(chunk) => self.ingest_chunk(chunk),
                        None => {
                            warn!("Media stream closed by backend");
                            media_rx = None;
                            if self.recorder.is_recording() {
                                let _ = self.status_tx.send(EngineStatus::Error(
                                    "media stream closed while recording".to_string(),
                                ));
                            }
                        }
                    }
                }

                // Fixed delay from Processing to Completed
                _ = async {
                    match completion_timer.as_mut() {
                        Some(timer) => { timer.tick().await; }
                        None => std::future::pending().await,
                    }
                } => {
                    completion_timer = None;
                    self.finish_processing()?;
                }
            }
        }

        info!("Interview engine stopped");
        Ok(())
    }

    /// Apply one driver command. Returns true when the engine should stop.
    pub(crate) async fn handle_command(
        &mut self,
        cmd: EngineCommand,
        media_rx: &mut Option<mpsc::Receiver<MediaChunk>>,
        completion_timer: &mut Option<tokio::time::Interval>,
    ) -> Result<bool> {
        match cmd {
            EngineCommand::RequestAccess => {
                if self.session.screen() != Screen::Instructions {
                    warn!("Access already requested, ignoring");
                    return Ok(false);
                }

                // Access is requested exactly once per session; on denial
                // the operator must issue the command again manually.
                match self.backend.open().await {
                    Ok(rx) => {
                        *media_rx = Some(rx);
                        self.session = self.session.apply(SessionEvent::PermissionGranted)?;
                        info!("Media access granted, stream bound");
                        self.broadcast_screen();
                    }
                    Err(e) => {
                        error!("Could not access the capture source: {}", e);
                        self.session = self.session.apply(SessionEvent::PermissionDenied)?;
                        let _ = self.status_tx.send(EngineStatus::AccessDenied {
                            reason: e.to_string(),
                        });
                    }
                }
            }

            EngineCommand::ConfirmSetup => {
                if self.session.screen() != Screen::Preview {
                    warn!("Setup not in preview, ignoring confirm");
                    return Ok(false);
                }

                self.session = self.session.apply(SessionEvent::SetupConfirmed)?;
                self.broadcast_screen();
                self.broadcast_question();
            }

            EngineCommand::StartRecording => {
                // Screen guard: this is what makes recorder misuse
                // unreachable rather than retried.
                if self.session.screen() != Screen::Questions || media_rx.is_none() {
                    warn!("Not on a question with a live stream, ignoring start");
                    return Ok(false);
                }

                self.recorder.start()?;
                self.session = self.session.apply(SessionEvent::RecordingStarted)?;
                info!(
                    "Recording answer for question {}",
                    self.session.question_index()
                );
                self.broadcast_screen();
            }

            EngineCommand::StopRecording => {
                if self.session.screen() != Screen::Recording {
                    warn!("Not recording, ignoring stop");
                    return Ok(false);
                }

                let payload = self.recorder.stop()?;
                let question_index = self.session.question_index();
                info!(
                    "Stopped recording question {} ({} bytes buffered)",
                    question_index,
                    payload.len()
                );

                // Fire-and-forget: the upload is spawned, never awaited by
                // the advance path, and its payload is discarded either way.
                self.dispatch_upload(question_index, payload);
                self.recorder.reset();

                let next_question = match self.questions.advance() {
                    Advance::Next(q) => Some(q.clone()),
                    Advance::Exhausted => None,
                };

                self.session = self.session.apply(SessionEvent::RecordingStopped)?;
                self.broadcast_screen();

                match next_question {
                    Some(_) => self.broadcast_question(),
                    None => {
                        info!(
                            "All questions answered, processing for {:?}",
                            self.processing_delay
                        );
                        *completion_timer = Some(tokio::time::interval_at(
                            Instant::now() + self.processing_delay,
                            self.processing_delay,
                        ));
                    }
                }
            }

            EngineCommand::Shutdown => {
                info!("Shutdown command received");
                if self.recorder.is_recording() {
                    warn!(
                        "Discarding partial recording for question {}",
                        self.session.question_index()
                    );
                    let _ = self.recorder.stop();
                }
                self.backend.close().await;
                *media_rx = None;
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Buffer a chunk from the live stream. Chunks arriving outside a
    /// recording (the preview screen, between questions) are dropped.
    pub(crate) fn ingest_chunk(&mut self, chunk: MediaChunk) {
        if !self.recorder.is_recording() {
            return;
        }

        if let Err(e) = self.recorder.push(chunk) {
            error!("Failed to buffer media chunk: {}", e);
            return;
        }

        let _ = self.status_tx.send(EngineStatus::Recording {
            question_index: self.session.question_index(),
            buffered_bytes: self.recorder.buffered_bytes(),
        });
    }

    /// The Processing -> Completed transition, driven by the fixed delay
    pub(crate) fn finish_processing(&mut self) -> Result<()> {
        self.session = self.session.apply(SessionEvent::ProcessingFinished)?;
        info!("Interview completed: session={}", self.session_id);
        self.broadcast_screen();
        Ok(())
    }

    /// Spawn the upload for one finalized answer payload
    fn dispatch_upload(&self, question_index: usize, payload: Vec<u8>) {
        if !self.uploader.is_configured() {
            warn!(
                "Ingestion endpoint not configured, discarding {} byte answer for question {}",
                payload.len(),
                question_index
            );
            return;
        }

        let uploader = Arc::clone(&self.uploader);
        let status_tx = self.status_tx.clone();
        let _ = status_tx.send(EngineStatus::UploadStarted { question_index });

        tokio::spawn(async move {
            match uploader.send(question_index, &payload).await {
                Ok(()) => {
                    let _ = status_tx.send(EngineStatus::UploadComplete { question_index });
                }
                Err(e) => {
                    error!(
                        "Failed to upload answer for question {}: {}",
                        question_index, e
                    );
                    let _ = status_tx.send(EngineStatus::UploadFailed {
                        question_index,
                        reason: e.to_string(),
                    });
                }
            }
            // payload dropped here - discarded regardless of outcome
        });
    }

    fn broadcast_screen(&self) {
        let _ = self.status_tx.send(EngineStatus::ScreenChanged {
            screen: self.session.screen(),
            question_index: self.session.question_index(),
        });
    }

    fn broadcast_question(&self) {
        let question: &Question = self.questions.current();
        let _ = self.status_tx.send(EngineStatus::AwaitingAnswer {
            question_index: question.index,
            prompt: question.prompt.clone(),
            audio_prompt: question.audio_prompt.clone(),
        });
    }
}

/// Create command and status channels for the engine
pub fn create_engine_channels() -> (
    mpsc::Sender<EngineCommand>,
    mpsc::Receiver<EngineCommand>,
    broadcast::Sender<EngineStatus>,
    broadcast::Receiver<EngineStatus>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (status_tx, status_rx) = broadcast::channel(64);
    (cmd_tx, cmd_rx, status_tx, status_rx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureError;
    use crate::upload::UploadError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Backend that either denies access or hands out a prepared channel
    struct MockBackend {
        rx: Option<mpsc::Receiver<MediaChunk>>,
        deny: bool,
    }

    #[async_trait]
    impl MediaBackend for MockBackend {
        async fn open(&mut self) -> Result<mpsc::Receiver<MediaChunk>, CaptureError> {
            if self.deny {
                return Err(CaptureError::PermissionDenied("denied by test".into()));
            }
            Ok(self.rx.take().expect("open called twice"))
        }

        async fn close(&mut self) {}

        fn name(&self) -> &str {
            "mock"
        }
    }

    /// Sink that records every payload and signals each completed attempt
    struct MockSink {
        fail: bool,
        sent: Mutex<Vec<(usize, Vec<u8>)>>,
        done_tx: mpsc::UnboundedSender<usize>,
    }

    #[async_trait]
    impl UploadSink for MockSink {
        async fn send(&self, question_index: usize, payload: &[u8]) -> Result<(), UploadError> {
            self.sent
                .lock()
                .unwrap()
                .push((question_index, payload.to_vec()));
            let _ = self.done_tx.send(question_index);
            if self.fail {
                return Err(UploadError::Status { status: 500 });
            }
            Ok(())
        }
    }

    struct Harness {
        engine: InterviewEngine,
        media_rx: Option<mpsc::Receiver<MediaChunk>>,
        completion_timer: Option<tokio::time::Interval>,
        chunk_tx: mpsc::Sender<MediaChunk>,
        cmd_tx: mpsc::Sender<EngineCommand>,
        done_rx: mpsc::UnboundedReceiver<usize>,
        sink: Arc<MockSink>,
        status_rx: broadcast::Receiver<EngineStatus>,
    }

    fn harness(deny: bool, fail_uploads: bool) -> Harness {
        let (chunk_tx, chunk_rx) = mpsc::channel(32);
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let sink = Arc::new(MockSink {
            fail: fail_uploads,
            sent: Mutex::new(Vec::new()),
            done_tx,
        });

        let backend = Box::new(MockBackend {
            rx: Some(chunk_rx),
            deny,
        });

        let (cmd_tx, cmd_rx, status_tx, status_rx) = create_engine_channels();
        let engine = InterviewEngine::new(
            &Config::default(),
            backend,
            sink.clone(),
            cmd_rx,
            status_tx,
        )
        .unwrap();

        Harness {
            engine,
            media_rx: None,
            completion_timer: None,
            chunk_tx,
            cmd_tx,
            done_rx,
            sink,
            status_rx,
        }
    }

    impl Harness {
        async fn command(&mut self, cmd: EngineCommand) {
            self.engine
                .handle_command(cmd, &mut self.media_rx, &mut self.completion_timer)
                .await
                .unwrap();
        }

        /// Push one chunk through the bound stream into the recorder
        async fn feed_chunk(&mut self, data: &[u8]) {
            self.chunk_tx
                .send(MediaChunk {
                    data: data.to_vec(),
                    timestamp_ms: 0,
                })
                .await
                .unwrap();
            let chunk = self.media_rx.as_mut().unwrap().recv().await.unwrap();
            self.engine.ingest_chunk(chunk);
        }
    }

    #[tokio::test]
    async fn denied_access_keeps_session_on_instructions() {
        let mut h = harness(true, false);

        h.command(EngineCommand::RequestAccess).await;
        assert_eq!(h.engine.session().screen(), Screen::Instructions);
        assert!(!h.engine.session().permissions_granted());

        // Later commands are ignored by the screen guards; the session
        // never leaves Instructions.
        h.command(EngineCommand::ConfirmSetup).await;
        h.command(EngineCommand::StartRecording).await;
        h.command(EngineCommand::StopRecording).await;
        assert_eq!(h.engine.session().screen(), Screen::Instructions);

        let mut saw_denied = false;
        while let Ok(status) = h.status_rx.try_recv() {
            if matches!(status, EngineStatus::AccessDenied { .. }) {
                saw_denied = true;
            }
        }
        assert!(saw_denied);
    }

    #[tokio::test]
    async fn five_answers_walk_the_expected_screens() {
        let mut h = harness(false, false);

        h.command(EngineCommand::RequestAccess).await;
        assert_eq!(h.engine.session().screen(), Screen::Preview);

        h.command(EngineCommand::ConfirmSetup).await;
        assert_eq!(h.engine.session().screen(), Screen::Questions);

        for i in 0..5 {
            assert_eq!(h.engine.session().question_index(), i);

            h.command(EngineCommand::StartRecording).await;
            assert_eq!(h.engine.session().screen(), Screen::Recording);

            h.feed_chunk(format!("answer-{}", i).as_bytes()).await;
            h.command(EngineCommand::StopRecording).await;

            // Buffer never survives a stop, whatever the upload does
            assert!(h.engine.recorder().buffer_is_empty());
        }

        assert_eq!(h.engine.session().screen(), Screen::Processing);
        assert!(h.completion_timer.is_some());

        h.engine.finish_processing().unwrap();
        assert_eq!(h.engine.session().screen(), Screen::Completed);
        assert!(h.engine.session().is_terminal());
    }

    #[tokio::test]
    async fn payloads_are_isolated_per_question() {
        let mut h = harness(false, false);
        h.command(EngineCommand::RequestAccess).await;
        h.command(EngineCommand::ConfirmSetup).await;

        h.command(EngineCommand::StartRecording).await;
        h.feed_chunk(b"first-a").await;
        h.feed_chunk(b"first-b").await;
        h.command(EngineCommand::StopRecording).await;
        h.done_rx.recv().await.unwrap();

        h.command(EngineCommand::StartRecording).await;
        h.feed_chunk(b"second").await;
        h.command(EngineCommand::StopRecording).await;
        h.done_rx.recv().await.unwrap();

        let sent = h.sink.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], (0, b"first-afirst-b".to_vec()));
        assert_eq!(sent[1], (1, b"second".to_vec()));
    }

    #[tokio::test]
    async fn failed_upload_still_advances_the_sequencer() {
        let mut h = harness(false, true);
        h.command(EngineCommand::RequestAccess).await;
        h.command(EngineCommand::ConfirmSetup).await;

        h.command(EngineCommand::StartRecording).await;
        h.feed_chunk(b"doomed-answer").await;
        h.command(EngineCommand::StopRecording).await;

        // The advance happened synchronously, before the upload resolved
        assert_eq!(h.engine.session().screen(), Screen::Questions);
        assert_eq!(h.engine.session().question_index(), 1);
        assert!(h.engine.recorder().buffer_is_empty());

        // The failure is surfaced, not swallowed
        h.done_rx.recv().await.unwrap();
        loop {
            match h.status_rx.recv().await.unwrap() {
                EngineStatus::UploadFailed {
                    question_index,
                    reason,
                } => {
                    assert_eq!(question_index, 0);
                    assert!(reason.contains("500"));
                    break;
                }
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn shutdown_command_alone_stops_the_run_loop() {
        let mut h = harness(false, false);

        // No other driver involvement: a Shutdown over the command channel
        // must be enough to end the main loop.
        h.cmd_tx.send(EngineCommand::Shutdown).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), h.engine.run())
            .await
            .expect("engine did not stop on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn closed_command_channel_stops_the_run_loop() {
        let mut h = harness(false, false);
        drop(h.cmd_tx);

        tokio::time::timeout(Duration::from_secs(1), h.engine.run())
            .await
            .expect("engine did not stop on channel close")
            .unwrap();
    }

    #[tokio::test]
    async fn chunks_outside_a_recording_are_dropped() {
        let mut h = harness(false, false);
        h.command(EngineCommand::RequestAccess).await;
        h.command(EngineCommand::ConfirmSetup).await;

        // Preview-style chunk before recording starts
        h.chunk_tx
            .send(MediaChunk {
                data: b"preview".to_vec(),
                timestamp_ms: 0,
            })
            .await
            .unwrap();
        let chunk = h.media_rx.as_mut().unwrap().recv().await.unwrap();
        h.engine.ingest_chunk(chunk);

        h.command(EngineCommand::StartRecording).await;
        h.feed_chunk(b"recorded").await;
        h.command(EngineCommand::StopRecording).await;
        h.done_rx.recv().await.unwrap();

        let sent = h.sink.sent.lock().unwrap();
        assert_eq!(sent[0].1, b"recorded".to_vec());
    }
}
