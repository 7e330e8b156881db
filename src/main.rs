//! interview-agent
//!
//! Walks an interviewee through a fixed list of questions, recording one
//! media clip per question and uploading each clip to a configured
//! ingestion endpoint.

mod capture;
mod config;
mod engine;
mod logging;
mod session;
mod upload;

use anyhow::Result;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use config::Config;
use engine::{create_engine_channels, EngineCommand, EngineStatus, InterviewEngine};
use upload::HttpUploader;

/// Main entry point; the main thread waits on the engine so shutdown never
/// depends on further console input
fn main() -> Result<()> {
    let _log_guard = logging::init_logging()?;

    info!("interview-agent starting...");
    debug!("Log directory: {:?}", logging::get_log_dir()?);

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    // Load configuration
    let config = Config::load()?;
    info!("Configuration loaded from {:?}", config.config_path()?);

    // Preflight the capture source so misconfiguration surfaces before an
    // interviewee is in front of the agent
    for missing in capture::describe_missing_permissions(&config) {
        warn!("{}", missing);
    }

    if !config.upload_configured() {
        warn!("No ingestion endpoint configured - recorded answers will be discarded");
    }

    // Create tokio runtime for async operations
    let runtime = Arc::new(tokio::runtime::Runtime::new()?);

    // Create engine channels
    let (cmd_tx, cmd_rx, status_tx, status_rx) = create_engine_channels();

    // Build the capture backend and uploader
    let backend = capture::create_media_backend(&config)?;
    let uploader = Arc::new(HttpUploader::new(&config));

    let mut engine = InterviewEngine::new(&config, backend, uploader, cmd_rx, status_tx)?;

    // Render engine statuses for the operator
    runtime.spawn(render_statuses(status_rx));

    // Spawn the engine on the tokio runtime
    let engine_runtime = runtime.clone();
    let engine_handle = std::thread::spawn(move || {
        engine_runtime.block_on(async move {
            if let Err(e) = engine.run().await {
                error!("Interview engine error: {}", e);
            }
        });
    });

    // Set up Ctrl+C handler that sends shutdown command
    let ctrl_c_tx = cmd_tx.clone();
    let ctrl_c_runtime = runtime.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        let tx = ctrl_c_tx.clone();
        ctrl_c_runtime.spawn(async move {
            let _ = tx.send(EngineCommand::Shutdown).await;
        });
    })?;

    // Operator console on a worker thread. The main thread blocks on the
    // engine instead of on stdin, so a Shutdown from the Ctrl+C handler
    // ends the process without waiting for another console line.
    let console_tx = cmd_tx.clone();
    std::thread::spawn(move || run_console(&console_tx));

    // Wait for engine thread to finish
    let _ = engine_handle.join();

    info!("Shutdown complete");
    Ok(())
}

/// Read operator commands from stdin until quit or EOF
fn run_console(cmd_tx: &tokio::sync::mpsc::Sender<EngineCommand>) {
    println!("Commands: access, confirm, start, stop, quit");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else {
            break;
        };

        let cmd = match line.trim() {
            "" => continue,
            "access" => EngineCommand::RequestAccess,
            "confirm" => EngineCommand::ConfirmSetup,
            "start" => EngineCommand::StartRecording,
            "stop" => EngineCommand::StopRecording,
            "quit" | "exit" => EngineCommand::Shutdown,
            other => {
                println!(
                    "Unknown command: {:?} (try access/confirm/start/stop/quit)",
                    other
                );
                continue;
            }
        };

        let quitting = matches!(cmd, EngineCommand::Shutdown);
        if cmd_tx.blocking_send(cmd).is_err() {
            return;
        }
        if quitting {
            return;
        }
    }

    // Stdin hit EOF without an explicit quit; stop the engine anyway
    let _ = cmd_tx.blocking_send(EngineCommand::Shutdown);
}

/// Surface engine statuses to the operator
async fn render_statuses(mut status_rx: broadcast::Receiver<EngineStatus>) {
    loop {
        match status_rx.recv().await {
            Ok(status) => match status {
                EngineStatus::ScreenChanged {
                    screen,
                    question_index,
                } => {
                    info!("Screen: {:?} (question {})", screen, question_index);
                }
                EngineStatus::AccessDenied { reason } => {
                    error!(
                        "Could not access camera or microphone. Please check your permissions. ({})",
                        reason
                    );
                }
                EngineStatus::AwaitingAnswer {
                    question_index,
                    prompt,
                    audio_prompt,
                } => {
                    info!("Question {}: {}", question_index + 1, prompt);
                    info!("Audio prompt: {:?}", audio_prompt);
                }
                EngineStatus::Recording {
                    question_index,
                    buffered_bytes,
                } => {
                    debug!(
                        "Recording question {}: {} bytes buffered",
                        question_index, buffered_bytes
                    );
                }
                EngineStatus::UploadStarted { question_index } => {
                    info!("Uploading answer for question {}...", question_index + 1);
                }
                EngineStatus::UploadComplete { question_index } => {
                    info!("Answer for question {} uploaded", question_index + 1);
                }
                EngineStatus::UploadFailed {
                    question_index,
                    reason,
                } => {
                    error!(
                        "Failed to upload video for question {}: {}",
                        question_index + 1,
                        reason
                    );
                }
                EngineStatus::Error(msg) => {
                    error!("{}", msg);
                }
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Status stream lagged by {} messages", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_help() {
    println!("interview-agent - per-question interview recording and upload");
    println!();
    println!("USAGE:");
    println!("    interview-agent [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help    Print this help message");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                   Set log level (e.g., debug, info, warn)");
    println!("    INTERVIEW_AGENT_LOG_PATH   Override the log directory");
    println!();
    println!("CONSOLE COMMANDS:");
    println!("    access     Request camera/microphone access");
    println!("    confirm    Confirm the preview and begin the interview");
    println!("    start      Start recording the active question");
    println!("    stop       Stop recording and upload the answer");
    println!("    quit       Shut down");
}
