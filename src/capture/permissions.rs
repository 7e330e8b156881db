//! Preflight checks for the configured capture source

use std::path::Path;
use tracing::debug;

use crate::config::{CaptureSource, Config};

/// Permission status for the capture source
#[derive(Debug, Clone)]
pub struct PermissionStatus {
    /// Whether the configured media source is accessible
    pub media_source: PermissionState,
}

/// State of a single permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// Permission is granted
    Granted,
    /// Permission is denied
    Denied,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

/// Check access to the configured capture source.
///
/// This is advisory: the authoritative gate is the backend's `open` call at
/// the start of a session. The preflight exists so obvious misconfiguration
/// is surfaced before the operator walks an interviewee into a dead session.
pub fn check_permissions(config: &Config) -> PermissionStatus {
    let media_source = match config.capture.source {
        CaptureSource::File => match &config.capture.media_file {
            Some(path) => check_file_readable(path),
            None => PermissionState::Denied,
        },
    };

    PermissionStatus { media_source }
}

fn check_file_readable(path: &Path) -> PermissionState {
    match std::fs::File::open(path) {
        Ok(_) => {
            debug!("Media source readable: {:?}", path);
            PermissionState::Granted
        }
        Err(e) => {
            debug!("Media source not readable: {:?} ({})", path, e);
            PermissionState::Denied
        }
    }
}

/// Get a human-readable description of missing permissions
pub fn describe_missing_permissions(config: &Config) -> Vec<String> {
    let status = check_permissions(config);
    let mut missing = Vec::new();

    if !status.media_source.is_granted() {
        missing.push(match &config.capture.media_file {
            Some(path) => format!("Configured media source {:?} is not readable", path),
            None => "No media source configured (set capture.media_file)".to_string(),
        });
    }

    missing
}
