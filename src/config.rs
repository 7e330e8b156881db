//! Configuration management for the interview agent

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Interview configuration (questions, prompts, pacing)
    #[serde(default)]
    pub interview: InterviewConfig,

    /// Capture configuration (where recorded media comes from)
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Ordered question prompts, one recording per entry
    #[serde(default = "default_questions")]
    pub questions: Vec<String>,

    /// Directory holding the audio renditions of the prompts
    /// (`audio0.wav`, `audio1.wav`, ... addressed by question index)
    #[serde(default = "default_audio_prompt_dir")]
    pub audio_prompt_dir: PathBuf,

    /// Fixed delay between the last answer and the Completed screen
    #[serde(default = "default_processing_delay_secs")]
    pub processing_delay_secs: u64,
}

/// Where recorded media chunks come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureSource {
    /// Stream chunks from a media file (soak testing and batch runs)
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Capture backend to use
    #[serde(default = "default_capture_source")]
    pub source: CaptureSource,

    /// Media file streamed by the file backend
    pub media_file: Option<PathBuf>,

    /// Size of each emitted chunk in bytes
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: usize,

    /// Pacing between emitted chunks (ms)
    #[serde(default = "default_chunk_interval_ms")]
    pub chunk_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Ingestion endpoint receiving one multipart POST per question.
    /// Uploads are skipped (with a warning) when unset.
    pub endpoint: Option<String>,
}

// Default value functions
fn default_questions() -> Vec<String> {
    [
        "Tell me about yourself and your professional background.",
        "What are your greatest professional strengths?",
        "Describe a challenging project you've worked on.",
        "Where do you see yourself in the next five years?",
        "Why are you interested in this position?",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_audio_prompt_dir() -> PathBuf {
    PathBuf::from("audios")
}

fn default_processing_delay_secs() -> u64 {
    2
}

fn default_capture_source() -> CaptureSource {
    CaptureSource::File
}

fn default_chunk_bytes() -> usize {
    64 * 1024
}

fn default_chunk_interval_ms() -> u64 {
    250
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            questions: default_questions(),
            audio_prompt_dir: default_audio_prompt_dir(),
            processing_delay_secs: default_processing_delay_secs(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: default_capture_source(),
            media_file: None,
            chunk_bytes: default_chunk_bytes(),
            chunk_interval_ms: default_chunk_interval_ms(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { endpoint: None }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interview: InterviewConfig::default(),
            capture: CaptureConfig::default(),
            upload: UploadConfig::default(),
            config_path: None,
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let mut config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

            config.config_path = Some(config_path);
            config.validate()?;
            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = match self.config_path.clone() {
            Some(path) => path,
            None => Self::default_config_path()?,
        };

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match self.config_path.clone() {
            Some(path) => Ok(path),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "interview-agent", "agent")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.interview.questions.is_empty(),
            "interview.questions must contain at least one prompt"
        );
        anyhow::ensure!(self.capture.chunk_bytes > 0, "capture.chunk_bytes must be > 0");
        Ok(())
    }

    /// Check if an ingestion endpoint has been configured
    pub fn upload_configured(&self) -> bool {
        self.upload.endpoint.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_the_five_stock_questions() {
        let config = Config::default();
        assert_eq!(config.interview.questions.len(), 5);
        assert_eq!(config.interview.processing_delay_secs, 2);
        assert_eq!(config.capture.source, CaptureSource::File);
        assert!(!config.upload_configured());
    }

    #[test]
    fn config_round_trips_through_toml() {
        let mut config = Config::default();
        config.upload.endpoint = Some("http://localhost:9000/api/upload-interview-video".into());
        config.capture.media_file = Some(PathBuf::from("/tmp/sample.webm"));

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(restored.interview.questions, config.interview.questions);
        assert_eq!(restored.upload.endpoint, config.upload.endpoint);
        assert_eq!(restored.capture.media_file, config.capture.media_file);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [upload]
            endpoint = "http://ingest.example/upload"
            "#,
        )
        .unwrap();

        assert_eq!(config.interview.questions.len(), 5);
        assert_eq!(config.capture.chunk_bytes, 64 * 1024);
        assert!(config.upload_configured());
    }
}
