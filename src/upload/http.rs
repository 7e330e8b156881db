//! Multipart HTTP upload implementation

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, info};

use super::{UploadError, UploadSink};
use crate::config::Config;

/// Uploads one multipart request per recorded answer.
///
/// Single attempt, awaited to completion, no timeout beyond the client
/// defaults. Wire contract: field `video` carries the payload under the
/// filename `question_<N+1>.webm`, field `questionIndex` carries the
/// zero-based index as a string; any 2xx response is success.
#[derive(Clone)]
pub struct HttpUploader {
    client: Client,
    endpoint: Option<String>,
}

impl HttpUploader {
    /// Create a new uploader
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.upload.endpoint.clone(),
        }
    }
}

/// Filename tag for an answer payload; 1-based to match the uploaded
/// artifact naming of the ingestion side.
fn video_file_name(question_index: usize) -> String {
    format!("question_{}.webm", question_index + 1)
}

#[async_trait]
impl UploadSink for HttpUploader {
    async fn send(&self, question_index: usize, payload: &[u8]) -> Result<(), UploadError> {
        let endpoint = self.endpoint.as_ref().ok_or(UploadError::NotConfigured)?;

        debug!(
            "Uploading answer for question {} ({} bytes)",
            question_index,
            payload.len()
        );

        let video = Part::bytes(payload.to_vec())
            .file_name(video_file_name(question_index))
            .mime_str("video/webm")?;

        let form = Form::new()
            .part("video", video)
            .text("questionIndex", question_index.to_string());

        let response = self.client.post(endpoint).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
            });
        }

        info!(
            "Uploaded answer for question {} ({:.2} MB)",
            question_index,
            payload.len() as f64 / (1024.0 * 1024.0)
        );
        Ok(())
    }

    fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}
