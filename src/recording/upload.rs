use anyhow::{Context, Result};
use reqwest::multipart;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Errors returned by the recording upload endpoint
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("upload request failed: {0}")]
    RequestFailed(String),
    #[error("upload rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// A finished recording, ready to leave the machine
#[derive(Debug, Clone)]
pub struct RecordingBlob {
    pub session_id: String,
    pub interview_id: String,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub extension: String,
}

impl RecordingBlob {
    pub fn file_name(&self) -> String {
        format!("{}-recording.{}", self.session_id, self.extension)
    }
}

/// Posts recordings to the interview backend as multipart forms
pub struct HttpUploader {
    client: reqwest::Client,
    url: String,
    auth_token: Option<String>,
}

impl HttpUploader {
    pub fn new(url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            auth_token,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn upload(&self, blob: &RecordingBlob) -> Result<(), UploadError> {
        let file_part = multipart::Part::bytes(blob.bytes.clone())
            .file_name(blob.file_name())
            .mime_str(&blob.mime_type)
            .map_err(|e| UploadError::RequestFailed(format!("mime: {}", e)))?;

        let form = multipart::Form::new()
            .part("video", file_part)
            .text("session_id", blob.session_id.clone())
            .text("interview_id", blob.interview_id.clone());

        debug!(
            "Uploading {} bytes of {} to {}",
            blob.bytes.len(),
            blob.mime_type,
            self.url
        );

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UploadError::RequestFailed(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(UploadError::Rejected { status, body });
        }

        info!("Recording uploaded: {} ({} bytes)", blob.file_name(), blob.bytes.len());

        Ok(())
    }
}

/// Write the blob to `dir` so it survives a failed upload
pub async fn save_locally(dir: &Path, blob: &RecordingBlob) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create fallback directory: {:?}", dir))?;

    let path = dir.join(blob.file_name());
    tokio::fs::write(&path, &blob.bytes)
        .await
        .with_context(|| format!("Failed to write recording: {:?}", path))?;

    warn!("Recording saved locally instead: {:?}", path);

    Ok(path)
}
