use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::source::MediaSource;
use super::upload::{save_locally, HttpUploader, RecordingBlob};

/// Recording configuration
#[derive(Debug, Clone)]
pub struct RecordingConfig {
    /// How often the source is asked for a chunk (default: 1s)
    pub timeslice: Duration,
    /// Where recordings go when the upload fails
    pub fallback_dir: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            timeslice: Duration::from_secs(1),
            fallback_dir: PathBuf::from("recordings"),
        }
    }
}

/// What became of a stopped recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded,
    /// Upload failed; the blob was written here instead
    SavedLocally(PathBuf),
    /// Neither the upload nor the local copy succeeded
    Failed(String),
    /// Still in flight when the wait gave up
    TimedOut,
    NothingPending,
}

struct ActiveRecording {
    session_id: String,
    stop_tx: oneshot::Sender<()>,
    collector: JoinHandle<Result<RecordingBlob>>,
}

/// Records a session alongside the live conversation and uploads it at the end
pub struct RecordingPipeline {
    config: RecordingConfig,
    uploader: Arc<HttpUploader>,
    active: Option<ActiveRecording>,
    upload: Option<JoinHandle<UploadOutcome>>,
}

impl RecordingPipeline {
    pub fn new(config: RecordingConfig, uploader: HttpUploader) -> Self {
        Self {
            config,
            uploader: Arc::new(uploader),
            active: None,
            upload: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start collecting chunks from `source`
    pub fn start_recording(
        &mut self,
        source: Box<dyn MediaSource>,
        session_id: impl Into<String>,
        interview_id: impl Into<String>,
    ) -> Result<()> {
        if self.active.is_some() {
            bail!("A recording is already in progress");
        }

        let session_id = session_id.into();
        let interview_id = interview_id.into();

        info!("Starting recording session: {}", session_id);

        let (stop_tx, stop_rx) = oneshot::channel();
        let collector = tokio::spawn(collect(
            source,
            self.config.timeslice,
            stop_rx,
            session_id.clone(),
            interview_id,
        ));

        self.active = Some(ActiveRecording {
            session_id,
            stop_tx,
            collector,
        });

        Ok(())
    }

    /// Finalize the recording and start uploading it in the background
    ///
    /// Returns false when nothing was being recorded.
    pub async fn stop_recording(&mut self) -> Result<bool> {
        let Some(active) = self.active.take() else {
            warn!("Stop requested but no recording is in progress");
            return Ok(false);
        };

        // The collector also stops if the sender is dropped
        let _ = active.stop_tx.send(());

        let blob = active
            .collector
            .await
            .context("Recording collector panicked")?
            .with_context(|| format!("Failed to finalize recording {}", active.session_id))?;

        info!(
            "Recording {} finalized: {} bytes of {}",
            blob.session_id,
            blob.bytes.len(),
            blob.mime_type
        );

        let uploader = Arc::clone(&self.uploader);
        let fallback_dir = self.config.fallback_dir.clone();

        self.upload = Some(tokio::spawn(async move {
            match uploader.upload(&blob).await {
                Ok(()) => UploadOutcome::Uploaded,
                Err(e) => {
                    error!("Recording upload to {} failed: {}", uploader.url(), e);
                    match save_locally(&fallback_dir, &blob).await {
                        Ok(path) => UploadOutcome::SavedLocally(path),
                        Err(e) => {
                            error!("Recording {} lost: {:#}", blob.session_id, e);
                            UploadOutcome::Failed(format!("{:#}", e))
                        }
                    }
                }
            }
        }));

        Ok(true)
    }

    /// Wait for the pending upload, giving up after `timeout`
    ///
    /// On timeout the upload keeps running and can be waited on again.
    pub async fn wait_for_upload(&mut self, timeout: Duration) -> UploadOutcome {
        let Some(mut upload) = self.upload.take() else {
            return UploadOutcome::NothingPending;
        };

        match tokio::time::timeout(timeout, &mut upload).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => UploadOutcome::Failed(format!("Upload task failed: {}", e)),
            Err(_) => {
                warn!("Recording upload still running after {:?}", timeout);
                self.upload = Some(upload);
                UploadOutcome::TimedOut
            }
        }
    }
}

async fn collect(
    mut source: Box<dyn MediaSource>,
    timeslice: Duration,
    mut stop_rx: oneshot::Receiver<()>,
    session_id: String,
    interview_id: String,
) -> Result<RecordingBlob> {
    let mut chunks: Vec<Vec<u8>> = Vec::new();
    let mut ticker = tokio::time::interval(timeslice);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let chunk = source.take_chunk().await?;
                if !chunk.is_empty() {
                    debug!("Recording chunk {} ({} bytes)", chunks.len(), chunk.len());
                    chunks.push(chunk);
                }
            }
            _ = &mut stop_rx => break,
        }
    }

    let last = source.take_chunk().await?;
    if !last.is_empty() {
        chunks.push(last);
    }

    let count = chunks.len();
    let bytes = source.finalize(chunks)?;
    debug!("Recording {} closed after {} chunks", session_id, count);

    Ok(RecordingBlob {
        session_id,
        interview_id,
        bytes,
        mime_type: source.mime_type().to_string(),
        extension: source.extension().to_string(),
    })
}
