//! Session recording
//!
//! A collector task pulls one chunk per timeslice from a [`MediaSource`]
//! while the interview runs. Stopping finalizes the blob and uploads it in
//! the background; a failed upload falls back to a local file.

mod recorder;
mod source;
mod upload;

pub use recorder::{RecordingConfig, RecordingPipeline, UploadOutcome};
pub use source::{ChannelMediaSource, MediaSource, MixedAudioSource};
pub use upload::{save_locally, HttpUploader, RecordingBlob, UploadError};
