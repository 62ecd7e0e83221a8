use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::capture::CaptureConfig;
use crate::playback::PlaybackConfig;

/// What happens to microphone audio while the interviewer is speaking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePolicy {
    /// Capture keeps running but chunks are not sent, so the backend never
    /// transcribes the interviewer's own voice
    #[default]
    SuspendWhileSpeaking,
    /// Every chunk is sent; the backend's turn detection handles echo
    AlwaysForward,
}

/// Configuration for an interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Client-generated session identifier
    pub session_id: String,

    /// Server-assigned interview identifier
    pub interview_id: String,

    /// Wire sample rate for both directions
    /// Default: 24kHz
    pub sample_rate: u32,

    /// Duration of each outbound chunk
    /// Default: 100ms
    pub chunk_duration_ms: u64,

    /// Delay before the first chunk of an utterance plays
    /// Default: 50ms
    pub playback_lookahead_ms: u64,

    pub capture_policy: CapturePolicy,

    /// Rate at which viseme targets are published for the renderer
    /// Default: 60Hz
    pub render_fps: u32,
}

impl SessionConfig {
    pub fn new(interview_id: impl Into<String>) -> Self {
        Self {
            interview_id: interview_id.into(),
            ..Self::default()
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            target_sample_rate: self.sample_rate,
            frame_duration_ms: self.chunk_duration_ms,
        }
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            sample_rate: self.sample_rate,
            lookahead: Duration::from_millis(self.playback_lookahead_ms),
        }
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.render_fps.max(1) as f64)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            interview_id: String::new(),
            sample_rate: crate::TARGET_SAMPLE_RATE,
            chunk_duration_ms: 100,
            playback_lookahead_ms: 50,
            capture_policy: CapturePolicy::default(),
            render_fps: 60,
        }
    }
}
