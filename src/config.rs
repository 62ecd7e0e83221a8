use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::{AudioStreamSource, MixerConfig};
use crate::recording::RecordingConfig;
use crate::session::{CapturePolicy, SessionConfig};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub audio: AudioConfig,
    pub session: SessionSettings,
    pub recording: RecordingSettings,
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Websocket endpoint of the interview backend
    pub ws_url: String,
    /// Recording upload endpoint
    pub upload_url: String,
    pub auth_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws/interview".to_string(),
            upload_url: "http://localhost:8000/interviews/upload/video".to_string(),
            auth_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Wire sample rate for both directions
    pub sample_rate: u32,
    pub chunk_duration_ms: u64,
    pub playback_lookahead_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::TARGET_SAMPLE_RATE,
            chunk_duration_ms: 100,
            playback_lookahead_ms: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub interview_id: String,
    pub capture_policy: CapturePolicy,
    pub render_fps: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            interview_id: String::new(),
            capture_policy: CapturePolicy::default(),
            render_fps: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub enabled: bool,
    pub chunk_interval_ms: u64,
    pub fallback_dir: String,
    pub upload_timeout_secs: u64,
    /// Include the interviewer's speech in the mixed recording
    pub mix_remote_speech: bool,
    /// Buffered frames older than this behind the mix position are dropped
    pub mix_max_delay_ms: u64,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_interval_ms: 1000,
            fallback_dir: "recordings".to_string(),
            upload_timeout_secs: 30,
            mix_remote_speech: true,
            mix_max_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub bind: String,
    /// Control API port; 0 disables the API
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

impl Config {
    /// Load from a config file plus `INTERVIEW__` environment overrides
    ///
    /// `INTERVIEW__BACKEND__WS_URL=wss://...` overrides `backend.ws_url`.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("INTERVIEW").separator("__"))
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            interview_id: self.session.interview_id.clone(),
            sample_rate: self.audio.sample_rate,
            chunk_duration_ms: self.audio.chunk_duration_ms,
            playback_lookahead_ms: self.audio.playback_lookahead_ms,
            capture_policy: self.session.capture_policy,
            render_fps: self.session.render_fps,
            ..SessionConfig::default()
        }
    }

    pub fn recording_config(&self) -> RecordingConfig {
        RecordingConfig {
            timeslice: Duration::from_millis(self.recording.chunk_interval_ms.max(1)),
            fallback_dir: PathBuf::from(&self.recording.fallback_dir),
        }
    }

    pub fn mixer_config(&self) -> MixerConfig {
        let mut enabled_sources = HashSet::from([AudioStreamSource::Microphone]);
        if self.recording.mix_remote_speech {
            enabled_sources.insert(AudioStreamSource::Remote);
        }

        MixerConfig {
            sample_rate: self.audio.sample_rate,
            max_buffer_delay_ms: self.recording.mix_max_delay_ms,
            enabled_sources,
        }
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.recording.upload_timeout_secs)
    }
}
