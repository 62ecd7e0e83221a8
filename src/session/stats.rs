use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::state::SessionStatus;
use crate::transport::Speaker;

/// Statistics about an interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_id: String,

    pub interview_id: String,

    pub status: SessionStatus,

    /// Message shown to the user when the session failed
    pub error: Option<String>,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Microphone chunks sent to the backend
    pub chunks_sent: u64,

    /// Microphone chunks withheld while the interviewer was speaking
    pub chunks_suppressed: u64,

    /// Speech chunks received from the backend
    pub chunks_received: u64,

    /// Speech chunks dropped because they failed to decode
    pub decode_failures: u64,

    /// Number of transcript entries received
    pub transcript_entries: usize,
}

/// A single transcript line from the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,

    pub text: String,

    /// Committed result rather than an interim hypothesis
    #[serde(rename = "final")]
    pub is_final: bool,

    /// When this entry was received
    pub created_at: DateTime<Utc>,
}

/// Latest per-stage latency report (milliseconds)
///
/// Advisory only; replaced wholesale on every report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatencyMetrics {
    pub stages: HashMap<String, f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LatencyMetrics {
    pub fn replace(&mut self, stages: HashMap<String, f64>) {
        self.stages = stages;
        self.updated_at = Some(Utc::now());
    }
}

/// Everything a finished session leaves behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub stats: SessionStats,
    pub transcript: Vec<TranscriptEntry>,
    pub metrics: LatencyMetrics,
}
