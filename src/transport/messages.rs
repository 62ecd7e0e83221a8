use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

use crate::lipsync::AlignmentEvent;

/// Messages sent to the interview backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    Start {
        session_id: String,
        interview_id: String,
    },
    MicChunk {
        seq: u64,
        audio_b64: String, // Base64-encoded PCM bytes
    },
    UserTurnEnd {},
    BargeIn {},
    End {
        reason: String,
    },
}

impl ClientMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ClientMessage::Start { .. } => "start",
            ClientMessage::MicChunk { .. } => "mic_chunk",
            ClientMessage::UserTurnEnd {} => "user_turn_end",
            ClientMessage::BargeIn {} => "barge_in",
            ClientMessage::End { .. } => "end",
        }
    }
}

/// Who produced a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

/// Messages received from the interview backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionReady {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    Transcript {
        speaker: Speaker,
        text: String,
        #[serde(rename = "final", default)]
        is_final: bool,
    },
    TtsChunk {
        audio_b64: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        align: Option<AlignmentPayload>,
    },
    AnswerEnd {},
    Notice {
        msg: String,
    },
    ErrorMessage {
        message: String,
    },
    Metrics {
        #[serde(default)]
        latency: HashMap<String, f64>,
    },
    /// Any event this client does not understand
    #[serde(other)]
    Unknown,
}

/// Character/phoneme timings attached to a speech chunk
///
/// Parallel arrays, offsets relative to the start of the utterance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentPayload {
    #[serde(alias = "phonemes", default)]
    pub chars: Vec<String>,
    #[serde(alias = "start_times_ms", default)]
    pub char_start_times_ms: Vec<f64>,
    #[serde(alias = "durations_ms", default)]
    pub char_durations_ms: Vec<f64>,
}

impl AlignmentPayload {
    /// Zip the arrays into events, truncating to the shortest array
    pub fn to_events(&self) -> Vec<AlignmentEvent> {
        let len = self
            .chars
            .len()
            .min(self.char_start_times_ms.len())
            .min(self.char_durations_ms.len());

        if len != self.chars.len()
            || len != self.char_start_times_ms.len()
            || len != self.char_durations_ms.len()
        {
            warn!(
                "Alignment arrays differ in length ({}, {}, {}); using first {}",
                self.chars.len(),
                self.char_start_times_ms.len(),
                self.char_durations_ms.len(),
                len
            );
        }

        (0..len)
            .map(|i| {
                AlignmentEvent::new(
                    self.chars[i].clone(),
                    millis(self.char_start_times_ms[i]),
                    millis(self.char_durations_ms[i]),
                )
            })
            .collect()
    }
}

fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}
