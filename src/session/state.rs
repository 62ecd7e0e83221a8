use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Interview lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Connecting,
    Ready,
    Listening,
    Processing,
    Speaking,
    Ended,
    Error,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Ended | SessionStatus::Error)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Ready => "ready",
            SessionStatus::Listening => "listening",
            SessionStatus::Processing => "processing",
            SessionStatus::Speaking => "speaking",
            SessionStatus::Ended => "ended",
            SessionStatus::Error => "error",
        }
    }
}

/// Things that move the session between states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Start,
    SessionReady,
    CaptureStarted,
    /// Committed user transcript, or the user ended the turn locally
    UserTurnFinished,
    PlaybackStarted,
    PlaybackEnded,
    /// Backend finished an answer that carried no audio
    AnswerEndedWithoutAudio,
    /// Barge-in cut the interviewer off
    Interrupted,
    End,
    Fail(String),
}

/// The one session a controller owns
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub interview_id: String,
    status: SessionStatus,
    error: Option<String>,
}

impl SessionState {
    pub fn new(session_id: impl Into<String>, interview_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            interview_id: interview_id.into(),
            status: SessionStatus::Idle,
            error: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Apply a trigger; returns whether the state changed
    ///
    /// Triggers that make no sense in the current state are ignored.
    pub fn apply(&mut self, trigger: Trigger) -> bool {
        use SessionStatus::*;

        let next = match (self.status, &trigger) {
            (status, _) if status.is_terminal() => None,
            (_, Trigger::End) => Some(Ended),
            (_, Trigger::Fail(message)) => {
                self.error = Some(message.clone());
                Some(Error)
            }
            (Idle, Trigger::Start) => Some(Connecting),
            (Connecting, Trigger::SessionReady) => Some(Ready),
            (Ready, Trigger::CaptureStarted) => Some(Listening),
            (Listening, Trigger::UserTurnFinished) => Some(Processing),
            (Ready | Listening | Processing, Trigger::PlaybackStarted) => Some(Speaking),
            (Speaking, Trigger::PlaybackEnded) => Some(Listening),
            (Processing, Trigger::AnswerEndedWithoutAudio) => Some(Listening),
            (Speaking | Processing, Trigger::Interrupted) => Some(Listening),
            _ => None,
        };

        match next {
            Some(next) => {
                info!(
                    "Session {}: {} -> {} ({:?})",
                    self.session_id,
                    self.status.label(),
                    next.label(),
                    trigger
                );
                self.status = next;
                true
            }
            None => {
                debug!(
                    "Session {}: ignoring {:?} while {}",
                    self.session_id,
                    trigger,
                    self.status.label()
                );
                false
            }
        }
    }
}
