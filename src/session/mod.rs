//! Interview session management
//!
//! This module provides the `SessionController` that drives one interview:
//! - Channel to the backend (start, mic chunks, turn control)
//! - Capture with the echo policy applied
//! - Gapless playback of synthesized speech
//! - Lip-sync timeline and viseme publishing
//! - Session state machine and statistics

mod config;
mod controller;
mod state;
mod stats;

pub use config::{CapturePolicy, SessionConfig};
pub use controller::{SessionCommand, SessionController, SessionHandle, SessionResources};
pub use state::{SessionState, SessionStatus, Trigger};
pub use stats::{LatencyMetrics, SessionReport, SessionStats, TranscriptEntry};
