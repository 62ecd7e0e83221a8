//! HTTP API for local control of the running interview
//!
//! - GET /health - Health check
//! - GET /session/status - Session snapshot (state, counters)
//! - GET /session/transcript - Transcript so far
//! - GET /session/metrics - Latest latency report
//! - POST /session/turn-end - Candidate finished answering
//! - POST /session/barge-in - Interrupt the interviewer
//! - POST /session/end - End the interview

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
