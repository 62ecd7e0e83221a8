use super::state::AppState;
use crate::session::{SessionCommand, SessionHandle, SessionStats};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct EndSessionRequest {
    /// Reason reported to the backend (default: "user_ended")
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

async fn current_session(state: &AppState) -> Result<SessionHandle, Response> {
    state
        .handle()
        .await
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "No session has been started"))
}

async fn forward(state: &AppState, command: SessionCommand, message: &str) -> Response {
    let handle = match current_session(state).await {
        Ok(handle) => handle,
        Err(response) => return response,
    };

    let stats: SessionStats = handle.stats();
    if stats.status.is_terminal() || !handle.is_running() {
        return error_response(
            StatusCode::CONFLICT,
            format!("Session {} is not running", stats.session_id),
        );
    }

    info!("Forwarding {:?} to session {}", command, stats.session_id);

    match handle.send(command).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(CommandResponse {
                session_id: stats.session_id,
                status: stats.status.label().to_string(),
                message: message.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to forward command: {}", e);
            error_response(StatusCode::CONFLICT, format!("{}", e))
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session/status
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    match current_session(&state).await {
        Ok(handle) => (StatusCode::OK, Json(handle.stats())).into_response(),
        Err(response) => response,
    }
}

/// GET /session/transcript
/// Transcript accumulated so far
pub async fn get_session_transcript(State(state): State<AppState>) -> impl IntoResponse {
    match current_session(&state).await {
        Ok(handle) => (StatusCode::OK, Json(handle.get_transcript().await)).into_response(),
        Err(response) => response,
    }
}

/// GET /session/metrics
pub async fn get_session_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match current_session(&state).await {
        Ok(handle) => (StatusCode::OK, Json(handle.get_metrics().await)).into_response(),
        Err(response) => response,
    }
}

/// POST /session/turn-end
pub async fn end_turn(State(state): State<AppState>) -> impl IntoResponse {
    forward(&state, SessionCommand::EndTurn, "Turn ended").await
}

/// POST /session/barge-in
pub async fn barge_in(State(state): State<AppState>) -> impl IntoResponse {
    forward(&state, SessionCommand::BargeIn, "Barge-in requested").await
}

/// POST /session/end
pub async fn end_session(
    State(state): State<AppState>,
    body: Option<Json<EndSessionRequest>>,
) -> impl IntoResponse {
    let reason = body
        .and_then(|Json(req)| req.reason)
        .unwrap_or_else(|| "user_ended".to_string());

    forward(&state, SessionCommand::End { reason }, "Session ending").await
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
