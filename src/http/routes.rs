use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session queries
        .route("/session/status", get(handlers::get_session_status))
        .route("/session/transcript", get(handlers::get_session_transcript))
        .route("/session/metrics", get(handlers::get_session_metrics))
        // Turn control
        .route("/session/turn-end", post(handlers::end_turn))
        .route("/session/barge-in", post(handlers::barge_in))
        .route("/session/end", post(handlers::end_session))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
