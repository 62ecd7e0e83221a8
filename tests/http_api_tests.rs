// Integration tests for the local control API

use axum::body::Body;
use axum::http::{Request, StatusCode};
use interview_media::audio::{ChannelDevice, ManualClock, NullSink};
use interview_media::session::{
    SessionConfig, SessionController, SessionHandle, SessionReport, SessionResources, SessionStatus,
};
use interview_media::transport::{ClientMessage, MemoryBackend, MemoryConnector, ServerMessage};
use interview_media::{create_router, AppState};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower::ServiceExt;

async fn listening_session() -> (SessionHandle, MemoryBackend, JoinHandle<anyhow::Result<SessionReport>>) {
    let (connector, mut backend) = MemoryConnector::pair();
    let (controller, handle) = SessionController::new(
        SessionConfig::new("iv-55"),
        SessionResources {
            connector: Arc::new(connector),
            device: Arc::new(ChannelDevice::new(24000, 1)),
            clock: Arc::new(ManualClock::new()),
            sink: Box::new(NullSink),
        },
    );
    let task = controller.spawn();

    assert!(matches!(backend.recv().await, Some(ClientMessage::Start { .. })));
    backend
        .send(ServerMessage::SessionReady { session_id: None })
        .await
        .unwrap();
    handle.wait_for(SessionStatus::Listening).await;

    (handle, backend, task)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = create_router(AppState::new());
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_status_without_session_is_not_found() {
    let app = create_router(AppState::new());
    let response = app.oneshot(get("/session/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_status_reports_snapshot() {
    let (handle, _backend, _task) = listening_session().await;
    let app = create_router(AppState::with_session(handle));

    let response = app.oneshot(get("/session/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "listening");
    assert_eq!(json["interview_id"], "iv-55");
    assert_eq!(json["chunks_sent"], 0);
}

#[tokio::test]
async fn test_turn_end_is_forwarded() {
    let (handle, mut backend, _task) = listening_session().await;
    let app = create_router(AppState::with_session(handle.clone()));

    let response = app.oneshot(post("/session/turn-end")).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    assert_eq!(backend.recv().await, Some(ClientMessage::UserTurnEnd {}));
    assert_eq!(
        handle.wait_for(SessionStatus::Processing).await,
        SessionStatus::Processing
    );
}

#[tokio::test]
async fn test_transcript_and_metrics_routes() {
    let (handle, backend, _task) = listening_session().await;
    backend
        .send(ServerMessage::Transcript {
            speaker: interview_media::transport::Speaker::Assistant,
            text: "Hello".to_string(),
            is_final: true,
        })
        .await
        .unwrap();
    backend
        .send(ServerMessage::Metrics {
            latency: [("tts_ms".to_string(), 95.0)].into_iter().collect(),
        })
        .await
        .unwrap();

    // Wait until both were applied
    for _ in 0..100 {
        if !handle.get_metrics().await.stages.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let state = AppState::with_session(handle);

    let response = create_router(state.clone())
        .oneshot(get("/session/transcript"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json[0]["text"], "Hello");
    assert_eq!(json[0]["speaker"], "assistant");
    assert_eq!(json[0]["final"], true);

    let response = create_router(state)
        .oneshot(get("/session/metrics"))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["stages"]["tts_ms"], 95.0);
}

#[tokio::test]
async fn test_commands_conflict_after_session_ended() {
    let (handle, mut backend, task) = listening_session().await;
    let state = AppState::with_session(handle.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/session/end")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"reason": "candidate_left"}"#))
        .unwrap();
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    assert_eq!(
        backend.recv().await,
        Some(ClientMessage::End {
            reason: "candidate_left".to_string()
        })
    );
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.stats.status, SessionStatus::Ended);

    let response = create_router(state.clone())
        .oneshot(post("/session/barge-in"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Status stays readable after the end
    let response = create_router(state).oneshot(get("/session/status")).await.unwrap();
    assert_eq!(body_json(response).await["status"], "ended");
}
