use super::state::AppState;
use crate::session::ConnectionId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// How long a snapshot may wait behind a session that is finishing a stop
pub const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub count: usize,
    pub sessions: Vec<ConnectionId>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /sessions
/// List live voice sessions
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let sessions = state.sessions.ids().await;

    Json(SessionListResponse {
        count: sessions.len(),
        sessions,
    })
}

/// GET /sessions/:connection_id
/// Diagnostic snapshot of one session.
///
/// A session draining recognitions for `stop_speech` answers once the
/// drain completes; past `SNAPSHOT_TIMEOUT` this returns 503 instead.
pub async fn get_session(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
) -> impl IntoResponse {
    let id = ConnectionId::new(connection_id);

    match tokio::time::timeout(SNAPSHOT_TIMEOUT, state.sessions.snapshot(&id)).await {
        Ok(Some(snapshot)) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(_) => {
            warn!("Snapshot of session {} timed out", id);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: format!("Session {} is busy", id),
                }),
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} not found", id),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
