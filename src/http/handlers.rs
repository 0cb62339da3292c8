use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::AppState;
use crate::session::{CandidateContext, Session, SessionConfig, SessionKind, SessionState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub kind: SessionKind,
    pub candidate: CandidateContext,
    /// Optional session ID (if not provided, generate one)
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub state: SessionState,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(session_id: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("session {session_id} not found"),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/start
/// Start a new call or interview session
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let mut config = SessionConfig::new(req.kind, req.candidate);
    if let Some(session_id) = req.session_id {
        config.session_id = session_id;
    }
    config.finalize_timeout = state.defaults.finalize_timeout;
    config.emotion_interval = state.defaults.emotion_interval;

    let session_id = config.session_id.clone();
    info!(session_id, "starting session");

    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("session {session_id} already exists"),
                }),
            )
                .into_response();
        }
    }

    let session = Arc::new(Session::new(config, state.deps.clone()));
    session.start();

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), Arc::clone(&session));
    }

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id,
            state: session.state(),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/stop
/// Stop a running session; finalization continues in the background
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    match session {
        Some(session) => {
            session.stop().await;
            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    session_id,
                    state: session.state(),
                }),
            )
                .into_response()
        }
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/status
pub async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.stats())).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/transcript
pub async fn get_session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.transcript())).into_response(),
        None => not_found(&session_id),
    }
}

/// GET /sessions/:session_id/result
/// Terminal outcome; 404 until the session reaches `Ended`
pub async fn get_session_result(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    match sessions.get(&session_id) {
        Some(session) => match session.outcome() {
            Some(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
            None => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!(
                        "session {session_id} has no result yet (state: {:?})",
                        session.state()
                    ),
                }),
            )
                .into_response(),
        },
        None => not_found(&session_id),
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
