use super::state::{AppState, LogListener};
use crate::business::{BusinessConfig, Tone, Voice};
use crate::error::{ErrorCategory, SessionError};
use crate::session::{ConnectionState, SessionStats, StartOptions};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartCallRequest {
    /// Optional call ID (if not provided, generate UUID)
    pub call_id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub industry: String,

    pub tone: Tone,

    pub voice: Voice,

    #[serde(default)]
    pub instructions: String,

    #[serde(default)]
    pub use_demo_assistant: bool,
}

impl StartCallRequest {
    fn business(&self) -> BusinessConfig {
        BusinessConfig {
            name: self.name.clone(),
            industry: self.industry.clone(),
            tone: self.tone,
            voice: self.voice,
            instructions: self.instructions.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StartCallResponse {
    pub call_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopCallResponse {
    pub call_id: String,
    pub status: String,
    pub message: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub category: String,
}

fn error_response(status: StatusCode, error: String, category: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error,
            category: category.to_string(),
        }),
    )
        .into_response()
}

fn session_error_response(e: &SessionError) -> Response {
    let status = match e.category() {
        ErrorCategory::Permission => StatusCode::FORBIDDEN,
        ErrorCategory::Configuration => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCategory::Provisioning | ErrorCategory::Connection => StatusCode::BAD_GATEWAY,
        ErrorCategory::TransientStream => StatusCode::BAD_GATEWAY,
        ErrorCategory::Cancelled => StatusCode::CONFLICT,
    };

    error_response(status, e.to_string(), e.category().as_str())
}

fn not_found(call_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Call {} not found", call_id),
        "NOT_FOUND",
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /calls/start
/// Start a new call
pub async fn start_call(
    State(state): State<AppState>,
    Json(req): Json<StartCallRequest>,
) -> impl IntoResponse {
    let call_id = req
        .call_id
        .clone()
        .unwrap_or_else(|| format!("call-{}", uuid::Uuid::new_v4()));

    info!("Starting call: {}", call_id);

    let handle = state
        .bridge
        .new_session(Arc::new(LogListener::new(call_id.clone())));

    // Registered before starting so a stop request can cancel a slow start
    {
        let mut sessions = state.sessions.write().await;
        // Calls the remote side ended stay registered until here
        sessions.retain(|_, h| h.state() != ConnectionState::Closed);
        if sessions.contains_key(&call_id) {
            return error_response(
                StatusCode::CONFLICT,
                format!("Call {} is already in progress", call_id),
                ErrorCategory::Cancelled.as_str(),
            );
        }
        sessions.insert(call_id.clone(), handle.clone());
    }

    let options = StartOptions {
        use_demo_assistant: req.use_demo_assistant,
    };

    if let Err(e) = state.bridge.start(&handle, &req.business(), options).await {
        error!("Failed to start call {}: {}", call_id, e);
        let mut sessions = state.sessions.write().await;
        // A newer call may already have claimed the id
        if sessions.get(&call_id).is_some_and(|h| h.id() == handle.id()) {
            sessions.remove(&call_id);
        }
        return session_error_response(&e);
    }

    info!("Call started successfully: {}", call_id);

    (
        StatusCode::OK,
        Json(StartCallResponse {
            call_id: call_id.clone(),
            status: handle.state().as_str().to_string(),
            message: format!("Call {} started", call_id),
        }),
    )
        .into_response()
}

/// POST /calls/stop/:call_id
/// Stop a call
pub async fn stop_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping call: {}", call_id);

    let handle = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&call_id)
    };

    let Some(handle) = handle else {
        error!("Call {} not found", call_id);
        return not_found(&call_id);
    };

    handle.stop().await;
    info!("Call stopped successfully: {}", call_id);

    (
        StatusCode::OK,
        Json(StopCallResponse {
            call_id: call_id.clone(),
            status: handle.state().as_str().to_string(),
            message: "Call stopped".to_string(),
            stats: handle.stats(),
        }),
    )
        .into_response()
}

/// GET /calls/:call_id/status
pub async fn get_call_status(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&call_id) {
        Some(handle) => (StatusCode::OK, Json(handle.stats())).into_response(),
        None => not_found(&call_id),
    }
}

/// GET /calls/:call_id/transcript
/// Committed history plus the line still being spoken
pub async fn get_call_transcript(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&call_id) {
        Some(handle) => (StatusCode::OK, Json(handle.transcript())).into_response(),
        None => not_found(&call_id),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
