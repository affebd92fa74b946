//! HTTP request handlers

use super::types::{
    ClearResponse, ErrorResponse, EventRequest, OutboxResponse, QueuedResponse, SessionResponse,
    StatusResponse,
};
use super::AppState;
use crate::request::Requester;
use crate::runtime::Inbound;
use crate::session::ConversationId;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Inbound chat events
        .route("/api/conversations/:id/events", post(post_event))
        // Outbound replies, drained on read
        .route("/api/conversations/:id/prompts", get(get_prompts))
        // Current session snapshot, or discard it
        .route(
            "/api/conversations/:id",
            get(get_session).delete(clear_session),
        )
        .route("/api/status", get(get_status))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

fn conversation_id(raw: &str) -> Result<ConversationId, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Conversation id must not be empty".to_string(),
        ));
    }
    Ok(ConversationId::new(trimmed))
}

// ============================================================
// Events
// ============================================================

async fn post_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EventRequest>,
) -> Result<(StatusCode, Json<QueuedResponse>), AppError> {
    let conversation = conversation_id(&id)?;
    let event = req.payload.into_event().map_err(AppError::BadRequest)?;
    let requester = req
        .requester
        .unwrap_or_else(|| Requester::new(conversation.as_str()));

    tracing::debug!(conversation_id = %conversation, event = event.kind(), "Event received");

    state
        .transport
        .enqueue(Inbound {
            conversation,
            requester,
            event,
        })
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { queued: true })))
}

async fn get_prompts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OutboxResponse>, AppError> {
    let conversation = conversation_id(&id)?;
    Ok(Json(OutboxResponse {
        messages: state.transport.drain(&conversation),
    }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let conversation = conversation_id(&id)?;
    Ok(Json(SessionResponse {
        session: state.store.fetch(&conversation).await,
    }))
}

async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClearResponse>, AppError> {
    let conversation = conversation_id(&id)?;
    let cleared = state.store.clear(&conversation).await.is_some();
    if cleared {
        tracing::info!(conversation_id = %conversation, "Session discarded over the API");
    }
    Ok(Json(ClearResponse { cleared }))
}

async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        active_sessions: state.store.active().await,
    })
}

async fn get_version() -> &'static str {
    concat!("supply-desk ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
