//! HTTP handlers.
//!
//! Endpoints:
//!
//! - `GET  /`: Liveness message
//! - `POST /chat`: Send a message, get the reply and conversation id

use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use kai_agent::ChatError;

use crate::SharedState;

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// The user's message (at least one character).
    pub message: String,
    /// Existing conversation ID (omit or null to start a new one).
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub conversation_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// An error response with a `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn validation(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        let status = match &err {
            ChatError::EmptyMessage => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::MissingCredential { .. } => {
                error!(error = %err, "Chat request rejected: no upstream credential");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ChatError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ChatError::Session(_) => {
                error!(error = %err, "Session store failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Kai backend is running. POST to /chat with {'message': '...'}".into(),
    })
}

pub(crate) async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(status = %rejection.status(), "Rejected /chat body");
        ApiError::validation(rejection.body_text())
    })?;

    if payload.message.is_empty() {
        return Err(ApiError::validation("message: must contain at least 1 character"));
    }

    let reply = state
        .chat
        .chat(&payload.message, payload.conversation_id.as_deref())
        .await?;

    Ok(Json(ChatResponse {
        reply: reply.reply,
        conversation_id: reply.conversation_id.to_string(),
    }))
}
