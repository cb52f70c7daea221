//! Shared application state handed to every route handler.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use codeloom_agent::{Orchestrator, SessionError, SessionManager};
use codeloom_core::ServerConfig;
use codeloom_store::{SessionStore, StoreError};
use codeloom_tools::ToolRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<ToolRegistry>,
    pub store: Arc<SessionStore>,
    pub config: Arc<ServerConfig>,
}

/// HTTP error surface: a status code plus a short `error` string.
/// Validation failures never touch the event bus.
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: what.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: e.to_string(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(id) => Self::not_found(format!("session not found: {}", id)),
            SessionError::Busy(id) => {
                Self::conflict(format!("session {} already has a turn running", id))
            }
            SessionError::Store(e) => e.into(),
        }
    }
}
