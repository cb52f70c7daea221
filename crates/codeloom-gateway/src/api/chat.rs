//! Chat endpoints — start a turn, continue a session, stream its events.

use crate::state::{ApiError, AppState};
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use codeloom_agent::{SessionHandle, TurnOptions};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    pub message: String,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueBody {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub command: Option<String>,
}

fn turn_options(message: String, model: Option<String>, command: Option<String>) -> TurnOptions {
    TurnOptions {
        model,
        command,
        ..TurnOptions::new(message)
    }
}

fn spawn_turn(state: &AppState, handle: Arc<SessionHandle>, opts: TurnOptions) {
    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.run_turn(handle, opts).await;
    });
}

/// POST /api/chat — create a session and launch its first turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = state.manager.create_session(
        body.working_dir.map(PathBuf::from),
        &state.config.project_root,
    )?;
    let session_id = handle.id.to_string();
    let working_dir = handle.working_dir();

    spawn_turn(
        &state,
        handle,
        turn_options(body.message, body.model, body.command),
    );

    Ok(Json(json!({
        "sessionId": session_id,
        "workingDir": working_dir.display().to_string(),
    })))
}

/// POST /api/chat/:id — continue an existing session with a new message.
pub async fn chat_continue(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ContinueBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let handle = state.manager.prepare_for_continuation(&id)?;
    let working_dir = handle.working_dir();

    spawn_turn(
        &state,
        handle,
        turn_options(body.message, body.model, body.command),
    );

    Ok(Json(json!({
        "sessionId": id,
        "workingDir": working_dir.display().to_string(),
    })))
}

/// GET /api/stream/:id — SSE stream of the session's current turn. Replays
/// the turn from its first event, then closes after `done`.
pub async fn stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state
        .manager
        .get_session(&id)?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {}", id)))?;

    let mut subscriber = handle.bus().subscribe();
    debug!(session = %id, "sse subscriber attached");

    let stream = async_stream::stream! {
        while let Some(event) = subscriber.next().await {
            let done = event.is_terminal();
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            yield Ok::<_, Infallible>(Event::default().event(event.event_name()).data(data));
            if done {
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// POST /api/stop/:id — cancel the running turn.
pub async fn stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<serde_json::Value> {
    let success = state.manager.cancel(&id);
    Json(json!({ "success": success }))
}
