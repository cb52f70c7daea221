//! Session CRUD and listing endpoints.

use crate::state::{ApiError, AppState};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;

const DEFAULT_PAGE_SIZE: u64 = 20;

/// GET /api/session/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let record = state
        .store
        .get_session(&id)?
        .ok_or_else(|| ApiError::not_found(format!("session not found: {}", id)))?;
    let message_count = state.store.count_messages(&id)?;

    Ok(Json(json!({
        "id": record.id,
        "status": record.status,
        "workingDir": record.working_dir,
        "title": record.title,
        "currentPlan": record.current_plan,
        "createdAt": record.created_at,
        "updatedAt": record.updated_at,
        "messageCount": message_count,
        "totalTokens": record.total_tokens,
    })))
}

/// GET /api/session/:id/messages
pub async fn get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.store.get_session(&id)?.is_none() {
        return Err(ApiError::not_found(format!("session not found: {}", id)));
    }
    let messages = state.store.list_messages(&id)?;
    Ok(Json(json!({ "messages": messages })))
}

#[derive(Debug, Deserialize)]
pub struct PatchSessionBody {
    pub title: Option<String>,
}

/// PATCH /api/session/:id
pub async fn patch_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PatchSessionBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.store.get_session(&id)?.is_none() {
        return Err(ApiError::not_found(format!("session not found: {}", id)));
    }
    match body.title {
        Some(title) if !title.trim().is_empty() => {
            state.store.update_session_title(&id, title.trim())?;
        }
        Some(_) => return Err(ApiError::bad_request("title must not be empty")),
        None => {}
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchCwdBody {
    pub working_dir: String,
}

/// PATCH /api/session/:id/cwd — takes effect from the next turn; an
/// in-flight turn keeps the directory it started with.
pub async fn patch_cwd(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PatchCwdBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if body.working_dir.trim().is_empty() {
        return Err(ApiError::bad_request("workingDir must not be empty"));
    }
    if state.store.get_session(&id)?.is_none() {
        return Err(ApiError::not_found(format!("session not found: {}", id)));
    }
    state.store.update_session_working_dir(&id, &body.working_dir)?;
    if let Some(handle) = state.manager.get_session(&id)? {
        handle.set_working_dir(PathBuf::from(&body.working_dir));
    }
    Ok(Json(json!({ "success": true, "workingDir": body.working_dir })))
}

#[derive(Debug, Deserialize)]
pub struct PatchPlanBody {
    pub plan: Option<String>,
}

/// PATCH /api/session/:id/plan — set or clear the session's current plan.
pub async fn patch_plan(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PatchPlanBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.store.get_session(&id)?.is_none() {
        return Err(ApiError::not_found(format!("session not found: {}", id)));
    }
    state.store.update_session_plan(&id, body.plan.as_deref())?;
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/session/:id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.manager.delete_session(&id)?;
    if !deleted {
        return Err(ApiError::not_found(format!("session not found: {}", id)));
    }
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// GET /api/sessions?limit&offset
pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);
    let offset = query.offset.unwrap_or(0);
    let (sessions, total) = state.store.list_sessions(limit, offset)?;

    Ok(Json(json!({
        "sessions": sessions,
        "total": total,
        "limit": limit,
        "offset": offset,
        "hasMore": offset + (sessions.len() as u64) < total,
    })))
}
