//! Directory endpoints the client uses to populate its UI.

use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use codeloom_agent::command_directory;
use codeloom_core::config::{DEFAULT_FAST_MODEL, DEFAULT_MODEL};
use serde_json::json;

/// GET /api/tools — the full catalog with category grouping.
pub async fn get_tools(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tools: Vec<_> = state
        .registry
        .list()
        .iter()
        .map(|t| {
            json!({
                "name": t.name(),
                "description": t.description(),
                "category": t.category().as_str(),
                "highFrequency": t.high_frequency(),
                "inputSchema": t.input_schema(),
            })
        })
        .collect();
    let categories: Vec<_> = state
        .registry
        .categories()
        .iter()
        .map(|c| {
            json!({
                "category": c.category.as_str(),
                "description": c.description,
                "toolCount": c.tool_count,
                "tools": c.tools,
            })
        })
        .collect();
    Json(json!({ "tools": tools, "categories": categories }))
}

/// GET /api/models
pub async fn get_models(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut models = vec![json!({
        "id": state.config.model,
        "tier": "default",
        "default": true,
    })];
    if state.config.fast_model != state.config.model {
        models.push(json!({
            "id": state.config.fast_model,
            "tier": "fast",
            "default": false,
        }));
    }
    for id in [DEFAULT_MODEL, DEFAULT_FAST_MODEL] {
        if id != state.config.model && id != state.config.fast_model {
            models.push(json!({ "id": id, "tier": "catalog", "default": false }));
        }
    }
    Json(json!({ "models": models }))
}

/// GET /api/commands
pub async fn get_commands() -> Json<serde_json::Value> {
    let commands: Vec<_> = command_directory()
        .iter()
        .map(|c| json!({ "name": c.name, "description": c.description }))
        .collect();
    Json(json!({ "commands": commands }))
}
