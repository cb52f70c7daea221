//! write_file tool — create or overwrite a file

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome};
use codeloom_core::ToolCategory;
use serde_json::{json, Value};
use tokio::fs;
use tracing::debug;

pub struct WriteFileTool;

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write UTF-8 content to a file, creating parent directories as needed. \
         Overwrites the file if it exists. Prefer edit_file for modifications."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FileOps
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Content to write"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let path = match input["path"].as_str() {
            Some(p) => p,
            None => return ToolOutcome::error("Missing required parameter: path"),
        };
        let content = match input["content"].as_str() {
            Some(c) => c,
            None => return ToolOutcome::error("Missing required parameter: content"),
        };

        let resolved = ctx.resolve(path);
        if let Some(parent) = resolved.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return ToolOutcome::error(format!("Failed to create directories: {}", e));
            }
        }

        match fs::write(&resolved, content).await {
            Ok(()) => {
                debug!("write_file: {} ({} bytes)", path, content.len());
                ToolOutcome::Json(json!({
                    "path": ctx.display_path(&resolved),
                    "status": "ok",
                }))
            }
            Err(e) => ToolOutcome::error(format!("Failed to write {}: {}", path, e)),
        }
    }
}
