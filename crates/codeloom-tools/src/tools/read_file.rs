//! read_file tool — UTF-8 text read

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome};
use codeloom_core::ToolCategory;
use serde_json::{json, Value};
use tokio::fs;
use tracing::debug;

pub struct ReadFileTool;

#[async_trait::async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a UTF-8 text file. The path is resolved relative \
         to the session's working directory."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::FileOps
    }

    fn high_frequency(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file, relative to the working directory"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let path = match input["path"].as_str() {
            Some(p) => p,
            None => return ToolOutcome::error("Missing required parameter: path"),
        };

        let resolved = ctx.resolve(path);
        let content = match fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) => return ToolOutcome::error(format!("Failed to read {}: {}", path, e)),
        };

        debug!("read_file: {} ({} bytes)", path, content.len());
        ToolOutcome::Json(json!({
            "path": ctx.display_path(&resolved),
            "content": content,
        }))
    }
}
