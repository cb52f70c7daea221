//! list_dir tool — flat directory listing

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome};
use codeloom_core::ToolCategory;
use serde_json::{json, Value};
use tokio::fs;
use tracing::debug;

pub struct ListDirTool;

#[async_trait::async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the entries of a directory. Returns each entry's name and \
         whether it is a file or a directory."
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
                    "description": "Directory to list, relative to the working directory"
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
        let mut reader = match fs::read_dir(&resolved).await {
            Ok(r) => r,
            Err(e) => return ToolOutcome::error(format!("Failed to list {}: {}", path, e)),
        };

        let mut entries = Vec::new();
        loop {
            match reader.next_entry().await {
                Ok(Some(entry)) => {
                    let kind = match entry.file_type().await {
                        Ok(t) if t.is_dir() => "dir",
                        Ok(_) => "file",
                        Err(_) => "file",
                    };
                    entries.push(json!({
                        "name": entry.file_name().to_string_lossy(),
                        "type": kind,
                    }));
                }
                Ok(None) => break,
                Err(e) => return ToolOutcome::error(format!("Failed to list {}: {}", path, e)),
            }
        }

        entries.sort_by(|a, b| {
            a["name"]
                .as_str()
                .unwrap_or_default()
                .cmp(b["name"].as_str().unwrap_or_default())
        });

        debug!("list_dir: {} ({} entries)", path, entries.len());
        ToolOutcome::Json(Value::Array(entries))
    }
}
