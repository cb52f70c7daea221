//! edit_file tool — ordered find-and-replace edits with per-edit accounting

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome};
use codeloom_core::ToolCategory;
use serde_json::{json, Value};
use tokio::fs;
use tracing::debug;

const SNIPPET_CHARS: usize = 50;

pub struct EditFileTool;

fn snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_CHARS {
        let cut: String = text.chars().take(SNIPPET_CHARS).collect();
        format!("{}…", cut)
    } else {
        text.to_string()
    }
}

#[async_trait::async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Apply a list of exact-text edits to a file, in order. Each edit \
         replaces every occurrence of old_text with new_text. An edit whose \
         old_text is not found aborts the whole operation."
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
                    "description": "Path to the file to edit"
                },
                "edits": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "old_text": { "type": "string" },
                            "new_text": { "type": "string" }
                        },
                        "required": ["old_text", "new_text"]
                    },
                    "description": "Edits applied in order; each replaces all occurrences"
                }
            },
            "required": ["path", "edits"]
        })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let path = match input["path"].as_str() {
            Some(p) => p,
            None => return ToolOutcome::error("Missing required parameter: path"),
        };
        let edits = match input["edits"].as_array() {
            Some(e) if !e.is_empty() => e,
            Some(_) => return ToolOutcome::error("edits must not be empty"),
            None => return ToolOutcome::error("Missing required parameter: edits"),
        };

        let resolved = ctx.resolve(path);
        let original = match fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) => return ToolOutcome::error(format!("Failed to read {}: {}", path, e)),
        };

        let mut current = original.clone();
        let mut details = Vec::with_capacity(edits.len());
        let mut total_replacements = 0usize;

        for (i, edit) in edits.iter().enumerate() {
            let old = match edit["old_text"].as_str() {
                Some(o) if !o.is_empty() => o,
                _ => {
                    return ToolOutcome::error(format!(
                        "Edit {} is missing a non-empty old_text",
                        i + 1
                    ))
                }
            };
            let new = match edit["new_text"].as_str() {
                Some(n) => n,
                None => {
                    return ToolOutcome::error(format!("Edit {} is missing new_text", i + 1))
                }
            };

            let count = current.matches(old).count();
            if count == 0 {
                return ToolOutcome::error(format!(
                    "Edit {} failed: old_text not found: \"{}\"",
                    i + 1,
                    snippet(old)
                ));
            }

            let warning = if count > 1 {
                Some(format!("Multiple occurrences ({}) were replaced", count))
            } else if !original.contains(old) {
                Some(
                    "old_text was not present in the original file; it was introduced by an earlier edit"
                        .to_string(),
                )
            } else {
                None
            };

            current = current.replace(old, new);
            total_replacements += count;

            let mut detail = json!({ "applied": true, "replacements": count });
            if let Some(w) = warning {
                detail["warning"] = json!(w);
            }
            details.push(detail);
        }

        if let Err(e) = fs::write(&resolved, &current).await {
            return ToolOutcome::error(format!("Failed to write {}: {}", path, e));
        }

        debug!(
            "edit_file: {} ({} edits, {} replacements)",
            path,
            details.len(),
            total_replacements
        );
        ToolOutcome::Json(json!({
            "path": ctx.display_path(&resolved),
            "oldContent": original,
            "newContent": current,
            "editsApplied": details.len(),
            "totalReplacements": total_replacements,
            "editDetails": details,
            "success": true,
        }))
    }
}
