//! find_files tool — glob file discovery

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome};
use crate::tools::filter;
use codeloom_core::ToolCategory;
use globset::GlobBuilder;
use serde_json::{json, Value};
use tracing::debug;
use walkdir::WalkDir;

const DEFAULT_MAX_RESULTS: usize = 100;

pub struct FindFilesTool;

#[async_trait::async_trait]
impl Tool for FindFilesTool {
    fn name(&self) -> &str {
        "find_files"
    }

    fn description(&self) -> &str {
        "Find files matching a glob pattern (*, ** and ? are supported). \
         Skips dependency directories and lockfiles."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Search
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Glob pattern (e.g. '**/*.rs', 'src/*.ts')"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search in (default: working directory)"
                },
                "maxResults": {
                    "type": "integer",
                    "description": "Stop after this many files (default: 100)"
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let pattern = match input["pattern"].as_str() {
            Some(p) if !p.is_empty() => p,
            _ => return ToolOutcome::error("Missing required parameter: pattern"),
        };
        let max_results = input["maxResults"]
            .as_u64()
            .map(|m| m as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .max(1);

        let glob = match GlobBuilder::new(pattern).literal_separator(false).build() {
            Ok(g) => g.compile_matcher(),
            Err(e) => return ToolOutcome::error(format!("Invalid glob pattern: {}", e)),
        };

        let search_path = input["path"].as_str().unwrap_or(".");
        let root = ctx.resolve(search_path);

        let mut files = Vec::new();
        let mut truncated = false;

        for entry in WalkDir::new(&root)
            .into_iter()
            .filter_entry(filter::keep_entry)
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || !filter::keep_file(entry.path()) {
                continue;
            }
            let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
            if !glob.is_match(rel) {
                continue;
            }
            if files.len() >= max_results {
                truncated = true;
                break;
            }
            let size = entry.metadata().ok().map(|m| m.len());
            files.push(json!({
                "path": ctx.display_path(entry.path()),
                "type": "file",
                "size": size,
            }));
        }

        debug!("find_files: '{}' → {} files", pattern, files.len());
        ToolOutcome::Json(json!({
            "pattern": pattern,
            "searchPath": search_path,
            "fileCount": files.len(),
            "files": files,
            "engine": "builtin",
            "truncated": truncated,
        }))
    }
}
