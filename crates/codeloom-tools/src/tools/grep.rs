//! grep tool — content search, literal by default

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome};
use crate::tools::filter;
use codeloom_core::ToolCategory;
use regex::RegexBuilder;
use serde_json::{json, Value};
use tracing::debug;
use walkdir::WalkDir;

const DEFAULT_MAX_RESULTS: usize = 50;

pub struct GrepTool;

#[async_trait::async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search file contents for a pattern. The pattern is matched literally \
         unless regex is true. Skips dependency directories, lockfiles and \
         binary files. Stops after maxResults matches."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Search
    }

    fn high_frequency(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Text or regex to search for"
                },
                "path": {
                    "type": "string",
                    "description": "File or directory to search (default: working directory)"
                },
                "regex": {
                    "type": "boolean",
                    "description": "Treat pattern as a regular expression (default: false)"
                },
                "caseSensitive": {
                    "type": "boolean",
                    "description": "Match case exactly (default: false)"
                },
                "maxResults": {
                    "type": "integer",
                    "description": "Stop after this many matches (default: 50)"
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
        let is_regex = input["regex"].as_bool().unwrap_or(false);
        let case_sensitive = input["caseSensitive"].as_bool().unwrap_or(false);
        let max_results = input["maxResults"]
            .as_u64()
            .map(|m| m as usize)
            .unwrap_or(DEFAULT_MAX_RESULTS)
            .max(1);

        let source = if is_regex {
            pattern.to_string()
        } else {
            regex::escape(pattern)
        };
        let matcher = match RegexBuilder::new(&source)
            .case_insensitive(!case_sensitive)
            .build()
        {
            Ok(r) => r,
            Err(e) => return ToolOutcome::error(format!("Invalid regex: {}", e)),
        };

        let search_path = input["path"].as_str().unwrap_or(".");
        let root = ctx.resolve(search_path);

        let mut matches = Vec::new();
        let mut truncated = false;

        'walk: for entry in WalkDir::new(&root)
            .into_iter()
            .filter_entry(filter::keep_entry)
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || !filter::keep_file(entry.path()) {
                continue;
            }
            let content = match std::fs::read_to_string(entry.path()) {
                Ok(c) => c,
                Err(_) => continue,
            };
            for (line_no, line) in content.lines().enumerate() {
                if matcher.is_match(line) {
                    if matches.len() >= max_results {
                        truncated = true;
                        break 'walk;
                    }
                    matches.push(json!({
                        "file": ctx.display_path(entry.path()),
                        "line": line_no + 1,
                        "content": line.trim_end(),
                    }));
                }
            }
        }

        debug!("grep: '{}' → {} matches", pattern, matches.len());
        ToolOutcome::Json(json!({
            "pattern": pattern,
            "searchPath": search_path,
            "matchCount": matches.len(),
            "matches": matches,
            "engine": "builtin",
            "truncated": truncated,
        }))
    }
}
