//! Git tools — diff, status, log via the git binary
//!
//! Every invocation uses an explicit argument array (no shell interpolation),
//! a bounded timeout, and a capped output size.

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome};
use codeloom_core::ToolCategory;
use serde_json::{json, Value};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

const OUTPUT_CAP_BYTES: usize = 5_000_000;

struct GitOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

async fn run_git(args: &[&str], cwd: &Path, timeout_secs: u64) -> Result<GitOutput, String> {
    debug!("git {:?} in {}", args, cwd.display());
    let output = match tokio::time::timeout(
        std::time::Duration::from_secs(timeout_secs),
        Command::new("git").args(args).current_dir(cwd).output(),
    )
    .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(format!("Failed to run git: {}", e)),
        Err(_) => return Err(format!("git {} timed out after {}s", args[0], timeout_secs)),
    };

    Ok(GitOutput {
        stdout: cap_output(String::from_utf8_lossy(&output.stdout).to_string()),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        success: output.status.success(),
    })
}

fn cap_output(mut s: String) -> String {
    if s.len() > OUTPUT_CAP_BYTES {
        let mut cut = OUTPUT_CAP_BYTES;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        let total = s.len();
        s.truncate(cut);
        s.push_str(&format!("\n… [truncated, {} total bytes]", total));
    }
    s
}

fn stderr_field(out: &GitOutput) -> Option<String> {
    if out.stderr.is_empty() {
        None
    } else {
        Some(out.stderr.clone())
    }
}

// ── git_diff ───────────────────────────────────────────────────────────

pub struct GitDiffTool;

#[async_trait::async_trait]
impl Tool for GitDiffTool {
    fn name(&self) -> &str {
        "git_diff"
    }

    fn description(&self) -> &str {
        "Show uncommitted changes in the working tree. Set staged to true for \
         the index diff; pass a path to narrow the diff."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Git
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "staged": {
                    "type": "boolean",
                    "description": "Diff the index instead of the working tree"
                },
                "path": {
                    "type": "string",
                    "description": "Limit the diff to this path"
                }
            }
        })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let mut args = vec!["diff"];
        if input["staged"].as_bool().unwrap_or(false) {
            args.push("--cached");
        }
        let path = input["path"].as_str();
        if let Some(p) = path {
            args.push("--");
            args.push(p);
        }

        let out = match run_git(&args, &ctx.working_dir, 30).await {
            Ok(o) => o,
            Err(e) => return ToolOutcome::error(e),
        };
        if !out.success {
            return ToolOutcome::error(format!("git diff failed: {}", out.stderr));
        }

        let has_changes = !out.stdout.trim().is_empty();
        let stderr = stderr_field(&out);
        ToolOutcome::Json(json!({
            "command": format!("git {}", args.join(" ")),
            "cwd": ctx.working_dir.display().to_string(),
            "diff": out.stdout,
            "hasChanges": has_changes,
            "stderr": stderr,
        }))
    }
}

// ── git_status ─────────────────────────────────────────────────────────

pub struct GitStatusTool;

#[async_trait::async_trait]
impl Tool for GitStatusTool {
    fn name(&self) -> &str {
        "git_status"
    }

    fn description(&self) -> &str {
        "Show the short-format repository status including the current branch."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Git
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let args = ["status", "--short", "--branch"];
        let out = match run_git(&args, &ctx.working_dir, 10).await {
            Ok(o) => o,
            Err(e) => return ToolOutcome::error(e),
        };
        if !out.success {
            return ToolOutcome::error(format!("git status failed: {}", out.stderr));
        }

        // First line is the branch header; anything after it is a change.
        let has_changes = out.stdout.lines().skip(1).any(|l| !l.trim().is_empty());
        let stderr = stderr_field(&out);
        ToolOutcome::Json(json!({
            "command": "git status --short --branch",
            "cwd": ctx.working_dir.display().to_string(),
            "status": out.stdout,
            "hasChanges": has_changes,
            "stderr": stderr,
        }))
    }
}

// ── git_log ────────────────────────────────────────────────────────────

pub struct GitLogTool;

#[async_trait::async_trait]
impl Tool for GitLogTool {
    fn name(&self) -> &str {
        "git_log"
    }

    fn description(&self) -> &str {
        "Show recent commits, one line each. Defaults to the last 10."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Git
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "count": {
                    "type": "integer",
                    "description": "Number of commits to show (default 10, max 100)"
                }
            }
        })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let count = input["count"].as_u64().unwrap_or(10).clamp(1, 100);
        let count_arg = count.to_string();
        let args = ["log", "--oneline", "-n", &count_arg];

        let out = match run_git(&args, &ctx.working_dir, 15).await {
            Ok(o) => o,
            Err(e) => return ToolOutcome::error(e),
        };
        if !out.success {
            return ToolOutcome::error(format!("git log failed: {}", out.stderr));
        }

        let stderr = stderr_field(&out);
        ToolOutcome::Json(json!({
            "command": format!("git log --oneline -n {}", count),
            "cwd": ctx.working_dir.display().to_string(),
            "log": out.stdout,
            "stderr": stderr,
        }))
    }
}
