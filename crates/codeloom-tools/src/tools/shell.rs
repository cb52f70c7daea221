//! run_shell tool — shell execution behind a forbidden-pattern screen

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome};
use codeloom_core::ToolCategory;
use regex::Regex;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{debug, warn};

const TIMEOUT_SECS: u64 = 30;
const STDOUT_CAP_BYTES: usize = 1_000_000;

/// Commands that are refused outright, screened before any subprocess is
/// spawned. The set is closed; a match fails the tool call.
const FORBIDDEN_PATTERNS: &[&str] = &[
    // rm -rf on the filesystem root or the home directory (scoped paths
    // like /tmp/foo or ~/project stay allowed)
    r"\brm\s+(-[a-zA-Z]+\s+)*-[a-zA-Z]*[rR][a-zA-Z]*\s+(/|~)(/)?(\s|\*|$|[;&|])",
    // classic fork bomb
    r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:",
    // filesystem creation / swap over raw devices
    r"\bmkfs(\.\w+)?\b",
    r"\bmkswap\s+/dev/",
    // raw writes to block devices
    r"\bdd\s+[^|;]*\bof=/dev/[sh]d[a-z]",
    // world-writable root / recursive 777
    r"\bchmod\s+(-[a-zA-Z]+\s+)*777\s+/\s*$",
    r"\bchmod\s+-[a-zA-Z]*R[a-zA-Z]*\s+777\b",
    // piping a download straight into a shell
    r"\b(curl|wget)\b[^|;]*\|\s*(ba|z|da)?sh\b",
    // killing everything
    r"\bkill\s+-9\s+-1\b",
    r"\bkillall\s+-9\b",
    // host lifecycle
    r"\bshutdown\b",
    r"\breboot\b",
    r"\binit\s+[06]\b",
];

pub struct RunShellTool {
    patterns: Vec<Regex>,
}

impl Default for RunShellTool {
    fn default() -> Self {
        Self::new()
    }
}

impl RunShellTool {
    pub fn new() -> Self {
        let patterns = FORBIDDEN_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("forbidden pattern regex"))
            .collect();
        Self { patterns }
    }

    fn screen(&self, command: &str) -> Option<&Regex> {
        self.patterns.iter().find(|p| p.is_match(command))
    }
}

fn cap_stdout(mut s: String) -> String {
    if s.len() > STDOUT_CAP_BYTES {
        let mut cut = STDOUT_CAP_BYTES;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        let total = s.len();
        s.truncate(cut);
        s.push_str(&format!("\n… [truncated, {} total bytes]", total));
    }
    s
}

#[async_trait::async_trait]
impl Tool for RunShellTool {
    fn name(&self) -> &str {
        "run_shell"
    }

    fn description(&self) -> &str {
        "Run a shell command in the working directory. Captures stdout, \
         stderr and the exit code; destructive commands are refused."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Shell
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute"
                },
                "cwd": {
                    "type": "string",
                    "description": "Working directory for the command (default: session working directory)"
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let command = match input["command"].as_str() {
            Some(c) if !c.trim().is_empty() => c,
            _ => return ToolOutcome::error("Missing required parameter: command"),
        };

        if self.screen(command).is_some() {
            warn!("run_shell blocked: {}", command);
            return ToolOutcome::error(format!("Dangerous command blocked: {}", command));
        }

        let cwd = input["cwd"]
            .as_str()
            .map(|c| ctx.resolve(c))
            .unwrap_or_else(|| ctx.working_dir.clone());

        debug!("run_shell: {}", command.chars().take(120).collect::<String>());

        let output = match tokio::time::timeout(
            std::time::Duration::from_secs(TIMEOUT_SECS),
            Command::new("bash")
                .arg("-c")
                .arg(command)
                .current_dir(&cwd)
                .output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return ToolOutcome::error(format!("Failed to execute: {}", e)),
            Err(_) => {
                return ToolOutcome::error(format!("Command timed out after {}s", TIMEOUT_SECS))
            }
        };

        let stdout = cap_stdout(String::from_utf8_lossy(&output.stdout).to_string());
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        ToolOutcome::Json(json!({
            "command": command,
            "cwd": cwd.display().to_string(),
            "stdout": stdout,
            "stderr": stderr,
            "exitCode": output.status.code().unwrap_or(-1),
        }))
    }
}
