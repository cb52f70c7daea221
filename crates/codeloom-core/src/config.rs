//! Server configuration from environment variables.

use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4";
pub const DEFAULT_FAST_MODEL: &str = "anthropic/claude-3.5-haiku";

/// Configuration for the Codeloom server.
///
/// Every field has an environment variable; CLI flags on the server binary
/// override the environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// `PORT` (default 3001)
    pub port: u16,
    /// `CORS_ORIGIN` (default: the client dev server)
    pub cors_origin: String,
    /// `PROJECT_ROOT` (default: parent of the server's working directory)
    pub project_root: PathBuf,
    /// `MAX_TOKENS` — per-request completion cap (default 4096)
    pub max_tokens: u32,
    /// `OPENROUTER_API_KEY` — required to reach the LLM
    pub openrouter_api_key: Option<String>,
    /// `OPENROUTER_MODEL` (default `anthropic/claude-sonnet-4`)
    pub model: String,
    /// `OPENROUTER_FAST_MODEL` — lighter tier used for quick commands
    pub fast_model: String,
    /// `CODELOOM_DB` — SQLite database path (default `codeloom.db`)
    pub db_path: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let project_root = std::env::var("PROJECT_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                cwd.parent().map(PathBuf::from).unwrap_or(cwd)
            });

        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            cors_origin: std::env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            project_root,
            max_tokens: std::env::var("MAX_TOKENS")
                .ok()
                .and_then(|m| m.parse().ok())
                .unwrap_or(4096),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok(),
            model: std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            fast_model: std::env::var("OPENROUTER_FAST_MODEL")
                .unwrap_or_else(|_| DEFAULT_FAST_MODEL.to_string()),
            db_path: std::env::var("CODELOOM_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("codeloom.db")),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3001,
            cors_origin: "http://localhost:5173".to_string(),
            project_root: PathBuf::from("."),
            max_tokens: 4096,
            openrouter_api_key: None,
            model: DEFAULT_MODEL.to_string(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            db_path: PathBuf::from("codeloom.db"),
        }
    }
}
