//! Execution context handed to every tool handler.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Per-turn capability context. Carries the session's working directory and
/// the mutable loaded-tool set; handlers receive no ambient state beyond it.
#[derive(Clone, Debug)]
pub struct ToolContext {
    pub working_dir: PathBuf,
    pub loaded_tools: HashSet<String>,
}

impl ToolContext {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            loaded_tools: HashSet::new(),
        }
    }

    pub fn with_loaded(working_dir: impl Into<PathBuf>, loaded_tools: HashSet<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            loaded_tools,
        }
    }

    /// Resolve a model-supplied path against the working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.working_dir.join(p)
        }
    }

    /// Render a path relative to the working directory for tool output.
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.working_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }
}
