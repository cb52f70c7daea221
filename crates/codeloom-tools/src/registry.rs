//! Tool registry and trait definitions
//!
//! Each tool is a self-contained module implementing the Tool trait.
//! The registry is the canonical catalog, indexed by name and by category,
//! and is append-only after startup.

use crate::context::ToolContext;
use codeloom_core::ToolCategory;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Clone, Debug)]
pub enum ToolOutcome {
    Text(String),
    Json(Value),
    Error(String),
}

impl ToolOutcome {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        Self::Error(s.into())
    }

    /// Serialize for the LLM: errors as `Error: <message>`, nulls as
    /// `"null"`, strings as-is, anything else pretty-printed JSON.
    pub fn to_content_string(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Json(Value::Null) => "null".to_string(),
            Self::Json(Value::String(s)) => s.clone(),
            Self::Json(v) => serde_json::to_string_pretty(v).unwrap_or_default(),
            Self::Error(e) => format!("Error: {}", e),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("tool name collision: {0}")]
    DuplicateName(String),
}

/// The Tool trait — implement this to add a new capability.
///
/// Each tool is a standalone unit registered with a ToolRegistry. To add a
/// new tool: create a file in tools/, implement this trait, register it in
/// default_registry().
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g. "read_file", "grep").
    fn name(&self) -> &str;

    /// Human-readable description sent to the LLM.
    fn description(&self) -> &str;

    /// Catalog category. `Meta` tools bypass the loaded-tool gate.
    fn category(&self) -> ToolCategory;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> Value;

    /// Whether the model should prefer this tool for everyday work.
    fn high_frequency(&self) -> bool {
        false
    }

    /// Execute the tool with parsed input and the session context.
    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome;
}

/// Summary of one category, as served by the `load_tools` directory listing
/// and `GET /tools`.
#[derive(Clone, Debug)]
pub struct CategoryInfo {
    pub category: ToolCategory,
    pub description: &'static str,
    pub tool_count: usize,
    pub tools: Vec<String>,
}

pub fn category_description(category: ToolCategory) -> &'static str {
    match category {
        ToolCategory::FileOps => "Read, write, edit and list files in the working directory",
        ToolCategory::Git => "Inspect the git repository: diff, status, log",
        ToolCategory::Search => "Search file contents and find files by pattern",
        ToolCategory::Shell => "Run shell commands with safety screening",
        ToolCategory::Meta => "Inspect and load tool categories",
    }
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Names are globally unique; a collision is an error.
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.tools.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// All tools, sorted by name.
    pub fn list(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<_> = self.tools.values().cloned().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tools in one category, sorted by name.
    pub fn by_category(&self, category: ToolCategory) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<_> = self
            .tools
            .values()
            .filter(|t| t.category() == category)
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Every non-empty category, sorted by category name.
    pub fn categories(&self) -> Vec<CategoryInfo> {
        let mut by_cat: HashMap<ToolCategory, Vec<String>> = HashMap::new();
        for tool in self.tools.values() {
            by_cat
                .entry(tool.category())
                .or_default()
                .push(tool.name().to_string());
        }
        let mut infos: Vec<CategoryInfo> = by_cat
            .into_iter()
            .map(|(category, mut tools)| {
                tools.sort();
                CategoryInfo {
                    category,
                    description: category_description(category),
                    tool_count: tools.len(),
                    tools,
                }
            })
            .collect();
        infos.sort_by(|a, b| a.category.as_str().cmp(b.category.as_str()));
        infos
    }

    /// The view of the catalog a session is authorized to use: every meta
    /// tool plus every tool whose name is in `loaded`. Sorted by name.
    pub fn loaded_view(&self, loaded: &std::collections::HashSet<String>) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<_> = self
            .tools
            .values()
            .filter(|t| t.category() == ToolCategory::Meta || loaded.contains(t.name()))
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }
}
