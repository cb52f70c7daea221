//! load_tools tool — the meta tool that opens tool categories to a session
//!
//! Only meta tools are visible when a session starts; the model calls
//! load_tools to discover categories and pull the ones it needs into the
//! session's loaded set.

use crate::context::ToolContext;
use crate::registry::{Tool, ToolOutcome, ToolRegistry};
use codeloom_core::ToolCategory;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Late-bound handle to the registry that owns this tool. The registry
/// cannot hold an Arc to itself, so the handle is filled in after
/// construction (see `build_default_catalog`).
pub type CatalogHandle = Arc<RwLock<Option<Arc<ToolRegistry>>>>;

pub fn catalog_handle() -> CatalogHandle {
    Arc::new(RwLock::new(None))
}

pub struct LoadToolsTool {
    catalog: CatalogHandle,
}

impl LoadToolsTool {
    pub fn new(catalog: CatalogHandle) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl Tool for LoadToolsTool {
    fn name(&self) -> &str {
        "load_tools"
    }

    fn description(&self) -> &str {
        "List the available tool categories, or load every tool in one \
         category into this session. Call without arguments to see what \
         categories exist."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Meta
    }

    fn high_frequency(&self) -> bool {
        true
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "enum": ["file_ops", "git", "search", "shell"],
                    "description": "Category to load; omit to list categories"
                }
            }
        })
    }

    async fn execute(&self, input: Value, ctx: &mut ToolContext) -> ToolOutcome {
        let guard = self.catalog.read().await;
        let registry = match guard.as_ref() {
            Some(r) => r,
            None => return ToolOutcome::error("Tool catalog is not initialized"),
        };

        let category = match input["category"].as_str() {
            None => {
                // Directory listing: every category except meta itself.
                let categories: Vec<Value> = registry
                    .categories()
                    .into_iter()
                    .filter(|c| c.category != ToolCategory::Meta)
                    .map(|c| {
                        json!({
                            "category": c.category.as_str(),
                            "description": c.description,
                            "toolCount": c.tool_count,
                            "tools": c.tools,
                        })
                    })
                    .collect();
                return ToolOutcome::Json(json!({
                    "action": "list",
                    "categories": categories,
                    "message": "Use load_tools({\"category\": \"<name>\"}) to load a category.",
                }));
            }
            Some(s) => match ToolCategory::parse(s) {
                Some(ToolCategory::Meta) => {
                    return ToolOutcome::error("Category 'meta' is always loaded")
                }
                Some(c) => c,
                None => {
                    return ToolOutcome::error(format!(
                        "Unknown category: {}. Valid categories: file_ops, git, search, shell",
                        s
                    ))
                }
            },
        };

        let names: Vec<String> = registry
            .by_category(category)
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        if names.is_empty() {
            return ToolOutcome::error(format!("Category '{}' has no tools", category));
        }
        for name in &names {
            ctx.loaded_tools.insert(name.clone());
        }

        debug!("load_tools: {} → {:?}", category, names);
        let message = format!("Loaded {} tools from category '{}'", names.len(), category);
        ToolOutcome::Json(json!({
            "action": "load",
            "category": category.as_str(),
            "toolsLoaded": names,
            "message": message,
        }))
    }
}
