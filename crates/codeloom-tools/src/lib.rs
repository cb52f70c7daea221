//! Codeloom tools — the declarative tool catalog and its executor
//!
//! Each tool is a self-contained file in src/tools/. Only `meta` tools are
//! dispatchable by default; the model loads other categories through the
//! `load_tools` meta tool, which mutates the session's loaded set.

pub mod context;
pub mod executor;
pub mod registry;
pub mod tools;

pub use context::ToolContext;
pub use executor::{execute_batch, execute_one, ExecutedTool};
pub use registry::{category_description, CategoryInfo, RegistryError, Tool, ToolOutcome, ToolRegistry};
pub use tools::load_tools::{catalog_handle, CatalogHandle};

use std::sync::Arc;

/// Build the default registry with every builtin tool.
///
/// The `catalog` handle is what `load_tools` uses to enumerate categories;
/// fill it in with the finished registry (see `build_default_catalog`).
pub fn default_registry(catalog: CatalogHandle) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();

    // --- file_ops ---
    registry.register(tools::read_file::ReadFileTool)?;
    registry.register(tools::write_file::WriteFileTool)?;
    registry.register(tools::edit_file::EditFileTool)?;
    registry.register(tools::list_dir::ListDirTool)?;

    // --- search ---
    registry.register(tools::grep::GrepTool)?;
    registry.register(tools::find_files::FindFilesTool)?;

    // --- git ---
    registry.register(tools::git::GitDiffTool)?;
    registry.register(tools::git::GitStatusTool)?;
    registry.register(tools::git::GitLogTool)?;

    // --- shell ---
    registry.register(tools::shell::RunShellTool::new())?;

    // --- meta ---
    registry.register(tools::load_tools::LoadToolsTool::new(catalog))?;

    Ok(registry)
}

/// Build the default registry and wire the `load_tools` catalog handle back
/// to it. This is the single startup path for the process-wide catalog;
/// tests construct their own instances instead of sharing it.
pub async fn build_default_catalog() -> Result<Arc<ToolRegistry>, RegistryError> {
    let handle = catalog_handle();
    let registry = Arc::new(default_registry(handle.clone())?);
    *handle.write().await = Some(registry.clone());
    Ok(registry)
}
