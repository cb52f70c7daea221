//! Tool executor — dispatch a batch of invocations against the registry.
//!
//! Invocations run sequentially in arrival order: tools have filesystem
//! side effects the model expects to observe causally, and tool_result
//! messages pair with assistant tool calls by position.

use crate::context::ToolContext;
use crate::registry::{ToolOutcome, ToolRegistry};
use codeloom_core::{ToolCategory, ToolInvocation};
use tracing::debug;

/// One invocation and what running it produced.
#[derive(Clone, Debug)]
pub struct ExecutedTool {
    pub invocation: ToolInvocation,
    pub outcome: ToolOutcome,
}

impl ExecutedTool {
    pub fn is_error(&self) -> bool {
        self.outcome.is_error()
    }

    /// The string the LLM sees in the tool_result block.
    pub fn content(&self) -> String {
        self.outcome.to_content_string()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.outcome.error_message()
    }
}

/// Dispatch a single invocation, honoring the session's loaded-tool gate.
pub async fn execute_one(
    registry: &ToolRegistry,
    invocation: ToolInvocation,
    ctx: &mut ToolContext,
) -> ExecutedTool {
    let outcome = match registry.get(&invocation.name) {
        None => ToolOutcome::error(format!(
            "Unknown tool: {}. Use load_tools to see available tool categories.",
            invocation.name
        )),
        Some(tool) => {
            if tool.category() != ToolCategory::Meta && !ctx.loaded_tools.contains(&invocation.name)
            {
                ToolOutcome::error(format!(
                    "Tool {} is not loaded. Use load_tools({{\"category\": \"{}\"}}) to load it first.",
                    invocation.name,
                    tool.category()
                ))
            } else {
                debug!(tool = %invocation.name, id = %invocation.id, "executing tool");
                tool.execute(invocation.input.clone(), ctx).await
            }
        }
    };

    ExecutedTool {
        invocation,
        outcome,
    }
}

/// Dispatch a batch sequentially; results come back in input order.
pub async fn execute_batch(
    registry: &ToolRegistry,
    invocations: Vec<ToolInvocation>,
    ctx: &mut ToolContext,
) -> Vec<ExecutedTool> {
    let mut results = Vec::with_capacity(invocations.len());
    for invocation in invocations {
        results.push(execute_one(registry, invocation, ctx).await);
    }
    results
}
