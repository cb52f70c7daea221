//! LLM provider layer: the vendor-facing [`ChatProvider`] trait, the
//! OpenRouter driver, wire-format mappers, and the [`TurnAdapter`] that
//! normalizes one streaming turn for the orchestrator.

pub mod adapter;
pub mod openrouter;
pub mod provider;
pub mod wire;

pub use adapter::{
    AccumulatedToolCall, ProviderEvent, ToolCallAccumulator, TurnAdapter, TurnOutcome, TurnRequest,
};
pub use openrouter::OpenRouterProvider;
pub use provider::{
    ChatProvider, ChatRequest, LlmError, LlmResult, ToolCallFragment, ToolSpec, WireDelta,
    WireStream,
};
