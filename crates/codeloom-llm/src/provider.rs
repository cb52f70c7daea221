//! Chat provider trait and the normalized wire-delta stream.

use codeloom_core::{ChatMessage, TokenUsage};
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

/// LLM error types
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("cancelled")]
    Cancelled,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// A tool definition in the shape providers consume.
#[derive(Clone, Debug)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// One outbound LLM request.
#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// A partial tool call as streamed by OpenAI-compatible providers: indexed
/// fragments whose `id`/`name` arrive once and whose `arguments` arrive in
/// string pieces.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolCallFragment {
    pub index: u32,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Vendor-normalized streaming delta.
#[derive(Clone, Debug, PartialEq)]
pub enum WireDelta {
    Text(String),
    ToolCallFragment(ToolCallFragment),
    Usage(TokenUsage),
    Finish(Option<String>),
}

/// Stream type for provider responses
pub type WireStream = Pin<Box<dyn Stream<Item = LlmResult<WireDelta>> + Send>>;

/// Chat provider trait. One implementation per vendor endpoint.
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Stream one completion. If `cancel` fires mid-stream the underlying
    /// connection is dropped and the stream yields `LlmError::Cancelled`.
    async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> LlmResult<WireStream>;
}
