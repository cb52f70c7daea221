//! Streaming events delivered on a session's event bus.
//!
//! The set is closed: subscribers (SSE clients) switch on `type` and every
//! bus terminates with exactly one `done`.

use crate::types::TokenUsage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a tool call as seen by the client.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Pending,
    Completed,
    Error,
}

/// Client-facing view of one tool invocation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallView {
    pub id: String,
    pub name: String,
    pub status: ToolCallStatus,
    pub input: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallView {
    pub fn pending(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: ToolCallStatus::Pending,
            input: Value::Object(Default::default()),
            result: None,
            error: None,
        }
    }

    pub fn completed(
        id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
        result: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: ToolCallStatus::Completed,
            input,
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn errored(
        id: impl Into<String>,
        name: impl Into<String>,
        input: Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: ToolCallStatus::Error,
            input,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// An event on the per-session bus. Serialized form is the SSE `data`
/// payload; [`AgentEvent::event_name`] is the SSE `event` field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    TextDelta {
        text: String,
    },
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCallView,
    },
    ToolResult {
        #[serde(rename = "toolCall")]
        tool_call: ToolCallView,
    },
    #[serde(rename_all = "camelCase")]
    Context {
        context_tokens: usize,
        accurate: bool,
        source: String,
    },
    #[serde(rename_all = "camelCase")]
    Usage {
        prompt_tokens: u32,
        completion_tokens: u32,
        total_tokens: u32,
    },
    Error {
        message: String,
    },
    Done,
}

impl AgentEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            AgentEvent::TextDelta { .. } => "text_delta",
            AgentEvent::ToolCall { .. } => "tool_call",
            AgentEvent::ToolResult { .. } => "tool_result",
            AgentEvent::Context { .. } => "context",
            AgentEvent::Usage { .. } => "usage",
            AgentEvent::Error { .. } => "error",
            AgentEvent::Done => "done",
        }
    }

    pub fn usage(u: TokenUsage) -> Self {
        AgentEvent::Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        AgentEvent::Error {
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done)
    }
}
