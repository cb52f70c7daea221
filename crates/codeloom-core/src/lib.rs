//! Core types shared across the Codeloom workspace.

pub mod config;
pub mod events;
pub mod types;

pub use config::ServerConfig;
pub use events::{AgentEvent, ToolCallStatus, ToolCallView};
pub use types::{
    ChatMessage, ContentBlock, MessageContent, Role, SessionId, SessionStatus, TokenUsage,
    ToolCallRecord, ToolCategory, ToolInvocation,
};
