//! Local context-window counting.
//!
//! The conversation is encoded with the cl100k_base tokenizer before every
//! LLM request; if the tokenizer cannot be built the counter degrades to a
//! chars/4 estimate and says so in the emitted `context` event.

use codeloom_core::{ChatMessage, ContentBlock, MessageContent};
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::warn;

const CHARS_PER_TOKEN: usize = 4;
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Result of counting one conversation.
#[derive(Clone, Copy, Debug)]
pub struct ContextCount {
    pub tokens: usize,
    pub accurate: bool,
    pub source: &'static str,
}

pub struct TokenCounter {
    bpe: Option<CoreBPE>,
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter {
    pub fn new() -> Self {
        let bpe = match cl100k_base() {
            Ok(b) => Some(b),
            Err(e) => {
                warn!("tokenizer unavailable, falling back to heuristic: {}", e);
                None
            }
        };
        Self { bpe }
    }

    /// A counter without the tokenizer, exercising the heuristic path.
    pub fn heuristic_only() -> Self {
        Self { bpe: None }
    }

    fn count_text(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => text.len().div_ceil(CHARS_PER_TOKEN),
        }
    }

    fn count_message(&self, message: &ChatMessage) -> usize {
        let content = match &message.content {
            MessageContent::Text(text) => self.count_text(text),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => self.count_text(text),
                    ContentBlock::ToolCall {
                        name, arguments, ..
                    } => self.count_text(name) + self.count_text(arguments),
                    ContentBlock::ToolResult { content, .. } => self.count_text(content),
                })
                .sum(),
        };
        content + MESSAGE_OVERHEAD_TOKENS
    }

    pub fn count_conversation(&self, messages: &[ChatMessage]) -> ContextCount {
        let tokens = messages.iter().map(|m| self.count_message(m)).sum();
        match self.bpe {
            Some(_) => ContextCount {
                tokens,
                accurate: true,
                source: "tiktoken",
            },
            None => ContextCount {
                tokens,
                accurate: false,
                source: "heuristic",
            },
        }
    }
}
