//! Turn adapter — one LLM turn as a normalized event stream
//!
//! Sits between the orchestrator and a [`ChatProvider`]: reassembles the
//! provider's indexed tool-call fragments, relays text deltas, and finishes
//! with a single `TurnComplete` carrying the messages to append and the
//! parsed invocations — or an `Error` if the stream failed or was cancelled.

use crate::provider::{ChatProvider, ChatRequest, LlmError, ToolCallFragment, ToolSpec, WireDelta};
use codeloom_core::{ChatMessage, ContentBlock, TokenUsage, ToolInvocation};
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Events emitted while one turn streams.
#[derive(Clone, Debug)]
pub enum ProviderEvent {
    TextDelta(String),
    ToolCallStart { id: String, name: String },
    ToolCallDelta { id: String, arguments: String },
    ToolCallComplete { id: String },
    Usage(TokenUsage),
    Error(String),
    TurnComplete(TurnOutcome),
}

/// What one completed turn produced.
#[derive(Clone, Debug, Default)]
pub struct TurnOutcome {
    pub messages_to_append: Vec<ChatMessage>,
    pub invocations: Vec<ToolInvocation>,
    pub done: bool,
    pub text_content: Option<String>,
}

/// A fully reassembled tool call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccumulatedToolCall {
    pub index: u32,
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl AccumulatedToolCall {
    pub fn parse_input(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// Reassembles indexed fragments: `id` and `name` latch on first
/// appearance, `arguments` concatenate, and `finish` returns the calls in
/// index order.
#[derive(Default)]
pub struct ToolCallAccumulator {
    calls: BTreeMap<u32, AccumulatedToolCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one fragment. Returns `(id, name)` when this fragment gave the
    /// call its identity (i.e. the call just started).
    pub fn apply(&mut self, fragment: &ToolCallFragment) -> Option<(String, String)> {
        let call = self.calls.entry(fragment.index).or_insert_with(|| {
            AccumulatedToolCall {
                index: fragment.index,
                ..Default::default()
            }
        });

        let started = call.id.is_empty() && fragment.id.is_some();
        if let Some(id) = &fragment.id {
            if call.id.is_empty() {
                call.id = id.clone();
            }
        }
        if let Some(name) = &fragment.name {
            if call.name.is_empty() {
                call.name = name.clone();
            }
        }
        if let Some(args) = &fragment.arguments {
            call.arguments.push_str(args);
        }

        if started && !call.id.is_empty() {
            Some((call.id.clone(), call.name.clone()))
        } else {
            None
        }
    }

    /// The id a fragment belongs to, if its call already has one.
    pub fn id_for(&self, index: u32) -> Option<String> {
        self.calls
            .get(&index)
            .filter(|c| !c.id.is_empty())
            .map(|c| c.id.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// All calls, sorted by index.
    pub fn finish(self) -> Vec<AccumulatedToolCall> {
        self.calls.into_values().collect()
    }
}

/// Inputs to one turn.
#[derive(Clone, Debug)]
pub struct TurnRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
}

pub struct TurnAdapter {
    provider: Arc<dyn ChatProvider>,
    max_tokens: Option<u32>,
}

impl TurnAdapter {
    pub fn new(provider: Arc<dyn ChatProvider>, max_tokens: Option<u32>) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Drive one LLM turn. The stream ends with either `TurnComplete` or
    /// `Error` — never both.
    pub fn send_turn(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> impl Stream<Item = ProviderEvent> + Send + 'static {
        let provider = self.provider.clone();
        let max_tokens = self.max_tokens;

        async_stream::stream! {
            let chat_request = ChatRequest {
                model: request.model,
                messages: request.messages,
                tools: request.tools,
                max_tokens,
                temperature: None,
            };

            let stream = match provider.chat_stream(chat_request, cancel.clone()).await {
                Ok(s) => s,
                Err(e) => {
                    yield ProviderEvent::Error(e.to_string());
                    return;
                }
            };
            tokio::pin!(stream);

            let mut text_content = String::new();
            let mut accumulator = ToolCallAccumulator::new();
            let mut usage: Option<TokenUsage> = None;

            loop {
                let delta = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        yield ProviderEvent::Error("Aborted by user".to_string());
                        return;
                    }
                    delta = stream.next() => match delta {
                        Some(d) => d,
                        None => break,
                    },
                };

                match delta {
                    Ok(WireDelta::Text(text)) => {
                        text_content.push_str(&text);
                        yield ProviderEvent::TextDelta(text);
                    }
                    Ok(WireDelta::ToolCallFragment(fragment)) => {
                        let index = fragment.index;
                        let started = accumulator.apply(&fragment);
                        if let Some((id, name)) = started {
                            yield ProviderEvent::ToolCallStart { id, name };
                        }
                        if let Some(arguments) = fragment.arguments {
                            if !arguments.is_empty() {
                                if let Some(id) = accumulator.id_for(index) {
                                    yield ProviderEvent::ToolCallDelta { id, arguments };
                                }
                            }
                        }
                    }
                    Ok(WireDelta::Usage(u)) => {
                        usage = Some(u);
                    }
                    Ok(WireDelta::Finish(_)) => {}
                    Err(LlmError::Cancelled) => {
                        yield ProviderEvent::Error("Aborted by user".to_string());
                        return;
                    }
                    Err(e) => {
                        yield ProviderEvent::Error(e.to_string());
                        return;
                    }
                }
            }

            let calls = accumulator.finish();
            for call in &calls {
                yield ProviderEvent::ToolCallComplete { id: call.id.clone() };
            }

            if let Some(u) = usage {
                yield ProviderEvent::Usage(u);
            }

            yield ProviderEvent::TurnComplete(synthesize(text_content, calls));
        }
    }
}

/// Build the turn outcome: the messages to append and the parsed
/// invocations, per the tool-call / text-only / empty cases.
fn synthesize(text_content: String, calls: Vec<AccumulatedToolCall>) -> TurnOutcome {
    if calls.is_empty() {
        let done = true;
        if text_content.is_empty() {
            return TurnOutcome {
                done,
                ..Default::default()
            };
        }
        return TurnOutcome {
            messages_to_append: vec![ChatMessage::assistant(text_content.clone())],
            invocations: Vec::new(),
            done,
            text_content: Some(text_content),
        };
    }

    let mut blocks = Vec::with_capacity(calls.len() + 1);
    if !text_content.is_empty() {
        blocks.push(ContentBlock::Text {
            text: text_content.clone(),
        });
    }
    let mut invocations = Vec::with_capacity(calls.len());
    for call in &calls {
        blocks.push(ContentBlock::ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments: call.arguments.clone(),
        });
        let input = match call.parse_input() {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    tool = %call.name,
                    "tool call arguments failed to parse, using empty input: {}",
                    e
                );
                Value::Object(Default::default())
            }
        };
        invocations.push(ToolInvocation {
            id: call.id.clone(),
            name: call.name.clone(),
            input,
            raw_arguments: call.arguments.clone(),
        });
    }

    TurnOutcome {
        messages_to_append: vec![ChatMessage::assistant_blocks(blocks)],
        invocations,
        done: false,
        text_content: if text_content.is_empty() {
            None
        } else {
            Some(text_content)
        },
    }
}
