//! Agent orchestrator — drives one conversation turn to completion.
//!
//! A turn alternates LLM rounds with sequential tool execution until the
//! model stops calling tools, a budget runs out, or the user cancels.
//! Everything a subscriber sees goes through the session's event bus; the
//! last event on any turn is a single `done`.

use crate::bus::EventBus;
use crate::manager::SessionHandle;
use crate::prompts;
use crate::tokens::TokenCounter;
use codeloom_core::{
    AgentEvent, ChatMessage, ContentBlock, Role, SessionStatus, ToolCallView, ToolInvocation,
};
use codeloom_llm::{ProviderEvent, ToolSpec, TurnAdapter, TurnOutcome, TurnRequest};
use codeloom_store::{preview_of, SessionStore, StoreError};
use codeloom_tools::{execute_one, ToolContext, ToolRegistry};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Default cap on LLM rounds within one turn.
pub const MAX_ROUNDS: usize = 20;

const ABORTED_BEFORE_START: &str = "Aborted before starting";
const ABORTED_BY_USER: &str = "Aborted by user";

/// Options for one turn.
#[derive(Clone, Debug)]
pub struct TurnOptions {
    pub user_prompt: String,
    pub model: Option<String>,
    /// Named command preset applied to the system prompt.
    pub command: Option<String>,
    pub system_prompt: Option<String>,
    pub max_rounds: usize,
    pub max_wall_clock: Option<Duration>,
}

impl TurnOptions {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            model: None,
            command: None,
            system_prompt: None,
            max_rounds: MAX_ROUNDS,
            max_wall_clock: None,
        }
    }
}

pub struct Orchestrator {
    adapter: TurnAdapter,
    registry: Arc<ToolRegistry>,
    store: Arc<SessionStore>,
    counter: TokenCounter,
    default_model: String,
}

impl Orchestrator {
    pub fn new(
        adapter: TurnAdapter,
        registry: Arc<ToolRegistry>,
        store: Arc<SessionStore>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            adapter,
            registry,
            store,
            counter: TokenCounter::new(),
            default_model: default_model.into(),
        }
    }

    /// Run one turn against a session. Emits into the session's current bus
    /// and closes it when the turn ends, whatever the outcome.
    pub async fn run_turn(&self, session: Arc<SessionHandle>, opts: TurnOptions) {
        let bus = session.bus();
        let cancel = session.cancel_token();
        let session_id = session.id.to_string();

        if cancel.is_cancelled() {
            bus.push(AgentEvent::error(ABORTED_BEFORE_START));
            bus.push(AgentEvent::Done);
            bus.close();
            return;
        }

        if let Err(e) = self
            .store
            .update_session_status(&session_id, SessionStatus::Running)
        {
            error!(session = %session_id, "failed to mark session running: {}", e);
            bus.push(AgentEvent::error(format!("persistence failure: {}", e)));
            bus.push(AgentEvent::Done);
            bus.close();
            return;
        }

        let mut ctx = ToolContext::with_loaded(session.working_dir(), session.loaded_tools());

        let end = match self.drive(&session_id, &opts, &bus, &cancel, &mut ctx).await {
            Ok(status) => status,
            Err(e) => {
                bus.push(AgentEvent::error(format!("persistence failure: {}", e)));
                SessionStatus::Failed
            }
        };

        // Tools loaded during the turn survive for the session's next turn.
        session.set_loaded_tools(ctx.loaded_tools.clone());

        if let Err(e) = self.store.update_session_status(&session_id, end) {
            error!(session = %session_id, "failed to persist terminal status: {}", e);
        }
        bus.push(AgentEvent::Done);
        bus.close();
        info!(session = %session_id, status = end.as_str(), "turn finished");
    }

    /// The turn loop. Pushes every event except the final `done`; the
    /// returned status is the terminal state to persist.
    async fn drive(
        &self,
        session_id: &str,
        opts: &TurnOptions,
        bus: &Arc<EventBus>,
        cancel: &CancellationToken,
        ctx: &mut ToolContext,
    ) -> Result<SessionStatus, StoreError> {
        let started = Instant::now();

        // The user prompt is persisted up front; the system prompt is
        // constructed per turn and never stored.
        self.store
            .append_message(session_id, &ChatMessage::user(opts.user_prompt.clone()))?;
        self.maybe_set_title(session_id, &opts.user_prompt)?;

        let mut messages: Vec<ChatMessage> = self
            .store
            .list_messages(session_id)?
            .into_iter()
            .map(|m| m.into_chat_message())
            .collect();
        if !messages.iter().any(|m| m.role == Role::System) {
            let system = opts
                .system_prompt
                .clone()
                .unwrap_or_else(|| prompts::system_prompt_for(opts.command.as_deref()));
            messages.insert(0, ChatMessage::system(system));
        }

        let model = opts
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        for round in 1..=opts.max_rounds {
            if cancel.is_cancelled() {
                bus.push(AgentEvent::error(ABORTED_BY_USER));
                return Ok(SessionStatus::Completed);
            }
            if let Some(budget) = opts.max_wall_clock {
                if started.elapsed() > budget {
                    bus.push(AgentEvent::error(format!(
                        "Turn timed out after {}s",
                        budget.as_secs()
                    )));
                    return Ok(SessionStatus::Failed);
                }
            }

            let count = self.counter.count_conversation(&messages);
            bus.push(AgentEvent::Context {
                context_tokens: count.tokens,
                accurate: count.accurate,
                source: count.source.to_string(),
            });

            let tools: Vec<ToolSpec> = self
                .registry
                .loaded_view(&ctx.loaded_tools)
                .iter()
                .map(|t| ToolSpec {
                    name: t.name().to_string(),
                    description: t.description().to_string(),
                    input_schema: t.input_schema(),
                })
                .collect();

            debug!(session = %session_id, round, tools = tools.len(), "starting LLM round");

            let request = TurnRequest {
                model: model.clone(),
                messages: messages.clone(),
                tools,
            };
            let stream = self.adapter.send_turn(request, cancel.clone());
            tokio::pin!(stream);

            let mut outcome: Option<TurnOutcome> = None;
            while let Some(event) = stream.next().await {
                match event {
                    ProviderEvent::TextDelta(text) => {
                        bus.push(AgentEvent::TextDelta { text });
                    }
                    ProviderEvent::ToolCallStart { id, name } => {
                        bus.push(AgentEvent::ToolCall {
                            tool_call: ToolCallView::pending(id, name),
                        });
                    }
                    ProviderEvent::ToolCallDelta { .. } | ProviderEvent::ToolCallComplete { .. } => {
                        // Argument streaming is internal to the adapter; the
                        // client only sees pending and terminal states.
                    }
                    ProviderEvent::Usage(usage) => {
                        bus.push(AgentEvent::usage(usage));
                        self.store
                            .increment_session_tokens(session_id, usage.total_tokens as u64)?;
                    }
                    ProviderEvent::Error(message) => {
                        let cancelled =
                            cancel.is_cancelled() || message == ABORTED_BY_USER;
                        bus.push(AgentEvent::Error { message });
                        return Ok(if cancelled {
                            SessionStatus::Completed
                        } else {
                            SessionStatus::Failed
                        });
                    }
                    ProviderEvent::TurnComplete(result) => {
                        outcome = Some(result);
                    }
                }
            }

            let outcome = match outcome {
                Some(o) => o,
                None => {
                    bus.push(AgentEvent::error("provider stream ended unexpectedly"));
                    return Ok(SessionStatus::Failed);
                }
            };

            for message in &outcome.messages_to_append {
                self.store.append_message(session_id, message)?;
                messages.push(message.clone());
            }

            if outcome.invocations.is_empty() {
                return Ok(SessionStatus::Completed);
            }

            // Tool execution: sequential, in arrival order, with a
            // cancellation check before every invocation.
            let mut result_blocks = Vec::with_capacity(outcome.invocations.len());
            for invocation in outcome.invocations {
                if cancel.is_cancelled() {
                    bus.push(AgentEvent::error(ABORTED_BY_USER));
                    return Ok(SessionStatus::Completed);
                }
                if let Some(budget) = opts.max_wall_clock {
                    if started.elapsed() > budget {
                        bus.push(AgentEvent::error(format!(
                            "Turn timed out after {}s",
                            budget.as_secs()
                        )));
                        return Ok(SessionStatus::Failed);
                    }
                }

                let input_view = display_input(&invocation);
                let executed = execute_one(&self.registry, invocation, ctx).await;

                let view = match executed.error_message() {
                    Some(message) => ToolCallView::errored(
                        executed.invocation.id.clone(),
                        executed.invocation.name.clone(),
                        input_view,
                        message,
                    ),
                    None => ToolCallView::completed(
                        executed.invocation.id.clone(),
                        executed.invocation.name.clone(),
                        input_view,
                        executed.content(),
                    ),
                };
                bus.push(AgentEvent::ToolResult { tool_call: view });

                result_blocks.push(ContentBlock::ToolResult {
                    tool_call_id: executed.invocation.id.clone(),
                    content: executed.content(),
                    is_error: executed.is_error().then_some(true),
                });
            }

            let results_message = ChatMessage::user_blocks(result_blocks);
            self.store.append_message(session_id, &results_message)?;
            messages.push(results_message);

            debug!(session = %session_id, round, "round complete, continuing");
        }

        bus.push(AgentEvent::error(format!(
            "Agent stopped after {} tool call rounds to prevent infinite loops",
            opts.max_rounds
        )));
        Ok(SessionStatus::Failed)
    }

    fn maybe_set_title(&self, session_id: &str, user_prompt: &str) -> Result<(), StoreError> {
        if let Some(record) = self.store.get_session(session_id)? {
            if record.title.is_none() && !user_prompt.trim().is_empty() {
                self.store
                    .update_session_title(session_id, &preview_of(user_prompt))?;
            }
        }
        Ok(())
    }
}

/// What the client sees as the invocation's input: the parsed object, or
/// the model's original arguments text when parsing failed.
fn display_input(invocation: &ToolInvocation) -> Value {
    let parse_failed = !invocation.raw_arguments.trim().is_empty()
        && serde_json::from_str::<Value>(&invocation.raw_arguments).is_err();
    if parse_failed {
        Value::String(invocation.raw_arguments.clone())
    } else {
        invocation.input.clone()
    }
}
