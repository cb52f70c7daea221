//! Tests for tool-call reassembly and the turn adapter's event stream

use codeloom_core::{ContentBlock, MessageContent, Role, TokenUsage};
use codeloom_llm::{
    ChatProvider, ChatRequest, LlmError, LlmResult, ProviderEvent, ToolCallAccumulator,
    ToolCallFragment, TurnAdapter, TurnRequest, WireDelta, WireStream,
};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

fn fragment(
    index: u32,
    id: Option<&str>,
    name: Option<&str>,
    arguments: Option<&str>,
) -> ToolCallFragment {
    ToolCallFragment {
        index,
        id: id.map(String::from),
        name: name.map(String::from),
        arguments: arguments.map(String::from),
    }
}

// ===========================================================================
// ToolCallAccumulator
// ===========================================================================

#[test]
fn accumulator_concatenates_arguments() {
    let mut acc = ToolCallAccumulator::new();
    assert!(acc
        .apply(&fragment(0, Some("call_1"), Some("grep"), None))
        .is_some());
    assert!(acc
        .apply(&fragment(0, None, None, Some(r#"{"pat"#)))
        .is_none());
    assert!(acc
        .apply(&fragment(0, None, None, Some(r#"tern":"x"}"#)))
        .is_none());

    let calls = acc.finish();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id, "call_1");
    assert_eq!(calls[0].name, "grep");
    assert_eq!(calls[0].arguments, r#"{"pattern":"x"}"#);
    assert_eq!(
        calls[0].parse_input().unwrap(),
        serde_json::json!({"pattern": "x"})
    );
}

#[test]
fn accumulator_round_trip_sorted_by_index() {
    // Fragments for two calls, interleaved and out of index order.
    let mut acc = ToolCallAccumulator::new();
    acc.apply(&fragment(1, Some("call_b"), Some("write_file"), None));
    acc.apply(&fragment(1, None, None, Some(r#"{"path"#)));
    acc.apply(&fragment(0, Some("call_a"), Some("read_file"), None));
    acc.apply(&fragment(0, None, None, Some(r#"{"path":"a"}"#)));
    acc.apply(&fragment(1, None, None, Some(r#"":"b"}"#)));

    let calls = acc.finish();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        (calls[0].index, calls[0].id.as_str(), calls[0].name.as_str()),
        (0, "call_a", "read_file")
    );
    assert_eq!(calls[0].arguments, r#"{"path":"a"}"#);
    assert_eq!(
        (calls[1].index, calls[1].id.as_str()),
        (1, "call_b")
    );
    assert_eq!(calls[1].arguments, r#"{"path":"b"}"#);
}

#[test]
fn accumulator_id_latches_on_first_appearance() {
    let mut acc = ToolCallAccumulator::new();
    acc.apply(&fragment(0, Some("first"), Some("grep"), None));
    acc.apply(&fragment(0, Some("second"), None, None));
    let calls = acc.finish();
    assert_eq!(calls[0].id, "first");
}

// ===========================================================================
// Scripted provider
// ===========================================================================

struct ScriptedProvider {
    script: Mutex<VecDeque<Vec<LlmResult<WireDelta>>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(script: Vec<Vec<LlmResult<WireDelta>>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat_stream(
        &self,
        _request: ChatRequest,
        _cancel: CancellationToken,
    ) -> LlmResult<WireStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let deltas = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(Box::pin(futures::stream::iter(deltas)))
    }
}

async fn collect_events(
    provider: Arc<ScriptedProvider>,
    cancel: CancellationToken,
) -> Vec<ProviderEvent> {
    let adapter = TurnAdapter::new(provider, Some(4096));
    let request = TurnRequest {
        model: "test-model".into(),
        messages: vec![codeloom_core::ChatMessage::user("hi")],
        tools: Vec::new(),
    };
    let stream = adapter.send_turn(request, cancel);
    tokio::pin!(stream);

    let mut events = Vec::new();
    while let Some(event) = stream.next().await {
        events.push(event);
    }
    events
}

// ===========================================================================
// Turn adapter
// ===========================================================================

#[tokio::test]
async fn text_only_turn_synthesizes_assistant_message() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(WireDelta::Text("Hello ".into())),
        Ok(WireDelta::Text("world".into())),
        Ok(WireDelta::Finish(Some("stop".into()))),
    ]]);
    let events = collect_events(provider, CancellationToken::new()).await;

    assert!(matches!(&events[0], ProviderEvent::TextDelta(t) if t == "Hello "));
    assert!(matches!(&events[1], ProviderEvent::TextDelta(t) if t == "world"));
    let outcome = match events.last().unwrap() {
        ProviderEvent::TurnComplete(o) => o.clone(),
        other => panic!("expected TurnComplete, got {:?}", other),
    };
    assert!(outcome.done);
    assert!(outcome.invocations.is_empty());
    assert_eq!(outcome.text_content.as_deref(), Some("Hello world"));
    assert_eq!(outcome.messages_to_append.len(), 1);
    let msg = &outcome.messages_to_append[0];
    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.content, MessageContent::Text("Hello world".into()));
}

#[tokio::test]
async fn empty_turn_appends_nothing() {
    let provider = ScriptedProvider::new(vec![vec![Ok(WireDelta::Finish(Some("stop".into())))]]);
    let events = collect_events(provider, CancellationToken::new()).await;

    let outcome = match events.last().unwrap() {
        ProviderEvent::TurnComplete(o) => o.clone(),
        other => panic!("expected TurnComplete, got {:?}", other),
    };
    assert!(outcome.done);
    assert!(outcome.messages_to_append.is_empty());
    assert!(outcome.text_content.is_none());
}

#[tokio::test]
async fn tool_call_turn_emits_lifecycle_and_synthesizes_blocks() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(WireDelta::Text("Let me check. ".into())),
        Ok(WireDelta::ToolCallFragment(fragment(
            0,
            Some("call_1"),
            Some("grep"),
            None,
        ))),
        Ok(WireDelta::ToolCallFragment(fragment(
            0,
            None,
            None,
            Some(r#"{"pattern":"#),
        ))),
        Ok(WireDelta::ToolCallFragment(fragment(
            0,
            None,
            None,
            Some(r#""todo"}"#),
        ))),
        Ok(WireDelta::Usage(TokenUsage {
            prompt_tokens: 20,
            completion_tokens: 10,
            total_tokens: 30,
        })),
        Ok(WireDelta::Finish(Some("tool_calls".into()))),
    ]]);
    let events = collect_events(provider, CancellationToken::new()).await;

    let mut saw_start = false;
    let mut deltas = 0;
    let mut saw_complete = false;
    let mut usage_index = None;
    let mut complete_index = None;
    for (i, event) in events.iter().enumerate() {
        match event {
            ProviderEvent::ToolCallStart { id, name } => {
                saw_start = true;
                assert_eq!(id, "call_1");
                assert_eq!(name, "grep");
            }
            ProviderEvent::ToolCallDelta { id, .. } => {
                deltas += 1;
                assert_eq!(id, "call_1");
            }
            ProviderEvent::ToolCallComplete { id } => {
                saw_complete = true;
                complete_index = Some(i);
                assert_eq!(id, "call_1");
            }
            ProviderEvent::Usage(u) => {
                usage_index = Some(i);
                assert_eq!(u.total_tokens, 30);
            }
            _ => {}
        }
    }
    assert!(saw_start);
    assert_eq!(deltas, 2);
    assert!(saw_complete);
    // usage precedes turn_complete, after reassembly finished.
    assert!(usage_index.unwrap() > complete_index.unwrap());

    let outcome = match events.last().unwrap() {
        ProviderEvent::TurnComplete(o) => o.clone(),
        other => panic!("expected TurnComplete, got {:?}", other),
    };
    assert!(!outcome.done);
    assert_eq!(outcome.invocations.len(), 1);
    assert_eq!(outcome.invocations[0].name, "grep");
    assert_eq!(
        outcome.invocations[0].input,
        serde_json::json!({"pattern": "todo"})
    );

    // One assistant message: text block then tool_call block.
    assert_eq!(outcome.messages_to_append.len(), 1);
    match &outcome.messages_to_append[0].content {
        MessageContent::Blocks(blocks) => {
            assert_eq!(blocks.len(), 2);
            assert!(matches!(&blocks[0], ContentBlock::Text { text } if text == "Let me check. "));
            assert!(matches!(
                &blocks[1],
                ContentBlock::ToolCall { id, name, .. } if id == "call_1" && name == "grep"
            ));
        }
        other => panic!("expected blocks, got {:?}", other),
    }
}

#[tokio::test]
async fn multiple_tool_calls_sorted_by_index() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(WireDelta::ToolCallFragment(fragment(
            1,
            Some("call_b"),
            Some("git_status"),
            Some("{}"),
        ))),
        Ok(WireDelta::ToolCallFragment(fragment(
            0,
            Some("call_a"),
            Some("list_dir"),
            Some(r#"{"path":"."}"#),
        ))),
        Ok(WireDelta::Finish(Some("tool_calls".into()))),
    ]]);
    let events = collect_events(provider, CancellationToken::new()).await;

    let outcome = match events.last().unwrap() {
        ProviderEvent::TurnComplete(o) => o.clone(),
        other => panic!("expected TurnComplete, got {:?}", other),
    };
    let names: Vec<&str> = outcome
        .invocations
        .iter()
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(names, vec!["list_dir", "git_status"]);
    assert_eq!(outcome.invocations[0].id, "call_a");
}

#[tokio::test]
async fn malformed_arguments_fall_back_to_empty_object() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(WireDelta::ToolCallFragment(fragment(
            0,
            Some("call_1"),
            Some("grep"),
            Some(r#"{"pattern": unterminated"#),
        ))),
        Ok(WireDelta::Finish(Some("tool_calls".into()))),
    ]]);
    let events = collect_events(provider, CancellationToken::new()).await;

    let outcome = match events.last().unwrap() {
        ProviderEvent::TurnComplete(o) => o.clone(),
        other => panic!("expected TurnComplete, got {:?}", other),
    };
    let invocation = &outcome.invocations[0];
    assert_eq!(invocation.input, serde_json::json!({}));
    // The original text is preserved for the client.
    assert_eq!(invocation.raw_arguments, r#"{"pattern": unterminated"#);
}

#[tokio::test]
async fn upstream_error_terminates_without_turn_complete() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(WireDelta::Text("partial".into())),
        Err(LlmError::StreamError("connection reset".into())),
    ]]);
    let events = collect_events(provider, CancellationToken::new()).await;

    assert!(matches!(
        events.last().unwrap(),
        ProviderEvent::Error(m) if m.contains("connection reset")
    ));
    assert!(!events
        .iter()
        .any(|e| matches!(e, ProviderEvent::TurnComplete(_))));
}

#[tokio::test]
async fn cancellation_aborts_without_turn_complete() {
    let provider = ScriptedProvider::new(vec![vec![
        Ok(WireDelta::Text("never seen".into())),
        Ok(WireDelta::Finish(Some("stop".into()))),
    ]]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let events = collect_events(provider, cancel).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        ProviderEvent::Error(m) if m == "Aborted by user"
    ));
}

#[tokio::test]
async fn provider_cancelled_error_maps_to_abort_message() {
    let provider = ScriptedProvider::new(vec![vec![Err(LlmError::Cancelled)]]);
    let events = collect_events(provider.clone(), CancellationToken::new()).await;

    assert_eq!(provider.call_count(), 1);
    assert!(matches!(
        events.last().unwrap(),
        ProviderEvent::Error(m) if m == "Aborted by user"
    ));
}
