//! Tests for codeloom-core: content blocks, message content, events

use codeloom_core::*;

// ===========================================================================
// SessionId
// ===========================================================================

#[test]
fn session_id_basics() {
    let id = SessionId::new("test-session");
    assert_eq!(id.as_str(), "test-session");
    assert_eq!(format!("{}", id), "test-session");
}

// ===========================================================================
// Content blocks — serialization round trip
// ===========================================================================

#[test]
fn content_block_round_trip() {
    let blocks = vec![
        ContentBlock::Text {
            text: "working on it".into(),
        },
        ContentBlock::ToolCall {
            id: "call_1".into(),
            name: "read_file".into(),
            arguments: r#"{"path":"src/main.rs"}"#.into(),
        },
        ContentBlock::ToolResult {
            tool_call_id: "call_1".into(),
            content: "fn main() {}".into(),
            is_error: Some(true),
        },
    ];

    let json = serde_json::to_string(&blocks).unwrap();
    let parsed: Vec<ContentBlock> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, blocks);
}

#[test]
fn content_block_tags() {
    let json = serde_json::to_value(ContentBlock::Text { text: "hi".into() }).unwrap();
    assert_eq!(json["type"], "text");

    let json = serde_json::to_value(ContentBlock::ToolCall {
        id: "c".into(),
        name: "grep".into(),
        arguments: "{}".into(),
    })
    .unwrap();
    assert_eq!(json["type"], "tool_call");

    let json = serde_json::to_value(ContentBlock::ToolResult {
        tool_call_id: "c".into(),
        content: "ok".into(),
        is_error: None,
    })
    .unwrap();
    assert_eq!(json["type"], "tool_result");
    assert!(json.get("is_error").is_none());
}

#[test]
fn message_content_untagged_round_trip() {
    let text = MessageContent::Text("plain".into());
    let json = serde_json::to_string(&text).unwrap();
    assert_eq!(json, r#""plain""#);
    let parsed: MessageContent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, text);

    let blocks = MessageContent::Blocks(vec![ContentBlock::Text { text: "b".into() }]);
    let json = serde_json::to_string(&blocks).unwrap();
    assert!(json.starts_with('['));
    let parsed: MessageContent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, blocks);
}

#[test]
fn message_content_text_extraction() {
    let content = MessageContent::Blocks(vec![
        ContentBlock::Text { text: "a".into() },
        ContentBlock::ToolCall {
            id: "c".into(),
            name: "grep".into(),
            arguments: "{}".into(),
        },
        ContentBlock::Text { text: "b".into() },
    ]);
    assert_eq!(content.text(), "ab");
}

// ===========================================================================
// ChatMessage helpers
// ===========================================================================

#[test]
fn chat_message_constructors() {
    assert_eq!(ChatMessage::system("s").role, Role::System);
    assert_eq!(ChatMessage::user("u").role, Role::User);
    assert_eq!(ChatMessage::assistant("a").role, Role::Assistant);

    let tool = ChatMessage::tool_result("call_9", "output");
    assert_eq!(tool.role, Role::Tool);
    assert_eq!(tool.tool_call_id.as_deref(), Some("call_9"));
}

#[test]
fn chat_message_tool_calls_extraction() {
    let msg = ChatMessage::assistant_blocks(vec![
        ContentBlock::Text { text: "t".into() },
        ContentBlock::ToolCall {
            id: "c1".into(),
            name: "grep".into(),
            arguments: "{}".into(),
        },
        ContentBlock::ToolCall {
            id: "c2".into(),
            name: "read_file".into(),
            arguments: r#"{"path":"x"}"#.into(),
        },
    ]);
    let calls = msg.tool_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].id, "c1");
    assert_eq!(calls[1].name, "read_file");

    assert!(ChatMessage::assistant("no tools").tool_calls().is_empty());
}

// ===========================================================================
// Events
// ===========================================================================

#[test]
fn done_event_shape() {
    let json = serde_json::to_string(&AgentEvent::Done).unwrap();
    assert_eq!(json, r#"{"type":"done"}"#);
    assert_eq!(AgentEvent::Done.event_name(), "done");
    assert!(AgentEvent::Done.is_terminal());
}

#[test]
fn context_event_shape() {
    let event = AgentEvent::Context {
        context_tokens: 1234,
        accurate: true,
        source: "tiktoken".into(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "context");
    assert_eq!(json["contextTokens"], 1234);
    assert_eq!(json["accurate"], true);
    assert_eq!(json["source"], "tiktoken");
    assert!(!event.is_terminal());
}

#[test]
fn usage_event_shape() {
    let event = AgentEvent::usage(TokenUsage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    });
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "usage");
    assert_eq!(json["promptTokens"], 10);
    assert_eq!(json["totalTokens"], 15);
}

#[test]
fn tool_call_event_shape() {
    let event = AgentEvent::ToolCall {
        tool_call: ToolCallView::pending("call_1", "grep"),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "tool_call");
    assert_eq!(json["toolCall"]["id"], "call_1");
    assert_eq!(json["toolCall"]["status"], "pending");
    assert_eq!(event.event_name(), "tool_call");
}

#[test]
fn tool_result_views() {
    let ok = ToolCallView::completed("c", "grep", serde_json::json!({"p": 1}), "found");
    assert_eq!(ok.status, ToolCallStatus::Completed);
    assert_eq!(ok.result.as_deref(), Some("found"));
    assert!(ok.error.is_none());

    let err = ToolCallView::errored("c", "grep", serde_json::json!({}), "boom");
    assert_eq!(err.status, ToolCallStatus::Error);
    assert_eq!(err.error.as_deref(), Some("boom"));
    assert!(err.result.is_none());
}

// ===========================================================================
// Enums
// ===========================================================================

#[test]
fn status_and_role_parse() {
    for status in [
        SessionStatus::Idle,
        SessionStatus::Running,
        SessionStatus::Completed,
        SessionStatus::Failed,
    ] {
        assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(SessionStatus::parse("bogus"), None);

    for role in [Role::System, Role::User, Role::Assistant, Role::Tool] {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
}

#[test]
fn tool_category_parse() {
    for cat in [
        ToolCategory::FileOps,
        ToolCategory::Git,
        ToolCategory::Search,
        ToolCategory::Shell,
        ToolCategory::Meta,
    ] {
        assert_eq!(ToolCategory::parse(cat.as_str()), Some(cat));
    }
    assert_eq!(ToolCategory::parse("network"), None);
    assert_eq!(ToolCategory::FileOps.as_str(), "file_ops");
}
