//! Tests for codeloom-store against a real in-memory SQLite database

use codeloom_core::{ChatMessage, ContentBlock, Role, SessionStatus};
use codeloom_store::{preview_of, SessionStore};

fn store() -> SessionStore {
    SessionStore::open_in_memory().unwrap()
}

// ===========================================================================
// Sessions
// ===========================================================================

#[test]
fn create_and_get_session() {
    let store = store();
    store
        .create_session("s1", "/tmp/work", SessionStatus::Idle)
        .unwrap();

    let record = store.get_session("s1").unwrap().unwrap();
    assert_eq!(record.id, "s1");
    assert_eq!(record.status, SessionStatus::Idle);
    assert_eq!(record.working_dir, "/tmp/work");
    assert!(record.title.is_none());
    assert_eq!(record.total_tokens, 0);
    assert!(record.current_plan.is_none());
}

#[test]
fn get_missing_session() {
    assert!(store().get_session("nope").unwrap().is_none());
}

#[test]
fn update_session_fields() {
    let store = store();
    store
        .create_session("s1", "/tmp", SessionStatus::Idle)
        .unwrap();

    store
        .update_session_status("s1", SessionStatus::Running)
        .unwrap();
    store.update_session_working_dir("s1", "/srv/app").unwrap();
    store.update_session_title("s1", "Fix the parser").unwrap();
    store
        .update_session_plan("s1", Some("1. read 2. edit"))
        .unwrap();

    let record = store.get_session("s1").unwrap().unwrap();
    assert_eq!(record.status, SessionStatus::Running);
    assert_eq!(record.working_dir, "/srv/app");
    assert_eq!(record.title.as_deref(), Some("Fix the parser"));
    assert_eq!(record.current_plan.as_deref(), Some("1. read 2. edit"));

    store.update_session_plan("s1", None).unwrap();
    let record = store.get_session("s1").unwrap().unwrap();
    assert!(record.current_plan.is_none());
}

#[test]
fn token_increment_accumulates() {
    let store = store();
    store
        .create_session("s1", "/tmp", SessionStatus::Idle)
        .unwrap();

    store.increment_session_tokens("s1", 100).unwrap();
    store.increment_session_tokens("s1", 250).unwrap();

    let record = store.get_session("s1").unwrap().unwrap();
    assert_eq!(record.total_tokens, 350);
}

#[test]
fn delete_session_cascades_to_messages() {
    let store = store();
    store
        .create_session("s1", "/tmp", SessionStatus::Idle)
        .unwrap();
    store
        .append_message("s1", &ChatMessage::user("hello"))
        .unwrap();
    store
        .append_message("s1", &ChatMessage::assistant("hi"))
        .unwrap();
    assert_eq!(store.count_messages("s1").unwrap(), 2);

    assert!(store.delete_session("s1").unwrap());
    assert!(store.get_session("s1").unwrap().is_none());
    assert_eq!(store.count_messages("s1").unwrap(), 0);

    // Deleting again reports nothing deleted.
    assert!(!store.delete_session("s1").unwrap());
}

// ===========================================================================
// Messages
// ===========================================================================

#[test]
fn append_order_equals_retrieval_order() {
    let store = store();
    store
        .create_session("s1", "/tmp", SessionStatus::Idle)
        .unwrap();

    for i in 0..10 {
        store
            .append_message("s1", &ChatMessage::user(format!("message {}", i)))
            .unwrap();
    }

    let messages = store.list_messages("s1").unwrap();
    assert_eq!(messages.len(), 10);
    for (i, msg) in messages.iter().enumerate() {
        assert_eq!(msg.content.text(), format!("message {}", i));
    }
    // Sequence numbers strictly increase.
    for pair in messages.windows(2) {
        assert!(pair[0].seq < pair[1].seq);
    }
}

#[test]
fn block_content_round_trips_through_storage() {
    let store = store();
    store
        .create_session("s1", "/tmp", SessionStatus::Idle)
        .unwrap();

    let assistant = ChatMessage::assistant_blocks(vec![
        ContentBlock::Text {
            text: "let me look".into(),
        },
        ContentBlock::ToolCall {
            id: "call_1".into(),
            name: "read_file".into(),
            arguments: r#"{"path":"a.rs"}"#.into(),
        },
    ]);
    let results = ChatMessage::user_blocks(vec![ContentBlock::ToolResult {
        tool_call_id: "call_1".into(),
        content: "contents".into(),
        is_error: None,
    }]);
    store.append_message("s1", &assistant).unwrap();
    store.append_message("s1", &results).unwrap();

    let messages = store.list_messages("s1").unwrap();
    assert_eq!(messages[0].clone().into_chat_message(), assistant);
    assert_eq!(messages[1].clone().into_chat_message(), results);

    // Assistant tool calls are mirrored into the wire-shaped column.
    let calls = messages[0].tool_calls.as_ref().unwrap();
    assert_eq!(calls[0]["id"], "call_1");
    assert_eq!(calls[0]["type"], "function");
    assert_eq!(calls[0]["function"]["name"], "read_file");
    assert!(messages[1].tool_calls.is_none());
}

#[test]
fn plain_text_that_looks_like_json_round_trips() {
    let store = store();
    store
        .create_session("s1", "/tmp", SessionStatus::Idle)
        .unwrap();

    let tricky = ChatMessage::user(r#"[{"type":"text","note":"not blocks"}] trailing"#);
    store.append_message("s1", &tricky).unwrap();

    let messages = store.list_messages("s1").unwrap();
    assert_eq!(messages[0].clone().into_chat_message(), tricky);
}

#[test]
fn tool_role_message_round_trips() {
    let store = store();
    store
        .create_session("s1", "/tmp", SessionStatus::Idle)
        .unwrap();

    let msg = ChatMessage::tool_result("call_3", "output text");
    store.append_message("s1", &msg).unwrap();

    let messages = store.list_messages("s1").unwrap();
    assert_eq!(messages[0].role, Role::Tool);
    assert_eq!(messages[0].tool_call_id.as_deref(), Some("call_3"));
    assert_eq!(messages[0].clone().into_chat_message(), msg);
}

#[test]
fn first_user_message_and_preview() {
    let store = store();
    store
        .create_session("s1", "/tmp", SessionStatus::Idle)
        .unwrap();
    store
        .append_message("s1", &ChatMessage::assistant("welcome"))
        .unwrap();
    store
        .append_message("s1", &ChatMessage::user("first ask"))
        .unwrap();
    store
        .append_message("s1", &ChatMessage::user("second ask"))
        .unwrap();

    assert_eq!(
        store.first_user_message("s1").unwrap().as_deref(),
        Some("first ask")
    );
    assert!(store.first_user_message("missing").unwrap().is_none());
}

#[test]
fn preview_truncates_at_100_chars() {
    let short = "just a short message";
    assert_eq!(preview_of(short), short);

    let long = "x".repeat(150);
    let preview = preview_of(&long);
    assert_eq!(preview.chars().count(), 101);
    assert!(preview.ends_with('…'));
}

// ===========================================================================
// Listing
// ===========================================================================

#[test]
fn list_sessions_pagination_and_order() {
    let store = store();
    // created_at has second precision in RFC3339; force distinct ordering by
    // creating with increasing ids and relying on the id tiebreaker.
    for i in 0..5 {
        store
            .create_session(&format!("s{}", i), "/tmp", SessionStatus::Idle)
            .unwrap();
    }
    store
        .append_message("s4", &ChatMessage::user("newest session prompt"))
        .unwrap();

    let (page, total) = store.list_sessions(2, 0).unwrap();
    assert_eq!(total, 5);
    assert_eq!(page.len(), 2);
    // Creation-descending: the newest id sorts first.
    assert_eq!(page[0].id, "s4");
    assert_eq!(page[0].message_count, 1);
    assert_eq!(
        page[0].preview.as_deref(),
        Some("newest session prompt")
    );

    let (rest, _) = store.list_sessions(10, 4).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id, "s0");
}
