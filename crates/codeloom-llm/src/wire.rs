//! Mapping between the internal message shape and the OpenAI-compatible
//! wire shape.
//!
//! The internal format keeps one message per conversational step: an
//! assistant message may carry text plus tool_call blocks, and a single
//! user message carries every tool_result block of a round. The wire format
//! wants tool results as individual `role: "tool"` messages, so the mapper
//! splits outbound and groups consecutive tool messages back together
//! inbound.

use crate::provider::ToolSpec;
use codeloom_core::{ChatMessage, ContentBlock, MessageContent, Role};
use serde_json::{json, Value};

/// Map one internal message to its wire representation. A user message
/// carrying N tool_result blocks becomes N `role: "tool"` messages.
pub fn message_to_wire(message: &ChatMessage) -> Vec<Value> {
    match (&message.role, &message.content) {
        (Role::Assistant, MessageContent::Blocks(blocks)) => {
            let mut text_parts: Vec<&str> = Vec::new();
            let mut tool_calls: Vec<Value> = Vec::new();
            for block in blocks {
                match block {
                    ContentBlock::Text { text } => text_parts.push(text),
                    ContentBlock::ToolCall {
                        id,
                        name,
                        arguments,
                    } => tool_calls.push(json!({
                        "id": id,
                        "type": "function",
                        "function": { "name": name, "arguments": arguments },
                    })),
                    ContentBlock::ToolResult { .. } => {}
                }
            }
            let mut obj = json!({ "role": "assistant" });
            obj["content"] = if text_parts.is_empty() {
                Value::Null
            } else {
                Value::String(text_parts.join(""))
            };
            if !tool_calls.is_empty() {
                obj["tool_calls"] = Value::Array(tool_calls);
            }
            vec![obj]
        }
        (Role::Tool, content) => {
            let (id, text) = match content {
                MessageContent::Blocks(blocks) => blocks
                    .iter()
                    .find_map(|b| match b {
                        ContentBlock::ToolResult {
                            tool_call_id,
                            content,
                            ..
                        } => Some((tool_call_id.clone(), content.clone())),
                        _ => None,
                    })
                    .unwrap_or_default(),
                MessageContent::Text(t) => (
                    message.tool_call_id.clone().unwrap_or_default(),
                    t.clone(),
                ),
            };
            let id = message.tool_call_id.clone().unwrap_or(id);
            vec![json!({ "role": "tool", "tool_call_id": id, "content": text })]
        }
        (_, MessageContent::Blocks(blocks)) => {
            // A user message of tool_result blocks splits into one wire
            // message per result; stray text blocks trail as a user message.
            let mut out = Vec::new();
            let mut text_parts: Vec<&str> = Vec::new();
            for block in blocks {
                match block {
                    ContentBlock::ToolResult {
                        tool_call_id,
                        content,
                        ..
                    } => out.push(json!({
                        "role": "tool",
                        "tool_call_id": tool_call_id,
                        "content": content,
                    })),
                    ContentBlock::Text { text } => text_parts.push(text),
                    ContentBlock::ToolCall { .. } => {}
                }
            }
            if !text_parts.is_empty() {
                out.push(json!({
                    "role": message.role.as_str(),
                    "content": text_parts.join(""),
                }));
            }
            out
        }
        (role, MessageContent::Text(text)) => {
            vec![json!({ "role": role.as_str(), "content": text })]
        }
    }
}

pub fn messages_to_wire(messages: &[ChatMessage]) -> Vec<Value> {
    messages.iter().flat_map(message_to_wire).collect()
}

/// Map wire messages back to the internal shape, grouping consecutive
/// `role: "tool"` messages into a single user message of tool_result
/// blocks.
pub fn wire_to_messages(values: &[Value]) -> Vec<ChatMessage> {
    let mut out: Vec<ChatMessage> = Vec::new();
    let mut pending_results: Vec<ContentBlock> = Vec::new();

    let flush = |pending: &mut Vec<ContentBlock>, out: &mut Vec<ChatMessage>| {
        if !pending.is_empty() {
            out.push(ChatMessage::user_blocks(std::mem::take(pending)));
        }
    };

    for value in values {
        let role = value["role"].as_str().unwrap_or_default();
        if role == "tool" {
            pending_results.push(ContentBlock::ToolResult {
                tool_call_id: value["tool_call_id"].as_str().unwrap_or_default().to_string(),
                content: value["content"].as_str().unwrap_or_default().to_string(),
                is_error: None,
            });
            continue;
        }
        flush(&mut pending_results, &mut out);

        let role = match Role::parse(role) {
            Some(r) => r,
            None => continue,
        };
        let text = value["content"].as_str().unwrap_or_default().to_string();

        if role == Role::Assistant {
            if let Some(calls) = value["tool_calls"].as_array() {
                let mut blocks = Vec::new();
                if !text.is_empty() {
                    blocks.push(ContentBlock::Text { text: text.clone() });
                }
                for call in calls {
                    blocks.push(ContentBlock::ToolCall {
                        id: call["id"].as_str().unwrap_or_default().to_string(),
                        name: call["function"]["name"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                        arguments: call["function"]["arguments"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    });
                }
                out.push(ChatMessage::assistant_blocks(blocks));
                continue;
            }
        }

        out.push(ChatMessage {
            role,
            content: MessageContent::Text(text),
            tool_call_id: None,
        });
    }
    flush(&mut pending_results, &mut out);
    out
}

/// OpenAI-compatible tool definition.
pub fn tool_to_wire(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.input_schema,
        }
    })
}
