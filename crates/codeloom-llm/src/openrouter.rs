//! OpenRouter provider — OpenAI-compatible chat completions with SSE streaming

use crate::provider::{
    ChatProvider, ChatRequest, LlmError, LlmResult, ToolCallFragment, WireDelta, WireStream,
};
use crate::wire;
use codeloom_core::TokenUsage;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENROUTER_API_URL.to_string(),
        }
    }

    /// Point at a different OpenAI-compatible endpoint (proxies, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn build_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": request.model,
            "messages": wire::messages_to_wire(&request.messages),
            "stream": true,
            "stream_options": { "include_usage": true },
        });
        if !request.tools.is_empty() {
            body["tools"] = Value::Array(request.tools.iter().map(wire::tool_to_wire).collect());
        }
        if let Some(max) = request.max_tokens {
            body["max_tokens"] = json!(max);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }
        body
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn chat_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> LlmResult<WireStream> {
        let body = self.build_body(&request);
        debug!("openrouter request: model={}", request.model);

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .header("X-Title", "Codeloom")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("openrouter error {}: {}", status, error_text);
            return Err(match status.as_u16() {
                401 => LlmError::AuthFailed(error_text),
                429 => LlmError::RateLimited {
                    retry_after_ms: 60_000,
                },
                _ => LlmError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        let stream = parse_sse_stream(response.bytes_stream(), cancel);
        Ok(Box::pin(stream))
    }
}

fn parse_sse_stream(
    bytes_stream: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    cancel: CancellationToken,
) -> impl futures::Stream<Item = LlmResult<WireDelta>> + Send {
    async_stream::stream! {
        let mut buffer = String::new();
        tokio::pin!(bytes_stream);

        loop {
            let chunk_result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    yield Err(LlmError::Cancelled);
                    return;
                }
                chunk = bytes_stream.next() => match chunk {
                    Some(c) => c,
                    None => break,
                },
            };

            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    continue;
                }
            };

            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(event_end) = buffer.find("\n\n") {
                let event_str = buffer[..event_end].to_string();
                buffer = buffer[event_end + 2..].to_string();

                for line in event_str.lines() {
                    let data = match line.strip_prefix("data: ") {
                        Some(d) => d,
                        None => continue,
                    };
                    if data.trim() == "[DONE]" {
                        return;
                    }
                    for result in parse_chunk(data) {
                        yield result;
                    }
                }
            }
        }
    }
}

/// Parse one `data:` payload into zero or more deltas. A chunk may carry a
/// text delta, tool-call fragments, a finish reason and/or usage.
fn parse_chunk(data: &str) -> Vec<LlmResult<WireDelta>> {
    let v: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => return vec![Err(LlmError::InvalidResponse(e.to_string()))],
    };

    if let Some(err) = v.get("error") {
        let message = err["message"]
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| err.to_string());
        return vec![Err(LlmError::StreamError(message))];
    }

    let mut out = Vec::new();

    if let Some(choice) = v["choices"].as_array().and_then(|a| a.first()) {
        let delta = &choice["delta"];

        if let Some(text) = delta["content"].as_str() {
            if !text.is_empty() {
                out.push(Ok(WireDelta::Text(text.to_string())));
            }
        }

        if let Some(calls) = delta["tool_calls"].as_array() {
            for call in calls {
                out.push(Ok(WireDelta::ToolCallFragment(ToolCallFragment {
                    index: call["index"].as_u64().unwrap_or(0) as u32,
                    id: call["id"].as_str().map(String::from),
                    name: call["function"]["name"].as_str().map(String::from),
                    arguments: call["function"]["arguments"].as_str().map(String::from),
                })));
            }
        }

        if let Some(reason) = choice["finish_reason"].as_str() {
            out.push(Ok(WireDelta::Finish(Some(reason.to_string()))));
        }
    }

    // Usage arrives on a trailing chunk when stream_options.include_usage
    // is set; it may ride a chunk with no choices.
    if let Some(usage) = v.get("usage").filter(|u| !u.is_null()) {
        out.push(Ok(WireDelta::Usage(TokenUsage {
            prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
            total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
        })));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_with_text_delta() {
        let deltas = parse_chunk(r#"{"choices":[{"delta":{"content":"Hello"}}]}"#);
        assert_eq!(deltas.len(), 1);
        assert!(matches!(
            deltas[0].as_ref().unwrap(),
            WireDelta::Text(t) if t == "Hello"
        ));
    }

    #[test]
    fn chunk_with_tool_call_fragment() {
        let deltas = parse_chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"grep","arguments":"{\"pa"}}]}}]}"#,
        );
        assert_eq!(deltas.len(), 1);
        match deltas[0].as_ref().unwrap() {
            WireDelta::ToolCallFragment(f) => {
                assert_eq!(f.index, 0);
                assert_eq!(f.id.as_deref(), Some("call_1"));
                assert_eq!(f.name.as_deref(), Some("grep"));
                assert_eq!(f.arguments.as_deref(), Some("{\"pa"));
            }
            other => panic!("expected fragment, got {:?}", other),
        }
    }

    #[test]
    fn chunk_with_finish_and_usage() {
        let deltas = parse_chunk(
            r#"{"choices":[{"delta":{},"finish_reason":"stop"}],"usage":{"prompt_tokens":10,"completion_tokens":5,"total_tokens":15}}"#,
        );
        assert_eq!(deltas.len(), 2);
        assert!(matches!(
            deltas[0].as_ref().unwrap(),
            WireDelta::Finish(Some(r)) if r == "stop"
        ));
        assert!(matches!(
            deltas[1].as_ref().unwrap(),
            WireDelta::Usage(u) if u.total_tokens == 15
        ));
    }

    #[test]
    fn chunk_with_upstream_error() {
        let deltas = parse_chunk(r#"{"error":{"message":"model overloaded"}}"#);
        assert_eq!(deltas.len(), 1);
        assert!(matches!(
            deltas[0].as_ref().unwrap_err(),
            LlmError::StreamError(m) if m == "model overloaded"
        ));
    }
}
