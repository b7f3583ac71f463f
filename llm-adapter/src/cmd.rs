//! Request body construction for each wire protocol.

use crate::types::{EndpointConfig, Protocol, SamplingConfig};
use serde_json::{json, Value};

/// Path appended to the endpoint's base URL.
#[must_use]
pub const fn request_path(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Ollama => "/api/chat",
        Protocol::ChatCompletions => "/chat/completions",
    }
}

/// Builds the JSON body for a single-turn, non-streaming chat request.
#[must_use]
pub fn build_body(endpoint: &EndpointConfig, sampling: &SamplingConfig, prompt: &str) -> Value {
    let messages = json!([{ "role": "user", "content": prompt }]);

    match endpoint.kind.protocol() {
        Protocol::Ollama => json!({
            "model": endpoint.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": sampling.temperature,
                "top_p": sampling.top_p,
                "num_ctx": sampling.context_window,
            },
        }),
        Protocol::ChatCompletions => json!({
            "model": endpoint.model,
            "messages": messages,
            "stream": false,
            "temperature": sampling.temperature,
            "top_p": sampling.top_p,
        }),
    }
}

/// Pulls the assistant text out of a decoded response body.
#[must_use]
pub fn response_text(protocol: Protocol, body: &Value) -> Option<String> {
    let text = match protocol {
        Protocol::Ollama => body.pointer("/message/content"),
        Protocol::ChatCompletions => body.pointer("/choices/0/message/content"),
    };
    text.and_then(Value::as_str).map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendKind;

    #[test]
    fn test_ollama_body_carries_options() {
        let endpoint = EndpointConfig::new(BackendKind::LocalQwen, "http://localhost:11434", "qwen3:8b");
        let body = build_body(&endpoint, &SamplingConfig::default(), "hi");
        assert_eq!(body["model"], "qwen3:8b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_ctx"], 4096);
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_chat_completions_body_has_no_ctx() {
        let endpoint = EndpointConfig::new(BackendKind::Kimi, "https://api.moonshot.cn/v1", "kimi");
        let body = build_body(&endpoint, &SamplingConfig::default(), "hi");
        assert!(body.get("options").is_none());
        assert!(body.get("temperature").is_some());
    }

    #[test]
    fn test_response_text_by_protocol() {
        let ollama = json!({"message": {"role": "assistant", "content": "{}"}});
        assert_eq!(response_text(Protocol::Ollama, &ollama).as_deref(), Some("{}"));

        let openai = json!({"choices": [{"message": {"content": "ok"}}]});
        assert_eq!(
            response_text(Protocol::ChatCompletions, &openai).as_deref(),
            Some("ok")
        );
        assert!(response_text(Protocol::ChatCompletions, &ollama).is_none());
    }
}
