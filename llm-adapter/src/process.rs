//! HTTP execution of a single chat request.

use crate::cmd::{build_body, request_path, response_text};
use crate::error::BackendError;
use crate::types::{EndpointConfig, SamplingConfig};
use serde_json::Value;
use std::time::Instant;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Sends `prompt` to `endpoint` and returns the assistant text.
///
/// # Errors
///
/// Returns `BackendError::Network` on connect/transport failures,
/// `Auth`/`RateLimited`/`Status` on non-success HTTP statuses and
/// `MalformedResponse` when the body lacks assistant text.
pub async fn run_chat(
    http: &reqwest::Client,
    endpoint: &EndpointConfig,
    sampling: &SamplingConfig,
    prompt: &str,
) -> Result<String, BackendError> {
    let backend = endpoint.kind.as_str();
    let protocol = endpoint.kind.protocol();
    let url = format!("{}{}", endpoint.base_url, request_path(protocol));
    let body = build_body(endpoint, sampling, prompt);

    let mut request = http.post(&url).json(&body);
    if let Some(key) = &endpoint.api_key {
        request = request.bearer_auth(key);
    }

    let start = Instant::now();
    tracing::debug!(
        backend,
        model = %endpoint.model,
        prompt_chars = prompt.chars().count(),
        "sending chat request"
    );

    let response = request.send().await.map_err(|source| BackendError::Network {
        backend: backend.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(BackendError::from_status(
            backend,
            status.as_u16(),
            truncate(&text, MAX_ERROR_BODY_CHARS),
        ));
    }

    let decoded: Value = response
        .json()
        .await
        .map_err(|e| BackendError::MalformedResponse {
            backend: backend.to_string(),
            reason: e.to_string(),
        })?;

    let text = response_text(protocol, &decoded).ok_or_else(|| BackendError::MalformedResponse {
        backend: backend.to_string(),
        reason: format!(
            "no assistant content in body: {}",
            truncate(&decoded.to_string(), MAX_ERROR_BODY_CHARS)
        ),
    })?;

    tracing::debug!(
        backend,
        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        response_chars = text.chars().count(),
        "chat request finished"
    );

    Ok(text)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "地".repeat(600);
        let short = truncate(&text, 500);
        assert!(short.ends_with("..."));
        assert_eq!(short.chars().count(), 503);
        assert_eq!(truncate("ok", 500), "ok");
    }
}
