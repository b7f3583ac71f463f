//! Shared data types for backend configuration and responses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Known text-generation backends.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Qwen served by a local Ollama instance.
    LocalQwen,
    /// Moonshot Kimi through its OpenAI-compatible endpoint.
    Kimi,
    /// Qwen cloud through DashScope's OpenAI-compatible endpoint.
    DashScope,
}

impl BackendKind {
    /// Wire protocol spoken by this backend.
    #[must_use]
    pub const fn protocol(self) -> Protocol {
        match self {
            Self::LocalQwen => Protocol::Ollama,
            Self::Kimi | Self::DashScope => Protocol::ChatCompletions,
        }
    }

    /// Short stable name used in logs and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalQwen => "local-qwen",
            Self::Kimi => "kimi",
            Self::DashScope => "dashscope",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP protocol family of a backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Protocol {
    /// Ollama `/api/chat`.
    Ollama,
    /// OpenAI-style `/chat/completions`.
    ChatCompletions,
}

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SamplingConfig {
    /// Sampling temperature (default: 0.2).
    pub temperature: f32,
    /// Nucleus sampling mass (default: 0.9).
    pub top_p: f32,
    /// Context window in tokens (default: 4096). Only Ollama honours it.
    pub context_window: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.9,
            context_window: 4096,
        }
    }
}

impl SamplingConfig {
    /// Set the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the nucleus sampling mass.
    #[must_use]
    pub const fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Set the context window size.
    #[must_use]
    pub const fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }
}

/// Where and how to reach one backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Which backend this endpoint belongs to.
    pub kind: BackendKind,
    /// Base URL without a trailing slash.
    pub base_url: String,
    /// Model identifier sent in the request body.
    pub model: String,
    /// Bearer token for cloud backends.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Transport-level request timeout. The guard timeout is usually shorter.
    pub request_timeout: Duration,
}

impl EndpointConfig {
    /// Creates an endpoint with no API key and a 300 second transport timeout.
    #[must_use]
    pub fn new(kind: BackendKind, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            request_timeout: Duration::from_secs(300),
        }
    }

    /// Set the bearer token. Blank keys are treated as absent.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key: String = key.into();
        self.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    /// Set the transport-level request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Text produced by one backend call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Generated text, untouched.
    pub text: String,
    /// Name of the backend that produced it.
    pub backend: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}
