//! The text-generation capability and the HTTP-backed client implementing it.

use crate::error::BackendError;
use crate::process::run_chat;
use crate::prompt::{PromptTemplate, PromptVariables};
use crate::types::{BackendKind, EndpointConfig, ModelResponse, SamplingConfig};
use async_trait::async_trait;
use std::time::Instant;

/// One capability shared by every backend: turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Stable backend name for logs and error messages.
    fn backend_name(&self) -> &str;

    /// Generates text for a fully rendered prompt.
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;

    /// Renders `template` with `variables` and generates text for it.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidRequest` when the template cannot be
    /// rendered, otherwise whatever [`TextGenerator::generate`] returns.
    async fn invoke(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables,
    ) -> Result<ModelResponse, BackendError> {
        let prompt = template
            .render(variables)
            .map_err(|e| BackendError::InvalidRequest {
                backend: self.backend_name().to_string(),
                reason: format!("template '{}': {e}", template.name()),
            })?;

        let start = Instant::now();
        let text = self.generate(&prompt).await?;

        Ok(ModelResponse {
            text,
            backend: self.backend_name().to_string(),
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }
}

/// Handle on one remote backend.
///
/// The HTTP connection pool is acquired in [`ModelClient::connect`] and released
/// by [`ModelClient::close`]. A client dropped without `close` (early return,
/// error, cancelled task) releases the pool in `Drop` and logs a warning.
pub struct ModelClient {
    endpoint: EndpointConfig,
    sampling: SamplingConfig,
    http: Option<reqwest::Client>,
}

impl ModelClient {
    /// Acquires an HTTP handle for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidRequest` if the HTTP client cannot be built
    /// (for example when the TLS backend fails to initialise).
    pub fn connect(endpoint: EndpointConfig, sampling: SamplingConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(endpoint.request_timeout)
            .build()
            .map_err(|e| BackendError::InvalidRequest {
                backend: endpoint.kind.as_str().to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        tracing::debug!(backend = %endpoint.kind, model = %endpoint.model, "backend connected");

        Ok(Self {
            endpoint,
            sampling,
            http: Some(http),
        })
    }

    /// Which backend this client talks to.
    #[must_use]
    pub const fn kind(&self) -> BackendKind {
        self.endpoint.kind
    }

    /// Endpoint configuration.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Sampling configuration.
    #[must_use]
    pub const fn sampling(&self) -> &SamplingConfig {
        &self.sampling
    }

    /// Whether the connection pool is still held.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.http.is_some()
    }

    /// Releases the connection pool.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(http) = self.http.take() {
            drop(http);
            tracing::info!(backend = %self.endpoint.kind, "model resources released");
        }
    }
}

impl Drop for ModelClient {
    fn drop(&mut self) {
        if self.http.is_some() {
            tracing::warn!(
                backend = %self.endpoint.kind,
                "model client dropped without close; releasing"
            );
            self.release();
        }
    }
}

impl std::fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClient")
            .field("endpoint", &self.endpoint)
            .field("sampling", &self.sampling)
            .field("open", &self.is_open())
            .finish()
    }
}

#[async_trait]
impl TextGenerator for ModelClient {
    fn backend_name(&self) -> &str {
        self.endpoint.kind.as_str()
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let http = self.http.as_ref().ok_or_else(|| BackendError::Closed {
            backend: self.backend_name().to_string(),
        })?;
        run_chat(http, &self.endpoint, &self.sampling, prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::variables;

    struct Echo;

    #[async_trait]
    impl TextGenerator for Echo {
        fn backend_name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn test_invoke_renders_template() {
        let template = PromptTemplate::new("echo", "地址：{raw_text}");
        let response = Echo
            .invoke(&template, &variables([("raw_text", "长沙市岳麓区")]))
            .await
            .unwrap();
        assert_eq!(response.text, "地址：长沙市岳麓区");
        assert_eq!(response.backend, "echo");
    }

    #[tokio::test]
    async fn test_invoke_reports_missing_variable() {
        let template = PromptTemplate::new("echo", "{raw_text}");
        let err = Echo
            .invoke(&template, &PromptVariables::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidRequest { .. }));
        assert_eq!(err.backend(), "echo");
    }

    #[test]
    fn test_close_releases_handle() {
        let endpoint = EndpointConfig::new(BackendKind::LocalQwen, "http://localhost:11434", "qwen3:8b");
        let client = ModelClient::connect(endpoint, SamplingConfig::default()).unwrap();
        assert!(client.is_open());
        assert_eq!(client.kind(), BackendKind::LocalQwen);
        client.close();
    }
}
