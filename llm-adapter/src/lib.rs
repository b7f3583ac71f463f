//! Text generation over the model backends used by the extraction pipeline.
//!
//! This crate provides endpoint resolution, request construction and
//! execution for a local Ollama backend and OpenAI-compatible cloud backends,
//! plus the timeout guard that turns every call failure into data.

/// The `TextGenerator` capability and the HTTP-backed `ModelClient`.
pub mod client;
/// Request body construction per wire protocol.
pub mod cmd;
/// Endpoint resolution from environment variables.
pub mod discovery;
/// Error types returned by backend calls.
pub mod error;
/// Deadline-bounded, failure-containing invocation.
pub mod guard;
/// HTTP execution of a single chat request.
pub mod process;
/// `{name}`-placeholder prompt templates.
pub mod prompt;
/// Shared configuration and response types.
pub mod types;

pub use client::{ModelClient, TextGenerator};
pub use discovery::{resolve_endpoint, resolve_timeout, DEFAULT_TIMEOUT};
pub use error::BackendError;
pub use guard::{guarded_invoke, invoke_with_timeout, InvocationFailure};
pub use prompt::{variables, PromptError, PromptTemplate, PromptVariables};
pub use types::*;

/// Connects a client for `kind` using endpoint settings from the environment.
///
/// # Errors
///
/// Returns `BackendError::InvalidRequest` if the HTTP client cannot be built.
pub fn connect_from_env(kind: BackendKind, sampling: SamplingConfig) -> Result<ModelClient, BackendError> {
    ModelClient::connect(resolve_endpoint(kind), sampling)
}
