//! Deadline-bounded model invocation that never propagates a failure.
//!
//! This is the containment boundary between orchestration and network I/O:
//! timeouts, backend errors and panics inside the call all come back as data.

use crate::client::TextGenerator;
use crate::error::BackendError;
use crate::prompt::{PromptTemplate, PromptVariables};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use thiserror::Error;

/// Why a guarded invocation produced no text.
#[derive(Debug, Error)]
pub enum InvocationFailure {
    /// The call did not finish before the deadline.
    #[error("[{backend}] inference timed out after {}s", timeout.as_secs_f32())]
    TimedOut {
        /// Backend that was being waited on.
        backend: String,
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The backend returned an error.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The call panicked.
    #[error("[{backend}] inference panicked: {message}")]
    Panicked {
        /// Backend whose call panicked.
        backend: String,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl InvocationFailure {
    /// Returns `true` for [`InvocationFailure::TimedOut`].
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

/// Invokes `client` with a deadline, returning the generated text or `None`.
///
/// Never propagates: every failure is logged and collapsed into `None`.
pub async fn invoke_with_timeout(
    client: &dyn TextGenerator,
    template: &PromptTemplate,
    variables: &PromptVariables,
    timeout: Duration,
) -> Option<String> {
    guarded_invoke(client, template, variables, timeout).await.ok()
}

/// Same containment as [`invoke_with_timeout`], keeping the failure cause.
///
/// # Errors
///
/// Returns the contained [`InvocationFailure`]; the caller decides what to do
/// with it, nothing is ever re-raised.
pub async fn guarded_invoke(
    client: &dyn TextGenerator,
    template: &PromptTemplate,
    variables: &PromptVariables,
    timeout: Duration,
) -> Result<String, InvocationFailure> {
    let backend = client.backend_name().to_string();
    let call = AssertUnwindSafe(client.invoke(template, variables)).catch_unwind();

    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(Ok(response))) => Ok(response.text),
        Ok(Ok(Err(err))) => {
            tracing::warn!(backend = %backend, error = %err, "inference failed");
            Err(InvocationFailure::Backend(err))
        }
        Ok(Err(payload)) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(backend = %backend, %message, "inference panicked");
            Err(InvocationFailure::Panicked { backend, message })
        }
        Err(_elapsed) => {
            tracing::warn!(
                backend = %backend,
                timeout_secs = timeout.as_secs_f32(),
                "inference timed out"
            );
            Err(InvocationFailure::TimedOut { backend, timeout })
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
