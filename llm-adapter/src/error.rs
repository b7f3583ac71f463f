use thiserror::Error;

/// Failure of a single backend call. Every variant names the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("[{backend}] network error: {source}")]
    Network {
        backend: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("[{backend}] authentication rejected (HTTP {status}): {body}")]
    Auth {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("[{backend}] rate limited (HTTP 429): {body}")]
    RateLimited { backend: String, body: String },

    #[error("[{backend}] request failed with HTTP {status}: {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },

    #[error("[{backend}] malformed response: {reason}")]
    MalformedResponse { backend: String, reason: String },

    #[error("[{backend}] invalid request: {reason}")]
    InvalidRequest { backend: String, reason: String },

    #[error("[{backend}] client already closed")]
    Closed { backend: String },
}

impl BackendError {
    /// Name of the backend that failed.
    #[must_use]
    pub fn backend(&self) -> &str {
        match self {
            Self::Network { backend, .. }
            | Self::Auth { backend, .. }
            | Self::RateLimited { backend, .. }
            | Self::Status { backend, .. }
            | Self::MalformedResponse { backend, .. }
            | Self::InvalidRequest { backend, .. }
            | Self::Closed { backend } => backend,
        }
    }

    /// Maps a non-success HTTP status to the matching variant.
    #[must_use]
    pub fn from_status(backend: &str, status: u16, body: String) -> Self {
        let backend = backend.to_string();
        match status {
            401 | 403 => Self::Auth {
                backend,
                status,
                body,
            },
            429 => Self::RateLimited { backend, body },
            _ => Self::Status {
                backend,
                status,
                body,
            },
        }
    }
}
