//! Error types for record parsing and extraction attempts.

use extractai_llm::InvocationFailure;
use thiserror::Error;

/// Model text could not be turned into a valid record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The cleaned text was not a JSON value of the expected shape.
    #[error("invalid JSON: {reason} (input: {snippet})")]
    InvalidJson {
        /// Decoder message or shape mismatch.
        reason: String,
        /// Leading part of the cleaned text, for logs.
        snippet: String,
    },

    /// A declared required field was absent or blank.
    #[error("{record}: missing required field '{field}'")]
    MissingRequiredField {
        /// Record type name.
        record: &'static str,
        /// Field name as it appears in the JSON payload.
        field: &'static str,
    },
}

impl SchemaError {
    pub(crate) fn invalid_json(reason: impl Into<String>, cleaned: &str) -> Self {
        Self::InvalidJson {
            reason: reason.into(),
            snippet: cleaned.chars().take(120).collect(),
        }
    }
}

/// Why a single primary or backup attempt produced nothing usable.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The guarded call timed out, failed or panicked.
    #[error(transparent)]
    Invocation(#[from] InvocationFailure),

    /// The call returned text that failed schema validation.
    #[error("[{backend}] {source}")]
    Schema {
        /// Backend that produced the text.
        backend: String,
        /// Validation failure.
        #[source]
        source: SchemaError,
    },
}

impl AttemptError {
    /// Returns `true` if the attempt ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Invocation(failure) if failure.is_timeout())
    }
}

/// A document-level run could not start.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The document produced no text to send to a model.
    #[error("document '{0}' contains no extractable text")]
    EmptyDocument(String),
}
