//! Top-level error of the `extractai` commands.

use extractai_extraction::ExtractionError;
use extractai_io::{ConfigurationError, ExportError};
use extractai_llm::BackendError;
use thiserror::Error;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Input or prompt files unusable; raised before any model call.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The document produced nothing to extract.
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Results could not be written.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// A model client could not be created.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// No input path was given, neither as an argument nor on stdin.
    #[error("no input file given")]
    MissingInput,

    /// The requested report section does not occur in the document.
    #[error("section '{0}' not found in document")]
    SectionNotFound(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
