//! Error types for input loading and export.

use std::path::PathBuf;
use thiserror::Error;

/// Input that makes a run impossible; detected before any model call.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The input file could not be opened or decoded.
    #[error("cannot read '{}': {reason}", path.display())]
    Unreadable {
        /// Offending file.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },

    /// The workbook has no worksheet.
    #[error("'{}' contains no worksheet", path.display())]
    NoWorksheet {
        /// Offending workbook.
        path: PathBuf,
    },

    /// Required columns are absent from the header row.
    #[error("'{}' is missing required column(s): {}", path.display(), missing.join(", "))]
    MissingColumns {
        /// Offending workbook.
        path: PathBuf,
        /// Columns that were expected but not found.
        missing: Vec<String>,
    },

    /// A prompt file exists but cannot be read or parsed.
    #[error("cannot load prompt '{}': {reason}", path.display())]
    Prompt {
        /// Prompt file.
        path: PathBuf,
        /// Underlying cause.
        reason: String,
    },
}

/// Failure to write an export file.
#[derive(Debug, Error)]
pub enum ExportError {
    /// There were no records to export; nothing was written.
    #[error("no records to export for '{prefix}'")]
    EmptyInput {
        /// Output name prefix of the skipped export.
        prefix: String,
    },

    /// Creating the export directory failed.
    #[error("cannot create export directory '{}'", path.display())]
    Io {
        /// Directory being created.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be turned into a row.
    #[error("cannot serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The workbook writer failed.
    #[error("cannot write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
