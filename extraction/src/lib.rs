//! Structured record extraction from model output.
//!
//! Row mode turns each spreadsheet row into one validated record
//! ([`LandInfo`], [`HouseInfo`]) or one failure entry. Document mode collects
//! labelled extractions from every chunk of a document, deduplicates them
//! with [`reconcile`] and folds them into a [`ValuationReport`].

pub mod chunk;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod raw;
pub mod reconcile;
pub mod records;
pub mod report;
pub mod result;
pub mod schema;

pub use chunk::{chunk_pages, split_by_chars, TextChunk};
pub use config::ExtractionConfig;
pub use error::{AttemptError, ExtractionError, SchemaError};
pub use orchestrator::{
    BatchOrchestrator, BLANK_INPUT_ERROR, DocumentResult, InputRow, RowOutcome, RAW_TEXT_VAR, SCHEMA_VAR,
};
pub use raw::{parse_extractions, RawExtraction, Span};
pub use reconcile::reconcile;
pub use records::{HouseInfo, LandInfo, ValuationTarget};
pub use report::{AssetInfo, ValuationReport};
pub use result::{ProcessingResult, RowFailure, RunStatus};
pub use schema::{clean_model_output, parse_record, RecordSchema, RowRecord};

/// Splits document pages into chunks ready for [`BatchOrchestrator::run_document`].
///
/// # Errors
///
/// Returns [`ExtractionError::EmptyDocument`] when no page contains text.
pub fn prepare_document(
    name: &str,
    pages: &[String],
    config: &ExtractionConfig,
) -> Result<Vec<TextChunk>, ExtractionError> {
    let chunks = chunk_pages(pages, config.max_chunk_chars);
    if chunks.is_empty() {
        return Err(ExtractionError::EmptyDocument(name.to_string()));
    }
    tracing::debug!(document = name, pages = pages.len(), chunks = chunks.len(), "document chunked");
    Ok(chunks)
}
