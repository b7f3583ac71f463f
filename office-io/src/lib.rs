//! File formats around the extraction pipeline.
//!
//! Reads input rows from spreadsheets and page text from DOCX reports, loads
//! prompt files, and writes results to timestamped Excel workbooks.

/// DOCX page text.
pub mod docx;
/// Input and export error types.
pub mod error;
/// Spreadsheet row loading.
pub mod excel;
/// Excel export sink.
pub mod export;
/// Prompt templates and few-shot examples.
pub mod prompts;
/// Report section selection.
pub mod sections;

pub use docx::{read_docx_pages, read_docx_text};
pub use error::{ConfigurationError, ExportError};
pub use excel::{load_rows, load_rows_for};
pub use export::{ExportSink, DEFAULT_EXPORT_DIR};
pub use prompts::{FewShotExample, PromptLibrary, EXAMPLES_VAR};
pub use sections::ReportSection;
