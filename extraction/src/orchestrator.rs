//! Primary/backup orchestration over spreadsheet rows and document chunks.
//!
//! Every row walks the same path: one guarded attempt on the primary backend,
//! and only if that produced no valid record, one guarded attempt on the
//! backup. A row that fails both ends up in the failure list; nothing a row
//! does can stop the run.

use crate::chunk::TextChunk;
use crate::config::ExtractionConfig;
use crate::error::{AttemptError, SchemaError};
use crate::raw::{parse_extractions, RawExtraction};
use crate::reconcile::reconcile;
use crate::result::{ProcessingResult, RowFailure};
use crate::schema::{parse_record, RowRecord};
use extractai_llm::{guarded_invoke, PromptTemplate, PromptVariables, TextGenerator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Template variable receiving the row or chunk text.
pub const RAW_TEXT_VAR: &str = "raw_text";
/// Template variable receiving the record's JSON Schema.
pub const SCHEMA_VAR: &str = "schema";
/// Failure recorded for a row whose input cell is blank; no model is called.
pub const BLANK_INPUT_ERROR: &str = "input text is blank";

/// One spreadsheet row ready for extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRow {
    /// 1-based row index, excluding the header.
    pub index: usize,
    /// Value of the record's input column.
    pub text: String,
    /// Values of the record's metadata columns.
    pub metadata: BTreeMap<String, String>,
}

impl InputRow {
    /// Creates a row with no metadata.
    #[must_use]
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Adds one metadata column value.
    #[must_use]
    pub fn with_metadata(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(column.into(), value.into());
        self
    }
}

/// Terminal state of one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome<T> {
    /// The primary backend produced a valid record.
    Primary(T),
    /// The primary failed and the backup produced a valid record.
    Backup(T),
    /// Both attempts failed.
    Failed(RowFailure),
}

/// Extractions gathered from all chunks of one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentResult {
    /// Reconciled extractions in document order.
    pub extractions: Vec<RawExtraction>,
    /// Extractions parsed before reconciliation.
    pub raw_count: usize,
    /// Chunks for which neither backend produced a parseable list.
    pub failed: Vec<RowFailure>,
}

/// Runs rows or chunks through a primary and a backup backend.
pub struct BatchOrchestrator<'a> {
    primary: &'a dyn TextGenerator,
    backup: &'a dyn TextGenerator,
    template: &'a PromptTemplate,
    config: ExtractionConfig,
    extra_vars: PromptVariables,
}

impl<'a> BatchOrchestrator<'a> {
    /// Creates an orchestrator with default settings.
    #[must_use]
    pub fn new(
        primary: &'a dyn TextGenerator,
        backup: &'a dyn TextGenerator,
        template: &'a PromptTemplate,
    ) -> Self {
        Self {
            primary,
            backup,
            template,
            config: ExtractionConfig::default(),
            extra_vars: PromptVariables::new(),
        }
    }

    /// Replaces the run settings.
    #[must_use]
    pub const fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds a template variable shared by every call, such as few-shot examples.
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_vars.insert(name.into(), value.into());
        self
    }

    /// Current run settings.
    #[must_use]
    pub const fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Processes rows strictly in order and returns the finalized result.
    pub async fn run_rows<T: RowRecord>(&self, rows: &[InputRow]) -> ProcessingResult<T> {
        let mut result = ProcessingResult::new();
        tracing::info!(
            rows = rows.len(),
            record = T::NAME,
            primary = self.primary.backend_name(),
            backup = self.backup.backend_name(),
            "starting batch"
        );

        for row in rows {
            match self.process_row::<T>(row).await {
                RowOutcome::Primary(record) | RowOutcome::Backup(record) => result.push_record(record),
                RowOutcome::Failed(failure) => result.push_failure(failure),
            }
        }

        let result = result.finalize();
        tracing::info!(
            success = result.success_count,
            failed = result.failed_count,
            "batch finished"
        );
        result
    }

    /// Drives one row to its terminal state.
    ///
    /// A row with blank input fails immediately without calling a backend.
    pub async fn process_row<T: RowRecord>(&self, row: &InputRow) -> RowOutcome<T> {
        if row.text.trim().is_empty() {
            tracing::warn!(index = row.index, "row has blank input; not sent to a model");
            return RowOutcome::Failed(RowFailure {
                index: row.index,
                input_text: row.text.clone(),
                error: BLANK_INPUT_ERROR.to_string(),
                primary_error: None,
            });
        }

        let vars = self.variables_for::<T>(&row.text);

        let primary_error = match self.attempt(self.primary, &vars, parse_record::<T>).await {
            Ok(mut record) => {
                record.attach_metadata(&row.text, &row.metadata);
                tracing::info!(index = row.index, backend = self.primary.backend_name(), "row extracted");
                return RowOutcome::Primary(record);
            }
            Err(err) => {
                tracing::warn!(index = row.index, error = %err, "primary attempt failed; trying backup");
                err
            }
        };

        match self.attempt(self.backup, &vars, parse_record::<T>).await {
            Ok(mut record) => {
                record.attach_metadata(&row.text, &row.metadata);
                tracing::info!(index = row.index, backend = self.backup.backend_name(), "row extracted by backup");
                RowOutcome::Backup(record)
            }
            Err(err) => {
                tracing::error!(
                    index = row.index,
                    error = %err,
                    primary_error = %primary_error,
                    "row failed on both backends"
                );
                RowOutcome::Failed(RowFailure {
                    index: row.index,
                    input_text: row.text.clone(),
                    error: err.to_string(),
                    primary_error: Some(primary_error.to_string()),
                })
            }
        }
    }

    /// Extracts every chunk of a document and reconciles the results.
    ///
    /// Each extraction is stamped with its chunk's page. Chunks that fail on
    /// both backends are reported with their 1-based chunk position.
    pub async fn run_document(&self, chunks: &[TextChunk]) -> DocumentResult {
        let mut collected = Vec::new();
        let mut failed = Vec::new();

        for chunk in chunks {
            let vars = self.variables(&chunk.text, None);
            let parsed = match self.attempt(self.primary, &vars, parse_extractions).await {
                Ok(items) => Ok(items),
                Err(primary_error) => {
                    tracing::warn!(chunk = chunk.index, error = %primary_error, "primary attempt failed; trying backup");
                    self.attempt(self.backup, &vars, parse_extractions)
                        .await
                        .map_err(|err| (primary_error, err))
                }
            };

            match parsed {
                Ok(items) => {
                    tracing::info!(chunk = chunk.index, page = chunk.page, extractions = items.len(), "chunk extracted");
                    collected.extend(items.into_iter().map(|item| item.with_page(chunk.page)));
                }
                Err((primary_error, err)) => {
                    tracing::error!(chunk = chunk.index, error = %err, "chunk failed on both backends");
                    failed.push(RowFailure {
                        index: chunk.index + 1,
                        input_text: chunk.text.clone(),
                        error: err.to_string(),
                        primary_error: Some(primary_error.to_string()),
                    });
                }
            }
        }

        let raw_count = collected.len();
        DocumentResult {
            extractions: reconcile(collected),
            raw_count,
            failed,
        }
    }

    async fn attempt<R>(
        &self,
        client: &dyn TextGenerator,
        vars: &PromptVariables,
        parse: fn(&str) -> Result<R, SchemaError>,
    ) -> Result<R, AttemptError> {
        let text = guarded_invoke(client, self.template, vars, self.config.timeout).await?;
        parse(&text).map_err(|source| AttemptError::Schema {
            backend: client.backend_name().to_string(),
            source,
        })
    }

    fn variables_for<T: RowRecord>(&self, text: &str) -> PromptVariables {
        let wants_schema = self.template.variables().iter().any(|v| v == SCHEMA_VAR);
        let schema = wants_schema.then(|| T::schema_json().to_string());
        self.variables(text, schema)
    }

    fn variables(&self, text: &str, schema: Option<String>) -> PromptVariables {
        let mut vars = self.extra_vars.clone();
        vars.insert(RAW_TEXT_VAR.to_string(), text.to_string());
        if let Some(schema) = schema {
            vars.insert(SCHEMA_VAR.to_string(), schema);
        }
        tracing::debug!(
            template = self.template.name(),
            input_chars = text.chars().count(),
            "rendering prompt"
        );
        vars
    }
}
