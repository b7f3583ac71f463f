//! Per-run outcome accounting.

use serde::{Deserialize, Serialize};

/// Lifecycle of a [`ProcessingResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Rows are still being appended.
    #[default]
    Running,
    /// Every row reached a terminal state.
    Completed,
}

/// A row (or chunk) for which neither backend produced a valid record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based row index in the input spreadsheet (chunk position in document mode).
    pub index: usize,
    /// Text that was sent to the models.
    pub input_text: String,
    /// Cause of the backup attempt's failure.
    pub error: String,
    /// Cause of the primary attempt's failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_error: Option<String>,
}

/// Records and failures of one batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingResult<T> {
    /// Whether the run has been finalized.
    pub status: RunStatus,
    /// Number of records produced.
    pub success_count: usize,
    /// Number of rows that failed on both backends.
    pub failed_count: usize,
    /// Validated records in input order.
    pub records: Vec<T>,
    /// Failed rows in input order.
    pub failed: Vec<RowFailure>,
}

impl<T> Default for ProcessingResult<T> {
    fn default() -> Self {
        Self {
            status: RunStatus::Running,
            success_count: 0,
            failed_count: 0,
            records: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> ProcessingResult<T> {
    /// Starts an empty, running result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_record(&mut self, record: T) {
        self.records.push(record);
    }

    pub(crate) fn push_failure(&mut self, failure: RowFailure) {
        self.failed.push(failure);
    }

    /// Fixes the counts and marks the run completed.
    #[must_use]
    pub fn finalize(mut self) -> Self {
        self.success_count = self.records.len();
        self.failed_count = self.failed.len();
        self.status = RunStatus::Completed;
        self
    }

    /// Total rows accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.records.len() + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_sets_counts() {
        let mut result = ProcessingResult::new();
        result.push_record("a");
        result.push_record("b");
        result.push_failure(RowFailure {
            index: 3,
            input_text: "x".to_string(),
            error: "[kimi] inference timed out after 20s".to_string(),
            primary_error: None,
        });
        assert_eq!(result.status, RunStatus::Running);

        let result = result.finalize();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!((result.success_count, result.failed_count, result.total()), (2, 1, 3));
    }

    #[test]
    fn test_failure_serializes_without_absent_primary_error() {
        let failure = RowFailure {
            index: 1,
            input_text: "t".to_string(),
            error: "e".to_string(),
            primary_error: None,
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert!(json.get("primary_error").is_none());
    }
}
