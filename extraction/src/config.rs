//! Run-wide extraction settings.

use extractai_llm::DEFAULT_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum characters per document chunk.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 4000;
/// Default number of document pages read.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Settings fixed for the duration of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Deadline for each model attempt.
    pub timeout: Duration,
    /// Maximum characters per document chunk.
    pub max_chunk_chars: usize,
    /// Pages of a document read before extraction.
    pub max_pages: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

impl ExtractionConfig {
    /// Sets the per-attempt deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the chunk size; zero is raised to one.
    #[must_use]
    pub const fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = if max_chunk_chars == 0 { 1 } else { max_chunk_chars };
        self
    }

    /// Sets how many document pages are read.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractionConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.max_chunk_chars, 4000);
        assert_eq!(config.max_pages, 10);
    }

    #[test]
    fn test_builders() {
        let config = ExtractionConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_max_chunk_chars(0)
            .with_max_pages(3);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_chunk_chars, 1);
        assert_eq!(config.max_pages, 3);
    }
}
