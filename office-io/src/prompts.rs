//! Prompt templates and few-shot examples, loaded once per run.

use crate::error::ConfigurationError;
use extractai_extraction::RawExtraction;
use extractai_llm::PromptTemplate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the land-announcement prompt.
pub const LAND_PROMPT_FILE: &str = "gen_land_data.txt";
/// File name of the collateral-address prompt.
pub const COLLATERAL_PROMPT_FILE: &str = "gen_con_data.txt";
/// File name of the appraisal-report prompt.
pub const REPORT_PROMPT_FILE: &str = "gen_report_data.txt";
/// File name of the appraisal-report few-shot examples.
pub const REPORT_EXAMPLES_FILE: &str = "report_examples.json";

/// Template variable receiving the rendered few-shot examples.
pub const EXAMPLES_VAR: &str = "examples";

const BUILTIN_LAND: &str = include_str!("../prompts/gen_land_data.txt");
const BUILTIN_COLLATERAL: &str = include_str!("../prompts/gen_con_data.txt");
const BUILTIN_REPORT: &str = include_str!("../prompts/gen_report_data.txt");
const BUILTIN_REPORT_EXAMPLES: &str = include_str!("../prompts/report_examples.json");

/// One worked example: a source text and the extractions expected from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FewShotExample {
    /// Source text shown to the model.
    pub text: String,
    /// Extractions expected for `text`.
    pub extractions: Vec<RawExtraction>,
}

/// Every prompt a run may need.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptLibrary {
    land: PromptTemplate,
    collateral: PromptTemplate,
    report: PromptTemplate,
    report_examples: Vec<FewShotExample>,
}

impl PromptLibrary {
    /// The prompts compiled into the binary.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Prompt` only if the bundled examples are
    /// malformed.
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::load(None)
    }

    /// Loads prompts from `dir`, falling back to the built-in copy of any
    /// file the directory does not contain.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Prompt` when a file exists but cannot be
    /// read, or the examples file is not a JSON list of examples.
    pub fn load(dir: Option<&Path>) -> Result<Self, ConfigurationError> {
        let land = read_or(dir, LAND_PROMPT_FILE, BUILTIN_LAND)?;
        let collateral = read_or(dir, COLLATERAL_PROMPT_FILE, BUILTIN_COLLATERAL)?;
        let report = read_or(dir, REPORT_PROMPT_FILE, BUILTIN_REPORT)?;
        let examples = read_or(dir, REPORT_EXAMPLES_FILE, BUILTIN_REPORT_EXAMPLES)?;

        let report_examples = serde_json::from_str(&examples).map_err(|e| ConfigurationError::Prompt {
            path: dir.map_or_else(|| REPORT_EXAMPLES_FILE.into(), |d| d.join(REPORT_EXAMPLES_FILE)),
            reason: e.to_string(),
        })?;

        Ok(Self {
            land: template(LAND_PROMPT_FILE, land),
            collateral: template(COLLATERAL_PROMPT_FILE, collateral),
            report: template(REPORT_PROMPT_FILE, report),
            report_examples,
        })
    }

    /// Template for land-transfer announcements.
    #[must_use]
    pub const fn land(&self) -> &PromptTemplate {
        &self.land
    }

    /// Template for collateral addresses.
    #[must_use]
    pub const fn collateral(&self) -> &PromptTemplate {
        &self.collateral
    }

    /// Template for appraisal-report chunks.
    #[must_use]
    pub const fn report(&self) -> &PromptTemplate {
        &self.report
    }

    /// Few-shot examples for appraisal reports.
    #[must_use]
    pub fn report_examples(&self) -> &[FewShotExample] {
        &self.report_examples
    }

    /// Few-shot examples rendered as prompt text.
    #[must_use]
    pub fn render_report_examples(&self) -> String {
        self.report_examples
            .iter()
            .enumerate()
            .map(|(i, example)| {
                let output = serde_json::to_string(&example.extractions).unwrap_or_default();
                format!("示例{}文本：\n{}\n示例{}输出：\n{output}", i + 1, example.text, i + 1)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn template(file: &str, source: String) -> PromptTemplate {
    let name = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    PromptTemplate::new(name, source)
}

fn read_or(dir: Option<&Path>, file: &str, builtin: &str) -> Result<String, ConfigurationError> {
    let Some(path) = dir.map(|d| d.join(file)).filter(|p| p.is_file()) else {
        return Ok(builtin.to_string());
    };
    tracing::debug!(path = %path.display(), "loading prompt override");
    std::fs::read_to_string(&path).map_err(|e| ConfigurationError::Prompt {
        path,
        reason: e.to_string(),
    })
}
