//! The three extraction commands, wired from files to export.

use crate::errors::CliError;
use extractai_extraction::{
    prepare_document, BatchOrchestrator, ExtractionConfig, HouseInfo, LandInfo, RowFailure, RowRecord,
    ValuationReport,
};
use extractai_io::{
    load_rows_for, read_docx_pages, ExportError, ExportSink, PromptLibrary, ReportSection, EXAMPLES_VAR,
};
use extractai_llm::{PromptTemplate, TextGenerator};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Export prefix of the land command.
pub const LAND_EXPORT_PREFIX: &str = "地块清单";
/// Export prefix of the collateral command.
pub const COLLATERAL_EXPORT_PREFIX: &str = "解析清单";
/// Suffix appended to a report's file stem to name its export.
pub const REPORT_EXPORT_SUFFIX: &str = "_extraction";

/// The two backends every command tries in order.
#[derive(Clone, Copy)]
pub struct Backends<'a> {
    /// Tried first for every row or chunk.
    pub primary: &'a dyn TextGenerator,
    /// Tried only when the primary produced nothing valid.
    pub backup: &'a dyn TextGenerator,
}

/// Settings shared by all commands, fixed at startup.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Timeout, chunk size and page limit.
    pub config: ExtractionConfig,
    /// Templates and few-shot examples.
    pub prompts: PromptLibrary,
    /// Destination of the export workbook.
    pub sink: ExportSink,
}

/// Options specific to the report command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Export file name; defaults to `<stem>_extraction_<timestamp>.xlsx`.
    pub output: Option<String>,
    /// Part of the report sent to the model.
    pub section: ReportSection,
}

/// What a command did, ready to be summarized.
#[derive(Debug)]
pub struct RunOutcome {
    /// Records (or report rows) produced.
    pub success_count: usize,
    /// Rows or chunks that failed on both backends.
    pub failures: Vec<RowFailure>,
    /// Labelled values worth printing before the counts.
    pub headline: Vec<(&'static str, String)>,
    /// Where the records went, or why they were not written.
    pub export: Result<PathBuf, ExportError>,
}

/// Extracts one [`LandInfo`] per row of a land-announcement spreadsheet.
///
/// # Errors
///
/// Returns `CliError::Configuration` if the spreadsheet is unreadable or lacks
/// a required column. Export failures are carried in the outcome.
pub async fn run_land(backends: Backends<'_>, settings: &RunSettings, path: &Path) -> Result<RunOutcome, CliError> {
    run_rows::<LandInfo>(backends, settings, settings.prompts.land(), path, LAND_EXPORT_PREFIX).await
}

/// Extracts one [`HouseInfo`] per row of a collateral-address spreadsheet.
///
/// # Errors
///
/// Same as [`run_land`].
pub async fn run_collateral(
    backends: Backends<'_>,
    settings: &RunSettings,
    path: &Path,
) -> Result<RunOutcome, CliError> {
    run_rows::<HouseInfo>(
        backends,
        settings,
        settings.prompts.collateral(),
        path,
        COLLATERAL_EXPORT_PREFIX,
    )
    .await
}

async fn run_rows<T: RowRecord>(
    backends: Backends<'_>,
    settings: &RunSettings,
    template: &PromptTemplate,
    path: &Path,
    prefix: &str,
) -> Result<RunOutcome, CliError> {
    let rows = load_rows_for::<T>(path)?;
    let orchestrator =
        BatchOrchestrator::new(backends.primary, backends.backup, template).with_config(settings.config);

    let result = orchestrator.run_rows::<T>(&rows).await;
    let export = settings.sink.export(prefix, &result.records);

    Ok(RunOutcome {
        success_count: result.success_count,
        failures: result.failed,
        headline: Vec::new(),
        export,
    })
}

/// Extracts report header facts and assets from the first pages of a DOCX.
///
/// # Errors
///
/// Returns `CliError::Configuration` for an unreadable document,
/// `CliError::SectionNotFound` if the requested section is absent and
/// `CliError::Extraction` if no text remains to send.
pub async fn run_report(
    backends: Backends<'_>,
    settings: &RunSettings,
    docx: &Path,
    options: &ReportOptions,
) -> Result<RunOutcome, CliError> {
    let stem = docx
        .file_stem()
        .map_or_else(|| "report".to_string(), |s| s.to_string_lossy().into_owned());

    let pages = read_docx_pages(docx, settings.config.max_pages)?;
    let pages = match options.section {
        ReportSection::Full => pages,
        section => {
            let text = section
                .select(&pages.join("\n\n"))
                .ok_or_else(|| CliError::SectionNotFound(section.as_str().to_string()))?;
            vec![text]
        }
    };
    let chunks = prepare_document(&stem, &pages, &settings.config)?;

    let orchestrator = BatchOrchestrator::new(backends.primary, backends.backup, settings.prompts.report())
        .with_config(settings.config)
        .with_variable(EXAMPLES_VAR, settings.prompts.render_report_examples());
    let document = orchestrator.run_document(&chunks).await;
    tracing::info!(
        raw = document.raw_count,
        kept = document.extractions.len(),
        failed_chunks = document.failed.len(),
        "document extracted"
    );

    let report = ValuationReport::from_extractions(&document.extractions);
    let targets = if document.extractions.is_empty() {
        Vec::new()
    } else {
        report.to_targets()
    };
    let export = export_report(&settings.sink, &stem, options.output.as_deref(), &targets);

    Ok(RunOutcome {
        success_count: targets.len(),
        failures: document.failed,
        headline: vec![
            ("报告编号", report.report_number.clone()),
            ("报告时间", report.report_date.clone()),
            ("银行", report.bank.clone()),
            ("委托人", report.client.clone()),
        ],
        export,
    })
}

fn export_report<T: Serialize>(
    sink: &ExportSink,
    stem: &str,
    output: Option<&str>,
    rows: &[T],
) -> Result<PathBuf, ExportError> {
    match output {
        Some(name) => sink.export_as(name, rows),
        None => sink.export(&format!("{stem}{REPORT_EXPORT_SUFFIX}"), rows),
    }
}
