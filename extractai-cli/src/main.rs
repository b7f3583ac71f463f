//! The `extractai` binary: spreadsheet and report extraction with a local
//! model and a cloud fallback.

use clap::{Parser, Subcommand, ValueEnum};
use extractai_cli::{finish, run_collateral, run_land, run_report, Backends, CliError, ReportOptions, RunSettings};
use extractai_extraction::{ExtractionConfig, HouseInfo, LandInfo, RowRecord};
use extractai_io::{ExportSink, PromptLibrary, ReportSection, DEFAULT_EXPORT_DIR};
use extractai_llm::{connect_from_env, resolve_timeout, BackendKind, ModelClient, SamplingConfig};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Backend tried first for every row
    #[arg(long, value_enum, default_value_t = BackendArg::LocalQwen, global = true)]
    primary: BackendArg,

    /// Backend tried when the primary produced nothing valid
    #[arg(long, value_enum, default_value_t = BackendArg::Kimi, global = true)]
    backup: BackendArg,

    /// Seconds allowed for each model attempt
    #[arg(long, env = "MAX_TIMEOUT", global = true)]
    timeout: Option<u64>,

    /// Directory with prompt overrides
    #[arg(long, env = "EXTRACTAI_PROMPTS_DIR", global = true)]
    prompts_dir: Option<PathBuf>,

    /// Directory export workbooks are written to
    #[arg(long, default_value = DEFAULT_EXPORT_DIR, global = true)]
    export_dir: PathBuf,

    /// Add a raw_json sheet to each export
    #[arg(long, global = true)]
    raw_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extracts parcels from land-transfer announcements
    Land {
        /// Input spreadsheet; asked for on stdin when omitted
        path: Option<PathBuf>,
    },
    /// Splits collateral addresses into their components
    Collateral {
        /// Input spreadsheet; asked for on stdin when omitted
        path: Option<PathBuf>,
    },
    /// Extracts report facts and appraised assets from a DOCX report
    Report {
        /// Report document; asked for on stdin when omitted
        docx: Option<PathBuf>,
        /// Export file name instead of `<stem>_extraction_<timestamp>.xlsx`
        #[arg(long)]
        output: Option<String>,
        /// Number of pages read from the start of the document
        #[arg(long, default_value_t = extractai_extraction::config::DEFAULT_MAX_PAGES)]
        pages: usize,
        /// Part of the report sent to the model
        #[arg(long, value_enum, default_value_t = SectionArg::Full)]
        section: SectionArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    LocalQwen,
    Kimi,
    #[value(name = "dashscope")]
    DashScope,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::LocalQwen => Self::LocalQwen,
            BackendArg::Kimi => Self::Kimi,
            BackendArg::DashScope => Self::DashScope,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionArg {
    Full,
    Letter,
    BasicInfo,
}

impl From<SectionArg> for ReportSection {
    fn from(arg: SectionArg) -> Self {
        match arg {
            SectionArg::Full => Self::Full,
            SectionArg::Letter => Self::Letter,
            SectionArg::BasicInfo => Self::BasicInfo,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            eprintln!("错误：{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let timeout = cli.timeout.map_or_else(resolve_timeout, Duration::from_secs);
    let mut config = ExtractionConfig::default().with_timeout(timeout);
    if let Commands::Report { pages, .. } = &cli.command {
        config = config.with_max_pages(*pages);
    }

    let settings = RunSettings {
        config,
        prompts: PromptLibrary::load(cli.prompts_dir.as_deref())?,
        sink: ExportSink::new(&cli.export_dir).with_raw_json(cli.raw_json),
    };

    let mut stdout = std::io::stdout();
    let input = match &cli.command {
        Commands::Land { path } => {
            print_required_columns::<LandInfo>(&mut stdout)?;
            input_path(path.clone(), "请输入土地公告 Excel 文件路径：")?
        }
        Commands::Collateral { path } => {
            print_required_columns::<HouseInfo>(&mut stdout)?;
            input_path(path.clone(), "请输入押品地址 Excel 文件路径：")?
        }
        Commands::Report { docx, .. } => input_path(docx.clone(), "请输入估价报告 DOCX 文件路径：")?,
    };

    let primary = connect_from_env(cli.primary.into(), SamplingConfig::default())?;
    let backup = connect_from_env(cli.backup.into(), SamplingConfig::default())?;
    tracing::info!(primary = %primary.kind(), backup = %backup.kind(), timeout_secs = timeout.as_secs(), "backends ready");

    let backends = Backends {
        primary: &primary,
        backup: &backup,
    };
    let outcome = match cli.command {
        Commands::Land { .. } => run_land(backends, &settings, &input).await,
        Commands::Collateral { .. } => run_collateral(backends, &settings, &input).await,
        Commands::Report { output, section, .. } => {
            let options = ReportOptions {
                output,
                section: section.into(),
            };
            run_report(backends, &settings, &input, &options).await
        }
    };
    close_all(primary, backup);

    finish(outcome?, &mut stdout)?;
    Ok(())
}

fn close_all(primary: ModelClient, backup: ModelClient) {
    primary.close();
    backup.close();
}

fn print_required_columns<T: RowRecord>(out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "输入文件需包含以下列：{}", T::required_columns().join("、"))
}

fn input_path(given: Option<PathBuf>, question: &str) -> Result<PathBuf, CliError> {
    if let Some(path) = given {
        return Ok(path);
    }

    let mut out = std::io::stdout();
    write!(out, "{question}")?;
    out.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim().trim_matches(|c| c == '"' || c == '\'');
    if answer.is_empty() {
        return Err(CliError::MissingInput);
    }
    Ok(PathBuf::from(answer))
}
