//! Swim CLI - Command-line interface for Synheart Swim
//!
//! Commands:
//! - analyze: Run the full pipeline and emit a report envelope
//! - validate: Check raw session records for data-quality problems
//! - export: Flatten results into NDJSON rows for tabular tools
//! - config: Print the default analysis configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_swim::encoder::{RecommendationRow, ReportEncoder, SessionRow, TrendRow};
use synheart_swim::types::{DataQualityReport, Verdict};
use synheart_swim::{AnalysisConfig, AnalysisReport, SessionRecordAdapter, SwimAnalyzer};
use synheart_swim::{SCHEMA_VERSION, SWIM_VERSION};

/// Swim - Deterministic analysis of swimming session telemetry
#[derive(Parser)]
#[command(name = "swim")]
#[command(author = "Synheart AI Inc")]
#[command(version = SWIM_VERSION)]
#[command(about = "Analyze swim sessions: quality, metrics, trends, recommendations", long_about = None)]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "debug" or "synheart_swim=trace"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline on session records
    Analyze {
        /// Input file path (use - for stdin); JSON array or NDJSON
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Analysis configuration (JSON); defaults apply to omitted keys
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (pretty when writing to a terminal)
        #[arg(long)]
        output_format: Option<OutputFormat>,

        /// Fixed producer instance ID for reproducible output
        #[arg(long)]
        instance_id: Option<String>,
    },

    /// Report data-quality issues without running the pipeline
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Analysis configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write one NDJSON row per session, trend or recommendation
    Export {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Analysis configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Which table to export
        #[arg(long, default_value = "sessions")]
        table: Table,
    },

    /// Print the default configuration as JSON
    Config,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum Table {
    Sessions,
    Trends,
    Recommendations,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), SwimCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            output_format,
            instance_id,
        } => cmd_analyze(
            &input,
            &output,
            config.as_deref(),
            output_format,
            instance_id,
        ),

        Commands::Validate {
            input,
            config,
            json,
        } => cmd_validate(&input, config.as_deref(), json),

        Commands::Export {
            input,
            output,
            config,
            table,
        } => cmd_export(&input, &output, config.as_deref(), table),

        Commands::Config => {
            println!("{}", AnalysisConfig::default().to_json()?);
            Ok(())
        }
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    output_format: Option<OutputFormat>,
    instance_id: Option<String>,
) -> Result<(), SwimCliError> {
    let analyzer = load_analyzer(config)?;
    let report = analyze_input(&analyzer, input)?;

    let encoder = match instance_id {
        Some(id) => ReportEncoder::with_instance_id(id),
        None => ReportEncoder::new(),
    };
    let envelope = encoder.encode(report);

    let pretty = match output_format {
        Some(OutputFormat::JsonPretty) => true,
        Some(OutputFormat::Json) => false,
        None => is_stdout(output) && atty::is(atty::Stream::Stdout),
    };
    let mut data = if pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    data.push('\n');

    write_output(output, &data)
}

fn cmd_validate(input: &Path, config: Option<&Path>, json: bool) -> Result<(), SwimCliError> {
    let analyzer = load_analyzer(config)?;
    let records = SessionRecordAdapter::parse_auto(&read_input(input)?)?;
    if records.is_empty() {
        return Err(SwimCliError::NoSessions);
    }

    let reports = analyzer.validate_records(&records);
    let unusable = reports
        .iter()
        .filter(|r| r.verdict == Verdict::Unusable)
        .count();

    if json {
        let report = ValidationReport {
            schema: SCHEMA_VERSION,
            total_sessions: reports.len(),
            unusable_sessions: unusable,
            sessions: &reports,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_validation(&reports, unusable);
    }

    if unusable > 0 {
        Err(SwimCliError::ValidationFailed(unusable))
    } else {
        Ok(())
    }
}

fn print_validation(reports: &[DataQualityReport], unusable: usize) {
    println!("Validation Report");
    println!("=================");
    println!("Total sessions:    {}", reports.len());
    println!("Unusable sessions: {}", unusable);

    for report in reports.iter().filter(|r| !r.issues.is_empty()) {
        println!(
            "\n{} ({}, score {:.2}):",
            report.session_id,
            report.verdict.as_str(),
            report.score
        );
        for issue in &report.issues {
            let location = match (&issue.field, issue.interval_index) {
                (Some(field), _) => format!(" [{}]", field),
                (None, Some(index)) => format!(" [interval {}]", index),
                (None, None) => String::new(),
            };
            println!(
                "  - {:?} {}{}: {}",
                issue.severity,
                issue.code.as_str(),
                location,
                issue.message
            );
        }
    }
}

fn cmd_export(
    input: &Path,
    output: &Path,
    config: Option<&Path>,
    table: Table,
) -> Result<(), SwimCliError> {
    let analyzer = load_analyzer(config)?;
    let report = analyze_input(&analyzer, input)?;

    let lines = match table {
        Table::Sessions => to_ndjson(report.summaries.iter().map(SessionRow::from_summary))?,
        Table::Trends => to_ndjson(TrendRow::from_report(&report.trend))?,
        Table::Recommendations => to_ndjson(RecommendationRow::from_recommendations(
            &report.recommendations,
        ))?,
    };

    write_output(output, &lines)
}

fn load_analyzer(config: Option<&Path>) -> Result<SwimAnalyzer, SwimCliError> {
    let config = match config {
        Some(path) => AnalysisConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };
    Ok(SwimAnalyzer::new(config)?)
}

fn analyze_input(analyzer: &SwimAnalyzer, input: &Path) -> Result<AnalysisReport, SwimCliError> {
    let records = SessionRecordAdapter::parse_auto(&read_input(input)?)?;
    if records.is_empty() {
        return Err(SwimCliError::NoSessions);
    }
    Ok(analyzer.analyze_records(records)?)
}

fn to_ndjson<T: serde::Serialize>(
    rows: impl IntoIterator<Item = T>,
) -> Result<String, SwimCliError> {
    let mut out = String::new();
    for row in rows {
        out.push_str(&serde_json::to_string(&row)?);
        out.push('\n');
    }
    Ok(out)
}

fn is_stdout(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn read_input(input: &Path) -> Result<String, SwimCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), SwimCliError> {
    if is_stdout(output) {
        let mut stdout = io::stdout().lock();
        stdout.write_all(data.as_bytes())?;
        stdout.flush()?;
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum SwimCliError {
    Io(io::Error),
    Compute(synheart_swim::ComputeError),
    Json(serde_json::Error),
    NoSessions,
    ValidationFailed(usize),
}

impl From<io::Error> for SwimCliError {
    fn from(e: io::Error) -> Self {
        SwimCliError::Io(e)
    }
}

impl From<synheart_swim::ComputeError> for SwimCliError {
    fn from(e: synheart_swim::ComputeError) -> Self {
        SwimCliError::Compute(e)
    }
}

impl From<serde_json::Error> for SwimCliError {
    fn from(e: serde_json::Error) -> Self {
        SwimCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SwimCliError> for CliError {
    fn from(e: SwimCliError) -> Self {
        use synheart_swim::ComputeError;

        match e {
            SwimCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SwimCliError::Compute(ComputeError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'swim config' to see valid defaults".to_string()),
            },
            SwimCliError::Compute(ComputeError::Structural(e)) => CliError {
                code: "MALFORMED_SESSION".to_string(),
                message: e.to_string(),
                hint: Some("Run 'swim validate' for details".to_string()),
            },
            SwimCliError::Compute(ComputeError::DuplicateSessionId(id)) => CliError {
                code: "DUPLICATE_SESSION".to_string(),
                message: format!("Session id {} appears more than once", id),
                hint: Some("Give every session a unique session_id".to_string()),
            },
            SwimCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            SwimCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SwimCliError::NoSessions => CliError {
                code: "NO_SESSIONS".to_string(),
                message: "No sessions found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            SwimCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} sessions are unusable", count),
                hint: Some("Fix the reported errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport<'a> {
    schema: &'static str,
    total_sessions: usize,
    unusable_sessions: usize,
    sessions: &'a [DataQualityReport],
}
