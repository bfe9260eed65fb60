//! daylog CLI - Command-line interface for the daylog pipeline
//!
//! Commands:
//! - build: Turn a day log into a dataset (records, groups, warnings)
//! - check: Report data-quality warnings without emitting the dataset
//! - summary: Print per-category totals

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use daylog::summary::{tally, CategorySummary, TallyTotal};
use daylog::{Dataset, IngestError, LogProcessor, PipelineConfig, UnknownCategoryPolicy, Warning};
use daylog::DAYLOG_VERSION;

/// daylog - Turn a hand-written day log into an activity table
#[derive(Parser)]
#[command(name = "daylog")]
#[command(version = DAYLOG_VERSION)]
#[command(about = "Turn a hand-written day log into an activity table", long_about = None)]
struct Cli {
    /// Log level filter (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs the pipeline
#[derive(clap::Args)]
struct PipelineArgs {
    /// Input log file (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fail on the first data-quality warning
    #[arg(long)]
    strict: bool,

    /// Policy for unknown category codes (overrides the config file)
    #[arg(long)]
    unknown_category: Option<UnknownCategoryArg>,

    /// Maximum day-to-day gap inside one group (overrides the config file)
    #[arg(long)]
    gap_threshold_days: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the dataset
    Build {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        format: OutputFormat,
    },

    /// Report data-quality warnings
    Check {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print per-category totals and configured tallies
    Summary {
        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Include sleep (LO) records
        #[arg(long)]
        include_sleep: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Compact JSON dataset
    Json,
    /// Pretty-printed JSON dataset
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum UnknownCategoryArg {
    Reject,
    TagUnknown,
}

impl From<UnknownCategoryArg> for UnknownCategoryPolicy {
    fn from(arg: UnknownCategoryArg) -> Self {
        match arg {
            UnknownCategoryArg::Reject => UnknownCategoryPolicy::Reject,
            UnknownCategoryArg::TagUnknown => UnknownCategoryPolicy::TagUnknown,
        }
    }
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
        Some(level) => EnvFilter::new(format!("daylog={level}")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("daylog=warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), DaylogCliError> {
    match cli.command {
        Commands::Build {
            pipeline,
            output,
            format,
        } => cmd_build(&pipeline, &output, format),

        Commands::Check { pipeline, json } => cmd_check(&pipeline, json),

        Commands::Summary {
            pipeline,
            include_sleep,
            json,
        } => cmd_summary(&pipeline, include_sleep, json),
    }
}

fn cmd_build(
    args: &PipelineArgs,
    output: &Path,
    format: OutputFormat,
) -> Result<(), DaylogCliError> {
    let (_, dataset) = run_pipeline(args)?;
    let output_data = format_output(&dataset, &format)?;

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_check(args: &PipelineArgs, json: bool) -> Result<(), DaylogCliError> {
    let (_, dataset) = run_pipeline(args)?;

    let report = CheckReport {
        records: dataset.records.len(),
        days: dataset.day_spans.len(),
        groups: dataset.groups.len(),
        warnings: dataset.warnings,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Check Report");
        println!("============");
        println!("Days:     {}", report.days);
        println!("Records:  {}", report.records);
        println!("Groups:   {}", report.groups);
        println!("Warnings: {}", report.warnings.len());

        if !report.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &report.warnings {
                println!("  - line {}: {}", warning.line, warning.message);
            }
        }
    }

    if report.warnings.is_empty() {
        Ok(())
    } else {
        Err(DaylogCliError::WarningsFound(report.warnings.len()))
    }
}

fn cmd_summary(args: &PipelineArgs, include_sleep: bool, json: bool) -> Result<(), DaylogCliError> {
    let (processor, dataset) = run_pipeline(args)?;

    let categories = if include_sleep {
        CategorySummary::from_records(&dataset.records, processor.normalizer())
    } else {
        CategorySummary::from_records(dataset.awake_records(), processor.normalizer())
    };
    let tallies = tally(&dataset.records, &processor.config().tallies);

    let report = SummaryReport {
        categories,
        tallies,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{:<12} {:>8} {:>6} {:>8} {:>8}", "Category", "Hours", "Count", "Mean", "Median");
        for row in &report.categories {
            println!(
                "{:<12} {:>8.1} {:>6} {:>8.2} {:>8.2}",
                row.label, row.total_hours, row.count, row.mean_hours, row.median_hours
            );
        }

        if !report.tallies.is_empty() {
            println!("\nTallies:");
            for total in &report.tallies {
                println!("  {}: {:.1}h", total.name, total.hours);
            }
        }
    }

    Ok(())
}

// Helper functions

fn run_pipeline(args: &PipelineArgs) -> Result<(LogProcessor, Dataset), DaylogCliError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if args.strict {
        config.strict = true;
    }
    if let Some(policy) = args.unknown_category.clone() {
        config.on_unknown_category = policy.into();
    }
    if let Some(days) = args.gap_threshold_days {
        config.gap_threshold_days = days;
    }

    let input_data = read_input(&args.input)?;
    let processor = LogProcessor::new(config)?;
    let dataset = processor.build(&input_data)?;

    Ok((processor, dataset))
}

fn read_input(input: &Path) -> Result<String, DaylogCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(DaylogCliError::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn format_output(dataset: &Dataset, format: &OutputFormat) -> Result<String, DaylogCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in &dataset.records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(dataset)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(dataset)?),
    }
}

// Error types

#[derive(Debug)]
enum DaylogCliError {
    Io(io::Error),
    Ingest(IngestError),
    Json(serde_json::Error),
    InteractiveStdin,
    WarningsFound(usize),
}

impl From<io::Error> for DaylogCliError {
    fn from(e: io::Error) -> Self {
        DaylogCliError::Io(e)
    }
}

impl From<IngestError> for DaylogCliError {
    fn from(e: IngestError) -> Self {
        DaylogCliError::Ingest(e)
    }
}

impl From<serde_json::Error> for DaylogCliError {
    fn from(e: serde_json::Error) -> Self {
        DaylogCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<DaylogCliError> for CliError {
    fn from(e: DaylogCliError) -> Self {
        match e {
            DaylogCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            DaylogCliError::Ingest(e) => {
                let hint = match &e {
                    IngestError::Parse { .. } | IngestError::Data { .. } => {
                        "Fix the reported line or rerun without --strict"
                    }
                    IngestError::Config(_) | IngestError::Toml(_) => "Check the config file values",
                    IngestError::Io(_) => "Check input and output paths",
                };
                CliError {
                    code: e.code().to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            DaylogCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            DaylogCliError::InteractiveStdin => CliError {
                code: "NO_INPUT".to_string(),
                message: "stdin is a terminal".to_string(),
                hint: Some("Pipe a log into 'daylog ... --input -' or pass a file path".to_string()),
            },
            DaylogCliError::WarningsFound(count) => CliError {
                code: "WARNINGS_FOUND".to_string(),
                message: format!("{} data-quality warnings", count),
                hint: Some("Review the check report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct CheckReport {
    records: usize,
    days: usize,
    groups: usize,
    warnings: Vec<Warning>,
}

#[derive(serde::Serialize)]
struct SummaryReport {
    categories: Vec<CategorySummary>,
    tallies: Vec<TallyTotal>,
}
