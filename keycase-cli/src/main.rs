//! keycase CLI - Command-line tool for key-casing conversion
//!
//! This binary provides command-line interfaces for:
//! - camel / snake: rewrite keys in JSON/NDJSON
//! - check: report keys that are not yet in the target casing
//! - reserved: show which rule protects a key
//! - key: convert individual keys

mod config;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use config::{KeycaseConfig, TransformOverrides};
use indicatif::{ProgressBar, ProgressStyle};
use keycase_core::{Casing, DEFAULT_SENTINEL_KEY};
use keycase_io::{
    execute_check, execute_convert, CheckRequest, CheckSummary, ConvertOptions, ConvertRequest,
    ConvertSummary, InputSource, OutputSink,
};
use serde::Serialize;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "keycase")]
#[command(about = "Rewrite JSON keys between snake_case and camelCase")]
#[command(version)]
struct Cli {
    /// Config file (default: ./keycase.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite snake_case keys to camelCase
    ///
    /// Examples:
    ///   keycase camel rows.ndjson -o rows.camel.ndjson
    ///   cat payload.json | keycase camel - --json --pretty
    Camel(ConvertArgs),
    /// Rewrite camelCase keys to snake_case
    Snake(ConvertArgs),
    /// Report keys that would be rewritten; exits 1 if any
    ///
    /// Examples:
    ///   keycase check api_response.json --to camel
    ///   keycase check rows.ndjson --to snake --format json --max-report 100
    Check {
        /// Input file, or - for stdin
        input: PathBuf,
        /// Target casing
        #[arg(long, value_enum)]
        to: CasingArg,
        /// Maximum rewrites listed
        #[arg(long, default_value = "20")]
        max_report: usize,
        /// Report format (text, json)
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        #[command(flatten)]
        input_format: InputFormatArgs,
        #[command(flatten)]
        reserved: ReservedArgs,
    },
    /// Show which reserved-key rule, if any, protects each key
    Reserved {
        /// Keys to classify
        #[arg(required = true)]
        keys: Vec<String>,
        /// Report format (text, json)
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        #[command(flatten)]
        reserved: ReservedArgs,
    },
    /// Convert individual keys
    Key {
        /// Keys to convert
        #[arg(required = true)]
        keys: Vec<String>,
        /// Target casing
        #[arg(long, value_enum)]
        to: CasingArg,
        #[command(flatten)]
        reserved: ReservedArgs,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Input file, or - for stdin
    input: PathBuf,
    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(flatten)]
    input_format: InputFormatArgs,
    /// Indent JSON document output
    #[arg(long)]
    pretty: bool,
    /// Worker threads for NDJSON (1 = sequential)
    #[arg(long)]
    threads: Option<usize>,
    /// Records per parallel batch
    #[arg(long)]
    batch_records: Option<usize>,
    #[command(flatten)]
    reserved: ReservedArgs,
    /// Print key counters after converting
    #[arg(long)]
    stats: bool,
    /// Show progress spinner while converting
    #[arg(long)]
    progress: bool,
}

#[derive(Args)]
struct InputFormatArgs {
    /// Treat input as NDJSON (overrides extension detection)
    #[arg(long)]
    ndjson: bool,
    /// Treat input as a single JSON document (overrides extension detection)
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ReservedArgs {
    /// Extra reserved key (repeatable)
    #[arg(long = "reserve", value_name = "KEY")]
    reserve: Vec<String>,
    /// Drop the built-in exact reserved keys
    #[arg(long)]
    no_default_reserved: bool,
    /// Leave any mapping containing KEY untouched
    #[arg(long, value_name = "KEY", conflicts_with = "framework_sentinel")]
    sentinel_key: Option<String>,
    /// Shorthand for --sentinel-key '$$typeof'
    #[arg(long)]
    framework_sentinel: bool,
}

impl ReservedArgs {
    fn overrides(&self) -> TransformOverrides {
        let sentinel_key = match &self.sentinel_key {
            Some(key) => Some(key.clone()),
            None => self
                .framework_sentinel
                .then(|| DEFAULT_SENTINEL_KEY.to_string()),
        };
        TransformOverrides {
            reserve: self.reserve.clone(),
            no_default_reserved: self.no_default_reserved,
            sentinel_key,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CasingArg {
    Camel,
    Snake,
}

impl From<CasingArg> for Casing {
    fn from(arg: CasingArg) -> Self {
        match arg {
            CasingArg::Camel => Casing::Camel,
            CasingArg::Snake => Casing::Snake,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    let (config, config_path) = KeycaseConfig::discover(cli.config.as_deref(), &cwd)?;
    if let Some(path) = &config_path {
        info!(path = %path.display(), "loaded config");
    }

    match cli.command {
        Commands::Camel(args) => handle_convert(Casing::Camel, args, &config),
        Commands::Snake(args) => handle_convert(Casing::Snake, args, &config),
        Commands::Check {
            input,
            to,
            max_report,
            format,
            input_format,
            reserved,
        } => handle_check(
            &input,
            to.into(),
            max_report,
            format,
            &input_format,
            &reserved,
            &config,
        ),
        Commands::Reserved {
            keys,
            format,
            reserved,
        } => handle_reserved(&keys, format, &reserved, &config),
        Commands::Key { keys, to, reserved } => handle_key(&keys, to.into(), &reserved, &config),
    }
}

fn init_tracing(verbosity: u8) {
    tracing_subscriber::fmt()
        .with_max_level(verbosity_level(verbosity))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn verbosity_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn handle_convert(
    casing: Casing,
    args: ConvertArgs,
    config: &KeycaseConfig,
) -> Result<ExitCode, Box<dyn Error>> {
    let start = Instant::now();
    let transformer = config.transformer(casing, &args.reserved.overrides())?;
    let input = resolve_input_source(&args.input, &args.input_format)?;

    let output = match &args.output {
        Some(path) => {
            if !is_stdin(&args.input) && same_file(&args.input, path) {
                return Err(format!(
                    "output {} would overwrite the input file",
                    path.display()
                )
                .into());
            }
            OutputSink::Path(path.clone())
        }
        None => OutputSink::Stdout,
    };

    let options = ConvertOptions {
        transformer,
        pretty: args.pretty,
        limits: config.limits()?,
        parallel: config.parallel(args.threads, args.batch_records)?,
    };

    let mut progress_bar = args
        .progress
        .then(|| create_spinner(&format!("Converting keys to {}", casing)));
    let summary = execute_convert(ConvertRequest {
        input,
        output,
        options,
    })?;
    let elapsed = start.elapsed();
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    let rec_rate = summary.records as f64 / secs;
    if let Some(pb) = progress_bar.take() {
        pb.finish_with_message(format!(
            "Converted {} records in {:.2?} ({:.1} rec/s)",
            summary.records, elapsed, rec_rate
        ));
    }

    if summary.stats.collisions > 0 {
        warn!(
            collisions = summary.stats.collisions,
            "rewritten keys collided with existing keys; later values were kept"
        );
    }
    report_convert_summary(&summary, args.output.as_deref(), elapsed, rec_rate, args.stats)?;
    Ok(ExitCode::SUCCESS)
}

fn handle_check(
    input: &Path,
    casing: Casing,
    max_report: usize,
    format: ReportFormat,
    input_format: &InputFormatArgs,
    reserved: &ReservedArgs,
    config: &KeycaseConfig,
) -> Result<ExitCode, Box<dyn Error>> {
    let request = CheckRequest {
        input: resolve_input_source(input, input_format)?,
        transformer: config.transformer(casing, &reserved.overrides())?,
        limits: config.limits()?,
        max_reported: max_report,
    };
    let summary = execute_check(request)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        ReportFormat::Text => write_check_text(&mut out, &summary, casing)?,
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &summary)?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn write_check_text<W: Write>(
    out: &mut W,
    summary: &CheckSummary,
    casing: Casing,
) -> io::Result<()> {
    for entry in &summary.rewrites {
        if let Some(line) = entry.line {
            write!(out, "line {}: ", line)?;
        }
        writeln!(
            out,
            "{} ({} -> {})",
            entry.rewrite.pointer, entry.rewrite.from, entry.rewrite.to
        )?;
    }
    if summary.is_truncated() {
        writeln!(
            out,
            "... {} more not shown",
            summary.total_rewrites - summary.rewrites.len()
        )?;
    }
    if summary.is_clean() {
        writeln!(
            out,
            "All keys already {} ({} records checked)",
            casing_label(casing),
            summary.records
        )
    } else {
        writeln!(
            out,
            "{} keys in {} of {} records need rewriting to {}",
            summary.total_rewrites,
            summary.records_needing_rewrite,
            summary.records,
            casing_label(casing)
        )
    }
}

fn casing_label(casing: Casing) -> &'static str {
    match casing {
        Casing::Camel => "camelCase",
        Casing::Snake => "snake_case",
    }
}

#[derive(Debug, Serialize)]
struct ReservedReport<'a> {
    key: &'a str,
    reserved: bool,
    rule: Option<&'static str>,
}

fn handle_reserved(
    keys: &[String],
    format: ReportFormat,
    reserved: &ReservedArgs,
    config: &KeycaseConfig,
) -> Result<ExitCode, Box<dyn Error>> {
    let set = config.reserved_set(&reserved.overrides())?;
    let reports: Vec<ReservedReport<'_>> = keys
        .iter()
        .map(|key| {
            let rule = set.classify(key);
            ReservedReport {
                key,
                reserved: rule.is_some(),
                rule: rule.map(|rule| rule.label()),
            }
        })
        .collect();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        ReportFormat::Text => {
            for report in &reports {
                writeln!(out, "{}\t{}", report.key, report.rule.unwrap_or("transformable"))?;
            }
        }
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &reports)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn handle_key(
    keys: &[String],
    casing: Casing,
    reserved: &ReservedArgs,
    config: &KeycaseConfig,
) -> Result<ExitCode, Box<dyn Error>> {
    let transformer = config.transformer(casing, &reserved.overrides())?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for key in keys {
        writeln!(out, "{}", transformer.transform_key(key))?;
    }
    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn resolve_input_source(
    path: &Path,
    format: &InputFormatArgs,
) -> Result<InputSource, Box<dyn Error>> {
    if format.ndjson && format.json {
        return Err("--ndjson and --json are mutually exclusive".into());
    }

    if is_stdin(path) {
        let stdin = Box::new(io::stdin());
        return Ok(if format.json {
            InputSource::JsonReader(stdin)
        } else {
            InputSource::NdjsonReader(stdin)
        });
    }

    if format.ndjson {
        return Ok(InputSource::NdjsonPath(path.to_path_buf()));
    }
    if format.json {
        return Ok(InputSource::JsonPath(path.to_path_buf()));
    }

    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "json" => Ok(InputSource::JsonPath(path.to_path_buf())),
        _ => Ok(InputSource::NdjsonPath(path.to_path_buf())),
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn report_convert_summary(
    summary: &ConvertSummary,
    output: Option<&Path>,
    elapsed: Duration,
    rec_rate: f64,
    show_stats: bool,
) -> Result<(), Box<dyn Error>> {
    let mut stderr = io::stderr().lock();
    let destination = output
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    writeln!(
        &mut stderr,
        "Converted to {} (records: {}, keys rewritten: {}, bytes read: {}, elapsed: {:.2?}, {:.1} rec/s)",
        destination,
        summary.records,
        summary.stats.keys_rewritten,
        summary.bytes_read,
        elapsed,
        rec_rate
    )?;
    if show_stats {
        serde_json::to_writer_pretty(&mut stderr, summary)?;
        writeln!(&mut stderr)?;
    }
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
