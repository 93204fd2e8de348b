//! keycase I/O - Streaming conversion and high-level APIs
//!
//! This crate provides the file I/O layer on top of `keycase-core`:
//!
//! - NDJSON record streams and whole JSON documents
//! - High-level convert and check requests
//! - Parallel batch conversion for NDJSON

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod parallel;
pub mod reader;
pub mod writer;

// Re-export commonly used types
pub use keycase_core::{
    Casing, KeyRewrite, KeyTransformer, KeycaseError, Limits, ReservedKeySet, Result,
    StructuredValue, TransformStats,
};
pub use parallel::{ExecutionMode, ParallelConfig, ParallelDecision};
pub use reader::{read_document, RawRecord, RecordReader};
pub use writer::{OutputFormat, RecordWriter};

use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::{debug, trace};

/// Layout of an input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// One JSON value per line
    Ndjson,
    /// A single JSON document
    Json,
}

/// Input source for convert and check requests
pub enum InputSource {
    /// NDJSON file on disk
    NdjsonPath(PathBuf),
    /// JSON document file on disk
    JsonPath(PathBuf),
    /// NDJSON from an arbitrary reader
    NdjsonReader(Box<dyn Read + Send>),
    /// JSON document from an arbitrary reader
    JsonReader(Box<dyn Read + Send>),
}

impl InputSource {
    /// Layout of this source
    pub fn format(&self) -> InputFormat {
        match self {
            InputSource::NdjsonPath(_) | InputSource::NdjsonReader(_) => InputFormat::Ndjson,
            InputSource::JsonPath(_) | InputSource::JsonReader(_) => InputFormat::Json,
        }
    }

    fn open(self) -> Result<Box<dyn BufRead + Send>> {
        Ok(match self {
            InputSource::NdjsonPath(path) | InputSource::JsonPath(path) => {
                Box::new(BufReader::new(File::open(path)?))
            }
            InputSource::NdjsonReader(reader) | InputSource::JsonReader(reader) => {
                Box::new(BufReader::new(reader))
            }
        })
    }
}

impl std::fmt::Debug for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::NdjsonPath(path) => f.debug_tuple("NdjsonPath").field(path).finish(),
            InputSource::JsonPath(path) => f.debug_tuple("JsonPath").field(path).finish(),
            InputSource::NdjsonReader(_) => f.write_str("NdjsonReader(..)"),
            InputSource::JsonReader(_) => f.write_str("JsonReader(..)"),
        }
    }
}

/// Output sink for converted data
pub enum OutputSink {
    /// File on disk (created or truncated)
    Path(PathBuf),
    /// Process standard output
    Stdout,
    /// Arbitrary writer
    Writer(Box<dyn Write + Send>),
}

impl OutputSink {
    fn open(self) -> Result<Box<dyn Write + Send>> {
        Ok(match self {
            OutputSink::Path(path) => Box::new(BufWriter::new(File::create(path)?)),
            OutputSink::Stdout => Box::new(io::stdout()),
            OutputSink::Writer(writer) => writer,
        })
    }
}

/// High-level conversion options
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Transformer applied to every record
    pub transformer: KeyTransformer,
    /// Indent JSON document output (ignored for NDJSON)
    pub pretty: bool,
    /// Input buffering limits
    pub limits: Limits,
    /// Parallel batch settings
    pub parallel: ParallelConfig,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            transformer: KeyTransformer::camel(),
            pretty: false,
            limits: Limits::default(),
            parallel: ParallelConfig::default(),
        }
    }
}

/// A single conversion job
pub struct ConvertRequest {
    /// Where records come from
    pub input: InputSource,
    /// Where converted records go
    pub output: OutputSink,
    /// How to convert
    pub options: ConvertOptions,
}

/// Outcome of [`execute_convert`]
#[derive(Debug, Clone, Serialize)]
pub struct ConvertSummary {
    /// Values written (records for NDJSON, 1 for a JSON document)
    pub records: usize,
    /// Input bytes consumed
    pub bytes_read: u64,
    /// Merged transform counters
    pub stats: TransformStats,
    /// How the conversion ran
    pub execution: ExecutionMode,
}

/// Convert every record in `request.input` and write it to `request.output`.
pub fn execute_convert(request: ConvertRequest) -> Result<ConvertSummary> {
    let ConvertRequest {
        input,
        output,
        options,
    } = request;
    options.limits.validate()?;
    options.parallel.validate()?;

    let format = input.format();
    let decision = parallel::decide(format, &options.parallel);
    debug!(
        ?format,
        mode = ?decision.mode,
        reason = %decision.reason,
        casing = %options.transformer.casing(),
        "starting conversion"
    );

    let reader = input.open()?;
    let sink = output.open()?;

    let summary = match format {
        InputFormat::Ndjson => {
            let mut records = RecordReader::new(reader, options.limits);
            let mut writer = RecordWriter::new(sink, OutputFormat::Ndjson);
            let (count, stats) = match decision.mode {
                ExecutionMode::Sequential => {
                    convert_ndjson_sequential(&mut records, &mut writer, &options.transformer)?
                }
                ExecutionMode::Parallel { threads } => parallel::convert_ndjson_parallel(
                    &mut records,
                    &mut writer,
                    &options.transformer,
                    threads,
                    options.parallel.batch_records,
                )?,
            };
            writer.finish()?.flush()?;
            ConvertSummary {
                records: count,
                bytes_read: records.bytes_read(),
                stats,
                execution: decision.mode,
            }
        }
        InputFormat::Json => {
            let (value, bytes_read) = read_document(reader, &options.limits)?;
            let (value, stats) = options.transformer.transform_with_stats(value);
            let mut writer = RecordWriter::new(
                sink,
                OutputFormat::Json {
                    pretty: options.pretty,
                },
            );
            writer.write_value(&value)?;
            writer.finish()?.flush()?;
            ConvertSummary {
                records: 1,
                bytes_read,
                stats,
                execution: decision.mode,
            }
        }
    };

    if summary.stats.sentinel_bypasses > 0 {
        debug!(
            bypasses = summary.stats.sentinel_bypasses,
            "mappings skipped by sentinel key"
        );
    }
    if summary.stats.collisions > 0 {
        debug!(collisions = summary.stats.collisions, "keys collided after rewriting");
    }
    Ok(summary)
}

fn convert_ndjson_sequential<R: BufRead, W: Write>(
    records: &mut RecordReader<R>,
    writer: &mut RecordWriter<W>,
    transformer: &KeyTransformer,
) -> Result<(usize, TransformStats)> {
    let mut count = 0usize;
    let mut stats = TransformStats::default();
    for record in records {
        let (line, value) = record?;
        let (value, record_stats) = transformer.transform_with_stats(value);
        trace!(line, rewritten = record_stats.keys_rewritten, "converted record");
        writer.write_value(&value)?;
        stats.merge(&record_stats);
        count += 1;
    }
    Ok((count, stats))
}

/// A key that needs rewriting, located by record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRewrite {
    /// NDJSON line number; `None` for a JSON document
    pub line: Option<usize>,
    /// The key and its rewritten form
    #[serde(flatten)]
    pub rewrite: KeyRewrite,
}

/// A single audit job
pub struct CheckRequest {
    /// Where records come from
    pub input: InputSource,
    /// Transformer whose target casing is checked
    pub transformer: KeyTransformer,
    /// Input buffering limits
    pub limits: Limits,
    /// Maximum rewrites kept in the summary
    pub max_reported: usize,
}

/// Outcome of [`execute_check`]
#[derive(Debug, Clone, Serialize)]
pub struct CheckSummary {
    /// Values examined
    pub records: usize,
    /// Values with at least one key to rewrite
    pub records_needing_rewrite: usize,
    /// Keys to rewrite across all values
    pub total_rewrites: usize,
    /// The first `max_reported` rewrites in input order
    pub rewrites: Vec<RecordRewrite>,
}

impl CheckSummary {
    /// Whether every key already conforms
    pub fn is_clean(&self) -> bool {
        self.total_rewrites == 0
    }

    /// Whether more rewrites exist than were reported
    pub fn is_truncated(&self) -> bool {
        self.rewrites.len() < self.total_rewrites
    }

    fn record(&mut self, line: Option<usize>, rewrites: Vec<KeyRewrite>, max_reported: usize) {
        self.records += 1;
        if rewrites.is_empty() {
            return;
        }
        self.records_needing_rewrite += 1;
        self.total_rewrites += rewrites.len();
        let room = max_reported.saturating_sub(self.rewrites.len());
        self.rewrites.extend(
            rewrites
                .into_iter()
                .take(room)
                .map(|rewrite| RecordRewrite { line, rewrite }),
        );
    }
}

/// Audit every record in `request.input` without writing anything.
pub fn execute_check(request: CheckRequest) -> Result<CheckSummary> {
    let CheckRequest {
        input,
        transformer,
        limits,
        max_reported,
    } = request;
    limits.validate()?;

    let format = input.format();
    let reader = input.open()?;
    let mut summary = CheckSummary {
        records: 0,
        records_needing_rewrite: 0,
        total_rewrites: 0,
        rewrites: Vec::new(),
    };

    match format {
        InputFormat::Ndjson => {
            for record in RecordReader::new(reader, limits) {
                let (line, value) = record?;
                summary.record(Some(line), transformer.audit(&value), max_reported);
            }
        }
        InputFormat::Json => {
            let (value, _) = read_document(reader, &limits)?;
            summary.record(None, transformer.audit(&value), max_reported);
        }
    }

    debug!(
        records = summary.records,
        rewrites = summary.total_rewrites,
        casing = %transformer.casing(),
        "check finished"
    );
    Ok(summary)
}

/// Convert one JSON document held in memory.
pub fn convert_str(input: &str, transformer: &KeyTransformer) -> Result<String> {
    let value: StructuredValue = serde_json::from_str(input)?;
    let value = transformer.transform_owned(value);
    Ok(serde_json::to_string(&value)?)
}
