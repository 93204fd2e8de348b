//! Parallel NDJSON conversion.
//!
//! Records are read in batches, parsed and transformed on a rayon pool, and
//! written back in input order, so the output is identical to the sequential
//! path.

use crate::reader::RecordReader;
use crate::writer::RecordWriter;
use crate::InputFormat;
use keycase_core::{KeyTransformer, KeycaseError, Result, StructuredValue, TransformStats};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::io::{BufRead, Write};
use tracing::debug;

const MAX_PARALLEL_THREADS: usize = 16;

/// Default records per parallel batch
pub const DEFAULT_BATCH_RECORDS: usize = 10_000;

/// Configuration controlling when and how records are converted in parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Worker threads. `None` picks from available cores, `Some(1)` forces
    /// sequential conversion.
    pub threads: Option<usize>,
    /// Records read and converted per batch
    pub batch_records: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            threads: None,
            batch_records: DEFAULT_BATCH_RECORDS,
        }
    }
}

impl ParallelConfig {
    /// Reject zero thread counts and zero batch sizes.
    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(KeycaseError::Config(
                "threads must be greater than zero".to_string(),
            ));
        }
        if self.batch_records == 0 {
            return Err(KeycaseError::Config(
                "batch_records must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// How a conversion ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ExecutionMode {
    /// Single-threaded
    Sequential,
    /// Batches spread across a thread pool
    Parallel {
        /// Worker threads in the pool
        threads: usize,
    },
}

/// Mode selected for an input along with a human-readable reason.
#[derive(Debug, Clone)]
pub struct ParallelDecision {
    /// Selected mode
    pub mode: ExecutionMode,
    /// Why the mode was chosen
    pub reason: String,
}

/// Pick an execution mode for `format` on this machine.
pub fn decide(format: InputFormat, config: &ParallelConfig) -> ParallelDecision {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    evaluate_parallel_decision(cores, format, config)
}

fn evaluate_parallel_decision(
    cores: usize,
    format: InputFormat,
    config: &ParallelConfig,
) -> ParallelDecision {
    if format == InputFormat::Json {
        return ParallelDecision {
            mode: ExecutionMode::Sequential,
            reason: "JSON documents are converted as a single value".to_string(),
        };
    }

    let threads = match config.threads {
        Some(requested) => requested,
        None => cores.clamp(1, MAX_PARALLEL_THREADS),
    };

    if threads <= 1 {
        let reason = if config.threads.is_some() {
            "sequential conversion requested"
        } else {
            "only one core available"
        };
        return ParallelDecision {
            mode: ExecutionMode::Sequential,
            reason: reason.to_string(),
        };
    }

    ParallelDecision {
        mode: ExecutionMode::Parallel { threads },
        reason: format!(
            "{} threads ({} cores, {} records per batch)",
            threads, cores, config.batch_records
        ),
    }
}

/// Convert NDJSON records batch by batch on a dedicated pool.
///
/// Returns the record count and merged transform statistics.
pub(crate) fn convert_ndjson_parallel<R: BufRead, W: Write>(
    records: &mut RecordReader<R>,
    writer: &mut RecordWriter<W>,
    transformer: &KeyTransformer,
    threads: usize,
    batch_records: usize,
) -> Result<(usize, TransformStats)> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("keycase-worker-{}", idx))
        .build()
        .map_err(|err| KeycaseError::Internal(format!("failed to build thread pool: {}", err)))?;

    let mut total = 0usize;
    let mut stats = TransformStats::default();
    let mut batch = Vec::with_capacity(batch_records);

    loop {
        batch.clear();
        // A read error belongs after every record already collected.
        let mut read_error = None;
        while batch.len() < batch_records {
            match records.next_raw() {
                Ok(Some(raw)) => batch.push(raw),
                Ok(None) => break,
                Err(err) => {
                    read_error = Some(err);
                    break;
                }
            }
        }
        if batch.is_empty() {
            match read_error {
                Some(err) => return Err(err),
                None => break,
            }
        }

        let converted: Vec<Result<(StructuredValue, TransformStats)>> = pool.install(|| {
            batch
                .par_iter()
                .map(|raw| raw.parse().map(|value| transformer.transform_with_stats(value)))
                .collect()
        });

        // Report the earliest bad line, whichever worker hit it.
        for result in converted {
            let (value, record_stats) = result?;
            writer.write_value(&value)?;
            stats.merge(&record_stats);
        }

        total += batch.len();
        debug!(
            batch_records = batch.len(),
            total_records = total,
            line = records.line_number(),
            "converted batch"
        );

        if let Some(err) = read_error {
            return Err(err);
        }
        if batch.len() < batch_records {
            break;
        }
    }

    Ok((total, stats))
}
