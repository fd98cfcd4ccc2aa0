//! Parallel decoding of independent trace files.
//!
//! Each file is read, decoded, and optionally written back on its own rayon task. Tasks share
//! the registry and configuration read-only; every task owns its bank state machine. A fatal
//! error ends only its own file: the outcome records it and the other files continue.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span};

use crate::analysis::bounds::record_length;
use crate::analysis::stats::CommandStats;
use crate::common::error::{DecodeError, FileError, TraceError};
use crate::config::{BatchConfig, Config};
use crate::decode::pipeline::{DecodedTrace, TraceDecoder};
use crate::protocol::Registry;
use crate::trace::{reader, writer};

/// Suffix of decoded stream files; inputs with this suffix are skipped during discovery.
pub const DECODED_SUFFIX: &str = ".decoded.csv";

/// Errors that stop a whole batch before any file is decoded.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The decoder could not be built from the configuration.
    #[error(transparent)]
    Decoder(#[from] DecodeError),

    /// The worker pool could not be created.
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// One file to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    /// Trace to read.
    pub input: PathBuf,
    /// Decoded stream destination; `None` decodes without writing.
    pub output: Option<PathBuf>,
}

impl BatchJob {
    /// Job writing next to `input`, or into `out_dir` when given.
    pub fn new(input: PathBuf, out_dir: Option<&Path>) -> Self {
        let output = output_path(&input, out_dir);
        Self {
            input,
            output: Some(output),
        }
    }
}

/// A successfully decoded file.
#[derive(Debug, Clone)]
pub struct FileDecode {
    /// Decoded stream, report, statistics, and final bank states.
    pub trace: DecodedTrace,
    /// Signal-consistency glitches found while reading.
    pub glitches: usize,
    /// Capture length in seconds.
    pub record_sec: f64,
}

/// Result of one job.
#[derive(Debug)]
pub struct FileOutcome {
    /// The job.
    pub job: BatchJob,
    /// Decode result; an error only affects this file.
    pub result: Result<FileDecode, FileError>,
}

/// Serializable per-file summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileSummary {
    /// Input path.
    pub file: String,
    /// Retained commands.
    pub decoded: usize,
    /// Unknown rows.
    pub unknown: usize,
    /// Dropped two-cycle commands.
    pub unresolved: usize,
    /// Suppressed oversampling repeats.
    pub suppressed: usize,
    /// Signal-consistency glitches.
    pub glitches: usize,
    /// Capture length in seconds.
    pub record_sec: f64,
    /// Fatal error message, if the file was abandoned.
    pub error: Option<String>,
}

impl From<&FileOutcome> for FileSummary {
    fn from(outcome: &FileOutcome) -> Self {
        let file = outcome.job.input.display().to_string();
        match &outcome.result {
            Ok(decode) => Self {
                file,
                decoded: decode.trace.commands.len(),
                unknown: decode.trace.report.unknown,
                unresolved: decode.trace.report.unresolved,
                suppressed: decode.trace.report.suppressed,
                glitches: decode.glitches,
                record_sec: decode.record_sec,
                error: None,
            },
            Err(err) => Self {
                file,
                decoded: 0,
                unknown: 0,
                unresolved: 0,
                suppressed: 0,
                glitches: 0,
                record_sec: 0.0,
                error: Some(err.to_string()),
            },
        }
    }
}

/// Serializable summary of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    /// One entry per job, in job order.
    pub files: Vec<FileSummary>,
    /// Files abandoned on a fatal error.
    pub failed: usize,
    /// Command counts over every successful file.
    pub counts: BTreeMap<&'static str, u64>,
}

/// Outcomes of a batch, in job order.
#[derive(Debug)]
pub struct BatchRun {
    /// One outcome per job.
    pub outcomes: Vec<FileOutcome>,
}

impl BatchRun {
    /// Statistics merged over every successful file.
    pub fn merged_stats(&self) -> CommandStats {
        let mut merged = CommandStats::new();
        for decode in self.outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
            merged.merge(&decode.trace.stats);
        }
        merged
    }

    /// Number of abandoned files.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    /// Builds the serializable summary.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            files: self.outcomes.iter().map(FileSummary::from).collect(),
            failed: self.failed(),
            counts: self.merged_stats().by_name(),
        }
    }
}

/// Decodes files on a bounded worker pool.
#[derive(Debug, Clone)]
pub struct BatchDecoder<'r> {
    decoder: TraceDecoder<'r>,
    batch: BatchConfig,
}

impl<'r> BatchDecoder<'r> {
    /// Creates a batch decoder.
    ///
    /// # Errors
    ///
    /// See [`TraceDecoder::new`].
    pub fn new(registry: &'r Registry, config: &Config) -> Result<Self, DecodeError> {
        Ok(Self {
            decoder: TraceDecoder::new(registry, config)?,
            batch: config.batch.clone(),
        })
    }

    /// Reads, decodes, and optionally writes one file.
    ///
    /// # Errors
    ///
    /// Returns the file's fatal [`FileError`].
    pub fn decode_file(&self, job: &BatchJob) -> Result<FileDecode, FileError> {
        let trace = reader::read_trace(&job.input, &self.batch.clock_column)?;
        let decoded = self.decoder.decode(&trace.layout, &trace.rows)?;
        if let Some(output) = &job.output {
            writer::write_file(output, &decoded.commands)?;
        }
        Ok(FileDecode {
            record_sec: record_length(&trace.rows),
            glitches: trace.glitches.len(),
            trace: decoded,
        })
    }

    /// Decodes every job, `workers` at a time (0 uses one worker per core).
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Pool`] if the pool cannot be built. Per-file errors are returned
    /// inside the outcomes.
    pub fn run(&self, jobs: &[BatchJob]) -> Result<BatchRun, BatchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.batch.workers)
            .build()?;
        info!(
            files = jobs.len(),
            workers = pool.current_num_threads(),
            "starting batch decode"
        );

        let outcomes = pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    let span = info_span!("decode", file = %job.input.display());
                    let _guard = span.enter();
                    let result = self.decode_file(job);
                    match &result {
                        Ok(decode) => info!(
                            commands = decode.trace.commands.len(),
                            report = %decode.trace.report,
                            "file decoded"
                        ),
                        Err(err) => error!(%err, "file abandoned"),
                    }
                    FileOutcome {
                        job: job.clone(),
                        result,
                    }
                })
                .collect()
        });
        Ok(BatchRun { outcomes })
    }
}

/// Expands directories into their trace files, sorted; plain paths are kept as given.
///
/// Files already named like decoded output are skipped.
///
/// # Errors
///
/// Returns [`TraceError::Io`] if a directory cannot be listed.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>, TraceError> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        let io_err = |source| TraceError::Io {
            path: path.clone(),
            source,
        };
        let mut found = Vec::new();
        for entry in fs::read_dir(path).map_err(io_err)? {
            let entry = entry.map_err(io_err)?.path();
            let name = entry
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if entry.is_file() && name.ends_with(".csv") && !name.ends_with(DECODED_SUFFIX) {
                found.push(entry);
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

/// Decoded stream path for `input`: `<stem>.decoded.csv` next to it or inside `out_dir`.
pub fn output_path(input: &Path, out_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{stem}{DECODED_SUFFIX}");
    match (out_dir, input.parent()) {
        (Some(dir), _) => dir.join(name),
        (None, Some(parent)) => parent.join(name),
        (None, None) => PathBuf::from(name),
    }
}
