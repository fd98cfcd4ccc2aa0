//! Tabular trace reader.
//!
//! The input is comma-separated text with a header row. Recognized columns:
//! - `Time`: sample time in seconds (required).
//! - `cycle_cnt`: cycle counter (optional). When present every row is one clock cycle and is
//!   used as is. When absent the rows are raw samples and are reduced to rising clock edges.
//! - `TimeNormalized`: ignored.
//! - Everything else: one signal column per header cell, values `0` or `1`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::common::error::TraceError;
use crate::common::signal::{SampleRow, SignalLayout};
use crate::trace::edges::{EdgeSampler, Glitch, RawSample};

const TIME_COLUMN: &str = "Time";
const CYCLE_COLUMN: &str = "cycle_cnt";
const IGNORED_COLUMNS: &[&str] = &["TimeNormalized"];

/// A trace ready for decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    /// Signal columns.
    pub layout: SignalLayout,
    /// One row per clock cycle.
    pub rows: Vec<SampleRow>,
    /// Glitches found while edge-sampling raw input; empty for cycle-counted input.
    pub glitches: Vec<Glitch>,
}

enum Column {
    Time,
    Cycle,
    Ignored,
    Signal(u8),
}

/// Reads the trace at `path`.
///
/// # Errors
///
/// Returns a [`TraceError`] if the file cannot be read or is not a valid trace, including
/// raw input whose clock column (`clock_column`) is missing.
pub fn read_trace(path: &Path, clock_column: &str) -> Result<Trace, TraceError> {
    let file = File::open(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(BufReader::new(file), path, clock_column)
}

/// Parses a trace from `reader`; `path` only labels errors.
///
/// # Errors
///
/// See [`read_trace`].
pub fn parse_trace<R: BufRead>(
    reader: R,
    path: &Path,
    clock_column: &str,
) -> Result<Trace, TraceError> {
    let io_err = |source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut lines = reader.lines();

    let header = loop {
        match lines.next() {
            Some(line) => {
                let line = line.map_err(io_err)?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
            None => return Err(TraceError::Empty(path.to_path_buf())),
        }
    };

    let mut columns = Vec::new();
    let mut signals = Vec::new();
    let (mut has_time, mut has_cycle) = (false, false);
    for cell in header.split(',').map(str::trim) {
        let column = match cell {
            TIME_COLUMN => {
                has_time = true;
                Column::Time
            }
            CYCLE_COLUMN => {
                has_cycle = true;
                Column::Cycle
            }
            c if IGNORED_COLUMNS.contains(&c) => Column::Ignored,
            c => {
                signals.push(c.to_owned());
                Column::Signal((signals.len() - 1) as u8)
            }
        };
        columns.push(column);
    }
    if !has_time {
        return Err(TraceError::MissingColumn {
            path: path.to_path_buf(),
            column: TIME_COLUMN.to_owned(),
        });
    }
    let layout = SignalLayout::new(signals).map_err(|source| TraceError::Layout {
        path: path.to_path_buf(),
        source,
    })?;

    let mut rows = Vec::new();
    let mut raw = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        // Header is line 1.
        let number = offset + 2;
        let malformed = |reason: String| TraceError::Malformed {
            path: path.to_path_buf(),
            line: number,
            reason,
        };

        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        if cells.len() != columns.len() {
            return Err(malformed(format!(
                "expected {} cells, found {}",
                columns.len(),
                cells.len()
            )));
        }

        let (mut timestamp, mut cycle, mut bits) = (0.0f64, 0u64, 0u64);
        for (column, cell) in columns.iter().zip(&cells) {
            match column {
                Column::Time => {
                    timestamp = cell
                        .parse()
                        .map_err(|_| malformed(format!("invalid time '{cell}'")))?;
                }
                Column::Cycle => {
                    cycle = cell
                        .parse()
                        .map_err(|_| malformed(format!("invalid cycle count '{cell}'")))?;
                }
                Column::Ignored => {}
                Column::Signal(bit) => match *cell {
                    "0" => {}
                    "1" => bits |= 1 << bit,
                    other => return Err(malformed(format!("invalid signal value '{other}'"))),
                },
            }
        }

        if has_cycle {
            rows.push(SampleRow::new(timestamp, cycle, bits));
        } else {
            raw.push(RawSample { timestamp, bits });
        }
    }

    let mut glitches = Vec::new();
    if !has_cycle {
        let sampler =
            EdgeSampler::new(&layout, clock_column).map_err(|_| TraceError::MissingColumn {
                path: path.to_path_buf(),
                column: clock_column.to_owned(),
            })?;
        let sampled = sampler.sample(&raw);
        debug!(
            samples = raw.len(),
            edges = sampled.rows.len(),
            "sampled raw trace at rising clock edges"
        );
        rows = sampled.rows;
        glitches = sampled.glitches;
    }

    Ok(Trace {
        layout,
        rows,
        glitches,
    })
}
