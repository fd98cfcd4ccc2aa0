//! Per-file decode report.
//!
//! Recoverable conditions never abort a decode. They are collected here together with row
//! counters, so a caller can print a summary next to the decoded stream.

use std::fmt;

use serde::Serialize;

use crate::protocol::CommandList;

/// Why a two-cycle command was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedReason {
    /// No row carries the expected cycle.
    MissingSecondCycle {
        /// Cycle the second half was expected at.
        expected_cycle: u64,
    },
    /// The expected row matched no candidate's second half.
    NoSecondCycleMatch {
        /// Cycle of the inspected row.
        second_cycle: u64,
    },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecondCycle { expected_cycle } => {
                write!(f, "second cycle {expected_cycle} missing from trace")
            }
            Self::NoSecondCycleMatch { second_cycle } => {
                write!(f, "cycle {second_cycle} matches no second-cycle candidate")
            }
        }
    }
}

/// One recoverable decode failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeFailure {
    /// A selected row matched no template.
    UnknownCommand {
        /// Row index.
        row: usize,
        /// Cycle of the row.
        cycle: u64,
        /// Time of the row in seconds.
        timestamp: f64,
    },
    /// A two-cycle command could not be completed and was dropped.
    UnresolvedTwoCycle {
        /// First-half row index.
        first_row: usize,
        /// Last row inspected while looking for the second half.
        last_row: usize,
        /// Cycle of the first half.
        cycle: u64,
        /// Time of the first half in seconds.
        timestamp: f64,
        /// First-half candidates.
        candidates: CommandList,
        /// Why resolution failed.
        reason: UnresolvedReason,
    },
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCommand { row, cycle, .. } => {
                write!(f, "row {row} (cycle {cycle}): unknown command")
            }
            Self::UnresolvedTwoCycle {
                first_row,
                last_row,
                cycle,
                candidates,
                reason,
                ..
            } => write!(
                f,
                "rows {first_row}..={last_row} (cycle {cycle}): unresolved two-cycle command [{candidates}]: {reason}"
            ),
        }
    }
}

/// Counters and failures of one decode.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecodeReport {
    /// Rows inspected.
    pub rows: usize,
    /// Rows with chip-select deasserted.
    pub deselected: usize,
    /// Rows that matched no template.
    pub unknown: usize,
    /// Two-cycle commands dropped.
    pub unresolved: usize,
    /// Oversampling repeats suppressed.
    pub suppressed: usize,
    /// Itemized failures. Unknown rows are listed only when enabled in the decoder config.
    pub failures: Vec<DecodeFailure>,
}

impl DecodeReport {
    /// Records an unknown row.
    pub fn unknown_command(&mut self, failure: Option<DecodeFailure>) {
        self.unknown += 1;
        self.failures.extend(failure);
    }

    /// Records a dropped two-cycle command.
    pub fn unresolved_two_cycle(&mut self, failure: DecodeFailure) {
        self.unresolved += 1;
        self.failures.push(failure);
    }

    /// True if nothing was unknown or unresolved.
    pub const fn is_clean(&self) -> bool {
        self.unknown == 0 && self.unresolved == 0
    }
}

impl fmt::Display for DecodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} deselected={} unknown={} unresolved={} suppressed={}",
            self.rows, self.deselected, self.unknown, self.unresolved, self.suppressed
        )
    }
}
