//! Two-cycle resolver.
//!
//! Given a row classified as the first half of a two-cycle command, the resolver looks ahead for
//! the row whose cycle counter is exactly `first + offset` (1 in 1N mode, 2 in 2N mode), tests
//! it against the second half of every first-half candidate, and merges the fields of both rows.
//!
//! Rows are in strictly increasing cycle order, so the scan stops at the first row past the
//! expected cycle. A missing or non-matching second half drops the command; partial fields are
//! never emitted.

use crate::common::error::{DecodeError, MatchPosition};
use crate::common::signal::SampleRow;
use crate::decode::command::DecodedCommand;
use crate::decode::matcher::FrameMatcher;
use crate::protocol::AddressingMode;

/// Outcome of resolving one first half.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The second half was found and matched exactly one candidate.
    Resolved {
        /// Merged command, timestamped at the first half.
        command: DecodedCommand,
        /// Index of the second-half row.
        second_row: usize,
    },
    /// No row carries the expected cycle (gap in the capture or end of trace).
    MissingSecondCycle {
        /// Cycle the second half was expected at.
        expected_cycle: u64,
        /// Last row inspected.
        last_row: usize,
    },
    /// The expected row exists but no candidate's second half matches it.
    NoSecondCycleMatch {
        /// Cycle of the inspected row.
        second_cycle: u64,
        /// Index of the inspected row.
        second_row: usize,
    },
}

/// Looks ahead for second halves.
#[derive(Debug, Clone, Copy)]
pub struct TwoCycleResolver {
    offset: u64,
}

impl TwoCycleResolver {
    /// Creates a resolver for `mode`.
    pub const fn new(mode: AddressingMode) -> Self {
        Self {
            offset: mode.second_cycle_offset(),
        }
    }

    /// Cycle distance between the halves.
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Resolves the first half at `rows[first]` against `candidates`.
    ///
    /// # Arguments
    ///
    /// * `matcher` - Matcher compiled for the trace's layout.
    /// * `rows` - The whole trace, in strictly increasing cycle order.
    /// * `first` - Index of the first-half row.
    /// * `candidates` - Registry indices of every matching first half.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::AmbiguousMatch`] when more than one candidate's second half
    /// matches the expected row.
    pub fn resolve(
        &self,
        matcher: &FrameMatcher<'_>,
        rows: &[SampleRow],
        first: usize,
        candidates: &[usize],
    ) -> Result<Resolution, DecodeError> {
        let Some(first_row) = rows.get(first) else {
            return Ok(Resolution::MissingSecondCycle {
                expected_cycle: self.offset,
                last_row: first,
            });
        };
        let expected_cycle = first_row.cycle + self.offset;

        let mut last_row = first;
        for (index, row) in rows.iter().enumerate().skip(first + 1) {
            last_row = index;
            if row.cycle < expected_cycle {
                continue;
            }
            if row.cycle > expected_cycle {
                break;
            }

            let matches = matcher.second_cycle_matches(candidates, row);
            return match matches.as_slice() {
                [] => Ok(Resolution::NoSecondCycleMatch {
                    second_cycle: row.cycle,
                    second_row: index,
                }),
                [winner] => {
                    let id = matcher.id(*winner).ok_or_else(|| {
                        matcher.ambiguous(row, candidates, MatchPosition::SecondCycle)
                    })?;
                    Ok(Resolution::Resolved {
                        command: DecodedCommand {
                            timestamp: first_row.timestamp,
                            id,
                            fields: matcher.extract(*winner, first_row, Some(row)),
                            cycle: first_row.cycle,
                            two_cycle: true,
                        },
                        second_row: index,
                    })
                }
                _ => Err(matcher.ambiguous(row, &matches, MatchPosition::SecondCycle)),
            };
        }

        Ok(Resolution::MissingSecondCycle {
            expected_cycle,
            last_row,
        })
    }
}
