//! Error definitions.
//!
//! This module defines every fatal condition the decoder can raise. It provides:
//! 1. **Startup errors:** [`RegistryError`] for truth tables that violate the collision-free
//!    invariant, and [`ConfigError`] for unusable configuration.
//! 2. **Per-file errors:** [`DecodeError`] aborts the decode of one trace; it wraps
//!    [`LayoutError`], [`LegalityViolation`], and the ambiguous-match condition.
//! 3. **I/O errors:** [`TraceError`] for unreadable or malformed trace files.
//!
//! Recoverable conditions (unknown commands, unresolved two-cycle commands) are not errors; they
//! are collected in `decode::DecodeReport`.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::common::field::AddressField;
use crate::protocol::{CommandId, CommandList, Protocol};

/// Position of a cycle template within its command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePosition {
    /// Single-cycle command.
    Single,
    /// First half of a two-cycle command.
    First,
    /// Second half of a two-cycle command.
    Second,
}

impl fmt::Display for CyclePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single cycle",
            Self::First => "first cycle",
            Self::Second => "second cycle",
        })
    }
}

/// Signal layout errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// A column name appears twice in the header.
    #[error("duplicate signal column '{0}'")]
    DuplicateColumn(String),

    /// More signal columns than fit in one sampled row.
    #[error("{count} signal columns exceed the limit of {limit}")]
    TooManyColumns {
        /// Number of columns supplied.
        count: usize,
        /// Maximum supported.
        limit: usize,
    },

    /// A column referenced by the active registry is not sampled.
    #[error("signal column '{0}' required by the command table is missing")]
    MissingColumn(String),
}

/// Registry inconsistencies, detected when the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Two templates can match the same bit pattern.
    #[error("{first} and {second} collide in {position}: no required column tells them apart")]
    Collision {
        /// Earlier template in registry order.
        first: CommandId,
        /// Later template in registry order.
        second: CommandId,
        /// Cycle position of the overlap.
        position: CyclePosition,
    },

    /// A two-cycle first half does not require the protocol's two-cycle selector.
    #[error("{id}: first cycle must require {column}={value}")]
    MissingSelector {
        /// Offending command.
        id: CommandId,
        /// Selector column.
        column: &'static str,
        /// Selector value.
        value: u8,
    },

    /// A single-cycle template requires the two-cycle selector value.
    #[error("{id}: single-cycle command requires {column}={value}, reserved for two-cycle commands")]
    SelectorInSingleCycle {
        /// Offending command.
        id: CommandId,
        /// Selector column.
        column: &'static str,
        /// Selector value.
        value: u8,
    },

    /// A two-cycle second half does not require chip-select high.
    #[error("{id}: second cycle must require {column}=1")]
    UnselectedSecondCycle {
        /// Offending command.
        id: CommandId,
        /// Chip-select column.
        column: &'static str,
    },

    /// A two-cycle template in a protocol without two-cycle commands.
    #[error("{id}: {protocol} has no two-cycle commands")]
    TwoCycleUnsupported {
        /// Offending command.
        id: CommandId,
        /// Registry protocol.
        protocol: Protocol,
    },

    /// A field receives the same bit position twice within one command.
    #[error("{id}: {field} bit {position} is declared more than once")]
    DuplicateFieldBit {
        /// Offending command.
        id: CommandId,
        /// Field.
        field: AddressField,
        /// Repeated bit position.
        position: u8,
    },

    /// A field bit position beyond the supported width.
    #[error("{id}: {field} bit {position} is out of range")]
    FieldBitOutOfRange {
        /// Offending command.
        id: CommandId,
        /// Field.
        field: AddressField,
        /// Declared bit position.
        position: u8,
    },

    /// A column is both a fixed requirement and a metadata source in the same cycle.
    #[error("{id}: column {column} is both required and routed to {field} in the {position}")]
    MetadataOnRequiredColumn {
        /// Offending command.
        id: CommandId,
        /// Column.
        column: &'static str,
        /// Field it is routed to.
        field: AddressField,
        /// Cycle position.
        position: CyclePosition,
    },

    /// A required value other than 0 or 1.
    #[error("{id}: column {column} requires value {value}, expected 0 or 1")]
    InvalidBitValue {
        /// Offending command.
        id: CommandId,
        /// Column.
        column: &'static str,
        /// Required value.
        value: u8,
    },

    /// A template of another protocol was supplied.
    #[error("{id} belongs to {found}, registry is {expected}")]
    ProtocolMismatch {
        /// Offending command.
        id: CommandId,
        /// Registry protocol.
        expected: Protocol,
        /// Template protocol.
        found: Protocol,
    },
}

/// Protocol legality violations raised by the bank state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LegalityViolation {
    /// REFsb or RFMsb while fine granularity refresh is disabled.
    #[error("{id} at cycle {cycle} requires fine granularity refresh, which the DIMM has disabled")]
    SameBankRefreshWithoutFgr {
        /// Offending command.
        id: CommandId,
        /// Cycle of the command.
        cycle: u64,
    },

    /// A bank address beyond the DIMM's bank count.
    #[error("{id} at cycle {cycle} targets bank {bank}, but the DIMM has {banks} banks")]
    BankOutOfRange {
        /// Offending command.
        id: CommandId,
        /// Cycle of the command.
        cycle: u64,
        /// Decoded bank address.
        bank: u32,
        /// Number of tracked banks.
        banks: usize,
    },
}

/// Where a row matched more than one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPosition {
    /// Single-cycle classification of a row.
    Single,
    /// Second half of a two-cycle command.
    SecondCycle,
}

impl fmt::Display for MatchPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Single => "single-cycle",
            Self::SecondCycle => "second-cycle",
        })
    }
}

/// Fatal per-file decode errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A row matched more than one template.
    #[error("cycle {cycle} matches more than one {position} template: {candidates}")]
    AmbiguousMatch {
        /// Cycle of the row.
        cycle: u64,
        /// Matching identifiers in registry order.
        candidates: CommandList,
        /// Classification step.
        position: MatchPosition,
    },

    /// Bank state machine rejected a command.
    #[error("protocol legality violation: {0}")]
    Legality(#[from] LegalityViolation),

    /// Trace columns do not fit the registry.
    #[error("signal layout: {0}")]
    Layout(#[from] LayoutError),

    /// Rows are not in strictly increasing cycle order.
    #[error("row {index}: cycle {cycle} does not follow cycle {previous}")]
    CycleOrder {
        /// Row index.
        index: usize,
        /// Cycle of the row.
        cycle: u64,
        /// Cycle of the preceding row.
        previous: u64,
    },

    /// Registry and decoder configuration disagree on the protocol.
    #[error("registry is {registry}, decoder is configured for {configured}")]
    ProtocolMismatch {
        /// Registry protocol.
        registry: Protocol,
        /// Configured protocol.
        configured: Protocol,
    },

    /// Invalid configuration.
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// JSON could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    Parse(String),

    /// A DIMM parameter is out of range.
    #[error("DIMM parameter {name}: {reason}")]
    InvalidDimm {
        /// Parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Trace file errors.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The file could not be read or written.
    #[error("{path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file has no header row.
    #[error("{0}: empty trace")]
    Empty(PathBuf),

    /// A required header column is absent.
    #[error("{path}: missing column '{column}'")]
    MissingColumn {
        /// File path.
        path: PathBuf,
        /// Column name.
        column: String,
    },

    /// A cell could not be parsed.
    #[error("{path}:{line}: {reason}")]
    Malformed {
        /// File path.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// The signal header does not form a valid layout.
    #[error("{path}: {source}")]
    Layout {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: LayoutError,
    },
}

/// Errors from decoding one file end to end.
#[derive(Debug, Error)]
pub enum FileError {
    /// Reading or writing the trace failed.
    #[error(transparent)]
    Trace(#[from] TraceError),

    /// Decoding failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
