//! Command decoding.
//!
//! This module turns sampled rows into DRAM commands:
//! 1. **Matcher:** Classifies each row against the registry compiled for the trace's layout.
//! 2. **Resolver:** Completes two-cycle commands from the row `offset` cycles later.
//! 3. **Dedup:** Suppresses oversampling repeats of single-cycle commands.
//! 4. **Pipeline:** Drives the stages above and the bank state machine for one trace.

/// Decoded command record.
pub mod command;

/// Oversampling deduplication.
pub mod dedup;

/// Row classification.
pub mod matcher;

/// Per-trace pipeline.
pub mod pipeline;

/// Recoverable failures and counters.
pub mod report;

/// Two-cycle look-ahead.
pub mod resolver;

pub use command::DecodedCommand;
pub use dedup::{Deduplicator, deduplicate};
pub use matcher::{Frame, FrameMatcher};
pub use pipeline::{DecodedTrace, TraceDecoder};
pub use report::{DecodeFailure, DecodeReport, UnresolvedReason};
pub use resolver::{Resolution, TwoCycleResolver};
