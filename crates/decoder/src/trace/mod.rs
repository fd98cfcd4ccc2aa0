//! Trace input and decoded stream output.
//!
//! This module provides:
//! 1. **Reader:** Tabular traces with or without a cycle counter column.
//! 2. **Edges:** Reduction of raw oversampled captures to one row per rising clock edge.
//! 3. **Writer:** CSV output of decoded command streams.

/// Rising-edge sampling and glitch detection.
pub mod edges;

/// Tabular trace parsing.
pub mod reader;

/// Decoded stream output.
pub mod writer;

pub use edges::{EdgeSampler, Glitch, RawSample, Sampled};
pub use reader::{Trace, parse_trace, read_trace};
pub use writer::{HEADER, write_commands, write_file};
