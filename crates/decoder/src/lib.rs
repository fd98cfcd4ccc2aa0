//! DDR4/DDR5 command bus decoder library.
//!
//! This crate reconstructs DRAM protocol commands from per-cycle samples of a command/address bus
//! captured by a logic analyzer:
//! 1. **Protocol:** Command identifiers and the static, collision-checked template registry.
//! 2. **Decode:** Frame matching, two-cycle resolution, and oversampling deduplication.
//! 3. **Analysis:** Per-bank state machine with refresh legality checks, access statistics, and
//!    upper bounds derived from DIMM timing.
//! 4. **Trace:** Tabular sample input, rising-edge sampling of raw captures, decoded stream output.
//! 5. **Batch:** Parallel decode of independent trace files with per-file error isolation.

/// Analysis of decoded commands (bank state machine, statistics, refresh bounds).
pub mod analysis;
/// Parallel per-file decoding with a bounded worker pool.
pub mod batch;
/// Common types (signal layout, sampled rows, address fields, errors).
pub mod common;
/// Decoder configuration (protocol, addressing mode, DIMM parameters, batch settings).
pub mod config;
/// Frame matcher, two-cycle resolver, deduplicator, and the per-trace pipeline.
pub mod decode;
/// Command identifiers, templates, and the per-protocol registries.
pub mod protocol;
/// Trace input (tabular rows, raw samples) and decoded stream output.
pub mod trace;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// One decoded DRAM command.
pub use crate::decode::DecodedCommand;
/// Per-trace decode pipeline; construct with `TraceDecoder::new`.
pub use crate::decode::TraceDecoder;
/// Immutable command template registry; construct with `Registry::for_protocol`.
pub use crate::protocol::Registry;
