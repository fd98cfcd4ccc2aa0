//! Common types shared by every stage of the decoder.
//!
//! This module provides:
//! 1. **Signals:** Column layout of a trace and packed per-cycle sample rows.
//! 2. **Fields:** Semantic address fields and the bit accumulator that assembles them.
//! 3. **Errors:** Fatal error families for registry, layout, legality, configuration, and I/O.

/// Error types.
pub mod error;

/// Address field types and assembly.
pub mod field;

/// Signal layout and sample rows.
pub mod signal;

pub use error::{
    ConfigError, CyclePosition, DecodeError, FileError, LayoutError, LegalityViolation,
    MatchPosition, RegistryError, TraceError,
};
pub use field::{AddressField, AddressFields, FieldAccumulator, FieldValue};
pub use signal::{SampleRow, SignalLayout};
