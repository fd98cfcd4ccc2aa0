//! Analysis of decoded command streams.
//!
//! This module provides:
//! 1. **Bank state:** Per-bank status tracking with refresh legality enforcement.
//! 2. **Statistics:** Command occurrence counts and ACT address frequencies.
//! 3. **Bounds:** Maximum activations and refreshes expected in a record window.

/// Per-bank state machine.
pub mod bank;

/// Activation and refresh bounds.
pub mod bounds;

/// Command counters and ACT frequencies.
pub mod stats;

pub use bank::{BankState, BankStateMachine, BankStatus};
pub use bounds::Bounds;
pub use stats::{ActAddress, CommandStats};
