//! DRAM protocol definitions.
//!
//! This module provides:
//! 1. **Protocol:** The DDR4/DDR5 discriminant and its bus-level conventions.
//! 2. **Commands:** Flat identifier sets per protocol.
//! 3. **Templates:** Truth-table rows with metadata layouts.
//! 4. **Registry:** The validated, immutable template table for one protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Command identifiers and effect classes.
pub mod command;
/// DDR4 truth table.
pub mod ddr4;
/// DDR5 truth table.
pub mod ddr5;
/// Collision-checked template registry.
pub mod registry;
/// Command and cycle templates.
pub mod template;

pub use command::{CommandClass, CommandId, CommandList, Ddr4Command, Ddr5Command};
pub use registry::Registry;
pub use template::{CommandTemplate, CycleTemplate, Encoding, MetadataBit};

/// DRAM protocol generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// DDR4: single-cycle commands only.
    #[serde(alias = "Ddr4", alias = "ddr4")]
    Ddr4,
    /// DDR5: single- and two-cycle commands.
    #[default]
    #[serde(alias = "Ddr5", alias = "ddr5")]
    Ddr5,
}

impl Protocol {
    /// Name of the active-low chip-select column.
    pub const fn chip_select(self) -> &'static str {
        match self {
            Self::Ddr4 => "CS0_n",
            Self::Ddr5 => "CS",
        }
    }

    /// Column and value that mark the first half of a two-cycle command, if the protocol has any.
    ///
    /// JEDEC reserves CA1 for this on DDR5: every two-cycle command drives it low in its first
    /// cycle, every single-cycle command drives it high.
    pub const fn two_cycle_selector(self) -> Option<(&'static str, u8)> {
        match self {
            Self::Ddr4 => None,
            Self::Ddr5 => Some(("CA1", 0)),
        }
    }

    /// Human-readable protocol name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ddr4 => "DDR4",
            Self::Ddr5 => "DDR5",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CA bus timing mode.
///
/// In 2N mode the controller holds each command for two clocks to gain setup and hold margin, so
/// the second half of a two-cycle command appears two clock ticks after the first half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum AddressingMode {
    /// Second half one tick after the first.
    #[serde(rename = "1N", alias = "OneN")]
    OneN,
    /// Second half two ticks after the first.
    #[default]
    #[serde(rename = "2N", alias = "TwoN")]
    TwoN,
}

impl AddressingMode {
    /// Cycle-counter distance between the two halves of a two-cycle command.
    pub const fn second_cycle_offset(self) -> u64 {
        match self {
            Self::OneN => 1,
            Self::TwoN => 2,
        }
    }
}
