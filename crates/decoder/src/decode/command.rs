use std::fmt;

use serde::Serialize;

use crate::common::field::AddressFields;
use crate::protocol::CommandId;

/// One decoded DRAM command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecodedCommand {
    /// Time of the (first) cycle in seconds.
    #[serde(rename = "timestamp_sec")]
    pub timestamp: f64,
    /// Command identifier.
    #[serde(rename = "cmd")]
    pub id: CommandId,
    /// Resolved address fields.
    pub fields: AddressFields,
    /// Cycle counter of the (first) cycle.
    pub cycle: u64,
    /// Command spanned two bus cycles.
    #[serde(skip)]
    pub two_cycle: bool,
}

impl DecodedCommand {
    /// True if both commands carry the same identifier and fields, ignoring time and cycle.
    pub fn same_command(&self, other: &Self) -> bool {
        self.id == other.id && self.fields == other.fields
    }
}

impl fmt::Display for DecodedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}s #{} {}", self.timestamp, self.cycle, self.id)?;
        if !self.fields.is_empty() {
            write!(f, " {}", self.fields)?;
        }
        Ok(())
    }
}
