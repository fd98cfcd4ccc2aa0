//! Command identifiers.
//!
//! Each protocol owns one flat, closed set of identifiers; [`CommandId`] wraps both sets so the
//! rest of the decoder can carry identifiers without knowing which protocol produced them. The
//! display names match the truth-table names used in JEDEC documents (`ACT`, `REFab`, ...).

use std::fmt;

use serde::{Serialize, Serializer};

use super::Protocol;

/// DDR5 command identifiers (JESD79-5 command truth table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ddr5Command {
    /// Bank activate (two-cycle).
    Act,
    /// Precharge all banks.
    PreAb,
    /// Precharge same bank in all bankgroups.
    PreSb,
    /// Precharge one bank.
    PrePb,
    /// Refresh all banks.
    RefAb,
    /// Refresh same bank (fine granularity refresh only).
    RefSb,
    /// Refresh management, all banks.
    RfmAb,
    /// Refresh management, same bank (fine granularity refresh only).
    RfmSb,
    /// Write (two-cycle).
    Wr,
    /// Write with auto-precharge (two-cycle).
    Wra,
    /// Read (two-cycle).
    Rd,
    /// Read with auto-precharge (two-cycle).
    Rda,
    /// No operation or power-down exit.
    NopPdx,
    /// Multi-purpose command.
    Mpc,
    /// Power-down entry.
    Pde,
    /// Self-refresh entry.
    Sre,
    /// Self-refresh entry with frequency change.
    SreF,
    /// Reserved single-cycle encoding.
    Rfu1c,
    /// Reserved two-cycle encodings.
    Rfu,
    /// Vref command/address.
    VrefCa,
    /// Vref chip select.
    VrefCs,
    /// Mode register read (two-cycle).
    Mrr,
    /// Mode register write (two-cycle).
    Mrw,
}

impl Ddr5Command {
    /// Every DDR5 identifier, in truth-table order.
    pub const ALL: [Self; 23] = [
        Self::Act,
        Self::PreAb,
        Self::PreSb,
        Self::PrePb,
        Self::RefAb,
        Self::RefSb,
        Self::RfmAb,
        Self::RfmSb,
        Self::Wr,
        Self::Wra,
        Self::Rd,
        Self::Rda,
        Self::NopPdx,
        Self::Mpc,
        Self::Pde,
        Self::Sre,
        Self::SreF,
        Self::Rfu1c,
        Self::Rfu,
        Self::VrefCa,
        Self::VrefCs,
        Self::Mrr,
        Self::Mrw,
    ];

    /// Truth-table name of the command.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Act => "ACT",
            Self::PreAb => "PREab",
            Self::PreSb => "PREsb",
            Self::PrePb => "PREpb",
            Self::RefAb => "REFab",
            Self::RefSb => "REFsb",
            Self::RfmAb => "RFMab",
            Self::RfmSb => "RFMsb",
            Self::Wr => "WR",
            Self::Wra => "WRA",
            Self::Rd => "RD",
            Self::Rda => "RDA",
            Self::NopPdx => "NOP/PDX",
            Self::Mpc => "MPC",
            Self::Pde => "PDE",
            Self::Sre => "SRE",
            Self::SreF => "SREF",
            Self::Rfu1c => "RFU1C",
            Self::Rfu => "RFU",
            Self::VrefCa => "VrefCA",
            Self::VrefCs => "VrefCS",
            Self::Mrr => "MRR",
            Self::Mrw => "MRW",
        }
    }
}

/// DDR4 command identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ddr4Command {
    /// Mode register set.
    Mrs,
    /// Refresh.
    Ref,
    /// Precharge (single bank or all banks via A10).
    Pre,
    /// Reserved encoding.
    Rfu,
    /// Bank activate.
    Act,
    /// Write.
    Wr,
    /// Read.
    Rd,
}

impl Ddr4Command {
    /// Every DDR4 identifier, in truth-table order.
    pub const ALL: [Self; 7] = [
        Self::Mrs,
        Self::Ref,
        Self::Pre,
        Self::Rfu,
        Self::Act,
        Self::Wr,
        Self::Rd,
    ];

    /// Truth-table name of the command.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mrs => "MRS",
            Self::Ref => "REF",
            Self::Pre => "PRE",
            Self::Rfu => "RFU",
            Self::Act => "ACT",
            Self::Wr => "WR",
            Self::Rd => "RD",
        }
    }
}

/// Protocol-tagged command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandId {
    /// A DDR4 command.
    Ddr4(Ddr4Command),
    /// A DDR5 command.
    Ddr5(Ddr5Command),
}

/// Effect class of a command on the bank state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandClass {
    /// Opens a row.
    Activate,
    /// Column read.
    Read,
    /// Column read followed by an automatic precharge.
    ReadAutoPrecharge,
    /// Column write.
    Write,
    /// Column write followed by an automatic precharge.
    WriteAutoPrecharge,
    /// Refresh or refresh management. `same_bank` marks the per-bank variants that require
    /// fine granularity refresh.
    Refresh {
        /// Per-bank (`sb`) variant.
        same_bank: bool,
    },
    /// Counted, but no bank state transition.
    Other,
}

impl CommandId {
    /// Truth-table name of the command.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Ddr4(c) => c.name(),
            Self::Ddr5(c) => c.name(),
        }
    }

    /// Protocol the identifier belongs to.
    pub const fn protocol(self) -> Protocol {
        match self {
            Self::Ddr4(_) => Protocol::Ddr4,
            Self::Ddr5(_) => Protocol::Ddr5,
        }
    }

    /// Effect class used by the bank state machine.
    pub const fn class(self) -> CommandClass {
        match self {
            Self::Ddr5(Ddr5Command::Act) | Self::Ddr4(Ddr4Command::Act) => CommandClass::Activate,
            Self::Ddr5(Ddr5Command::Rd) | Self::Ddr4(Ddr4Command::Rd) => CommandClass::Read,
            Self::Ddr5(Ddr5Command::Rda) => CommandClass::ReadAutoPrecharge,
            Self::Ddr5(Ddr5Command::Wr) | Self::Ddr4(Ddr4Command::Wr) => CommandClass::Write,
            Self::Ddr5(Ddr5Command::Wra) => CommandClass::WriteAutoPrecharge,
            Self::Ddr5(Ddr5Command::RefAb | Ddr5Command::RfmAb) | Self::Ddr4(Ddr4Command::Ref) => {
                CommandClass::Refresh { same_bank: false }
            }
            Self::Ddr5(Ddr5Command::RefSb | Ddr5Command::RfmSb) => {
                CommandClass::Refresh { same_bank: true }
            }
            _ => CommandClass::Other,
        }
    }

    /// Every identifier of `protocol`, in truth-table order.
    pub fn all(protocol: Protocol) -> Vec<Self> {
        match protocol {
            Protocol::Ddr4 => Ddr4Command::ALL.into_iter().map(Self::Ddr4).collect(),
            Protocol::Ddr5 => Ddr5Command::ALL.into_iter().map(Self::Ddr5).collect(),
        }
    }

    /// Looks up an identifier by its truth-table name within `protocol`.
    pub fn from_name(protocol: Protocol, name: &str) -> Option<Self> {
        Self::all(protocol).into_iter().find(|id| id.name() == name)
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for CommandId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// Comma-separated list of identifiers, used in error and failure messages.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CommandList(pub Vec<CommandId>);

impl fmt::Display for CommandList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(id.name())?;
        }
        Ok(())
    }
}

impl From<Vec<CommandId>> for CommandList {
    fn from(ids: Vec<CommandId>) -> Self {
        Self(ids)
    }
}
