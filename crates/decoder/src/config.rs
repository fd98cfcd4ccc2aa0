//! Configuration system for the command bus decoder.
//!
//! This module defines every configuration structure used to parameterize a decode run. It
//! provides:
//! 1. **Defaults:** Baseline protocol settings, DIMM geometry, and JEDEC refresh constants.
//! 2. **Structures:** Hierarchical config for the decoder, the DIMM under test, and batch runs.
//! 3. **Timing:** Refresh cycle times and intervals derived from the DIMM parameters.
//!
//! Configuration is supplied as JSON (`Config::from_json`) or built with `Config::default()`;
//! the CLI overrides individual fields from its flags.

use serde::{Deserialize, Serialize};

use crate::common::error::ConfigError;
use crate::protocol::{AddressingMode, Protocol};

/// Default configuration constants for the decoder.
///
/// These values describe a typical 16 Gb DDR5 device when no DIMM configuration is supplied.
mod defaults {
    /// Bankgroups per device.
    pub const NUM_BANKGROUPS: u32 = 8;

    /// Banks per bankgroup.
    ///
    /// Also the number of tracked bank states: DDR5 bank addresses select a bank within every
    /// bankgroup at once.
    pub const NUM_BANKS_PER_BANKGROUP: u32 = 4;

    /// Device density in gigabits.
    pub const TOTAL_SIZE_GB: u32 = 16;

    /// Row precharge time in picoseconds.
    pub const T_RP_PS: u64 = 16_000;

    /// Activate to precharge time in picoseconds.
    pub const T_RAS_PS: u64 = 32_000;

    /// Activate to column command time in picoseconds.
    pub const T_RCD_PS: u64 = 16_000;

    /// Clock column name in tabular traces.
    pub const CLOCK_COLUMN: &str = "CK0";

    /// Smallest plausible tRP/tRCD in picoseconds; smaller values were most likely given in ns.
    pub const MIN_T_RP_PS: u64 = 10_000;

    /// Smallest plausible tRAS in picoseconds.
    pub const MIN_T_RAS_PS: u64 = 20_000;
}

/// JEDEC refresh constants (JESD79-5), in nanoseconds.
pub mod jedec {
    /// tRFC1 (REFab, normal refresh) for 8 Gb and 16 Gb devices.
    pub const T_RFC1_NS: [(u32, f64); 2] = [(8, 195.0), (16, 295.0)];

    /// tRFC2 (REFab, fine granularity refresh).
    pub const T_RFC2_NS: [(u32, f64); 2] = [(8, 130.0), (16, 160.0)];

    /// tRFCsb (REFsb).
    pub const T_RFC_SB_NS: [(u32, f64); 2] = [(8, 115.0), (16, 130.0)];

    /// tREFI for REFab at standard temperature (0 to 85 °C), normal refresh.
    pub const T_REFI_NS: f64 = 3900.0;

    /// tREFI for REFab at standard temperature with fine granularity refresh, and the REFsb
    /// interval per bankgroup-wide bank set before dividing by the bank count.
    pub const T_REFI_FGR_NS: f64 = 1950.0;
}

/// Case temperature range; high temperature halves every refresh interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temperature {
    /// 0 °C to 85 °C.
    Standard,
    /// 85 °C to 95 °C.
    High,
}

impl Temperature {
    const fn interval_divisor(self) -> f64 {
        match self {
            Self::Standard => 1.0,
            Self::High => 2.0,
        }
    }
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use dramscope_core::config::Config;
/// use dramscope_core::protocol::{AddressingMode, Protocol};
///
/// let json = r#"{
///     "decoder": { "protocol": "DDR5", "addressing": "1N" },
///     "dimm": { "fgr": true, "num_banks_per_bankgroup": 4 }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.decoder.protocol, Protocol::Ddr5);
/// assert_eq!(config.decoder.addressing, AddressingMode::OneN);
/// assert!(config.dimm.fgr);
/// assert_eq!(config.batch.clock_column, "CK0");
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Protocol and matching settings
    #[serde(default)]
    pub decoder: DecoderConfig,
    /// DIMM geometry and timing
    #[serde(default)]
    pub dimm: DimmConfig,
    /// Multi-file settings
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and [`ConfigError::InvalidDimm`] for
    /// DIMM parameters that fail [`DimmConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.dimm.validate()?;
        Ok(config)
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecoderConfig {
    /// Protocol of the captured bus
    #[serde(default)]
    pub protocol: Protocol,

    /// 1N or 2N command timing
    #[serde(default)]
    pub addressing: AddressingMode,

    /// Test candidate templates of a row in parallel
    #[serde(default)]
    pub parallel_match: bool,

    /// List every unknown row in the report, not only the count
    #[serde(default = "DecoderConfig::default_report_unknown")]
    pub report_unknown: bool,
}

impl DecoderConfig {
    fn default_report_unknown() -> bool {
        true
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::default(),
            addressing: AddressingMode::default(),
            parallel_match: false,
            report_unknown: true,
        }
    }
}

/// DIMM parameters consumed by the bank state machine and the bound calculations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DimmConfig {
    /// Identifier of the DIMM under test
    #[serde(default)]
    pub dimm_id: Option<u32>,

    /// Bankgroups per device
    #[serde(default = "DimmConfig::default_num_bankgroups")]
    pub num_bankgroups: u32,

    /// Banks per bankgroup (power of two)
    #[serde(default = "DimmConfig::default_num_banks_per_bankgroup")]
    pub num_banks_per_bankgroup: u32,

    /// Device density in gigabits (8 or 16)
    #[serde(default = "DimmConfig::default_total_size_gb")]
    pub total_size_gb: u32,

    /// Fine granularity refresh enabled; required for REFsb/RFMsb
    #[serde(default)]
    pub fgr: bool,

    /// tRP in picoseconds
    #[serde(default = "DimmConfig::default_trp", alias = "trp")]
    pub trp_ps: u64,

    /// tRAS in picoseconds
    #[serde(default = "DimmConfig::default_tras", alias = "tras")]
    pub tras_ps: u64,

    /// tRCD in picoseconds
    #[serde(default = "DimmConfig::default_trcd", alias = "trcd")]
    pub trcd_ps: u64,
}

impl DimmConfig {
    fn default_num_bankgroups() -> u32 {
        defaults::NUM_BANKGROUPS
    }

    fn default_num_banks_per_bankgroup() -> u32 {
        defaults::NUM_BANKS_PER_BANKGROUP
    }

    fn default_total_size_gb() -> u32 {
        defaults::TOTAL_SIZE_GB
    }

    fn default_trp() -> u64 {
        defaults::T_RP_PS
    }

    fn default_tras() -> u64 {
        defaults::T_RAS_PS
    }

    fn default_trcd() -> u64 {
        defaults::T_RCD_PS
    }

    /// Checks geometry and timing plausibility.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDimm`] naming the first rejected parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &'static str, reason: String| {
            Err(ConfigError::InvalidDimm { name, reason })
        };
        if !self.num_banks_per_bankgroup.is_power_of_two() {
            return invalid(
                "num_banks_per_bankgroup",
                format!("{} is not a power of two", self.num_banks_per_bankgroup),
            );
        }
        if !self.num_bankgroups.is_power_of_two() {
            return invalid(
                "num_bankgroups",
                format!("{} is not a power of two", self.num_bankgroups),
            );
        }
        if lookup_density(&jedec::T_RFC1_NS, self.total_size_gb).is_none() {
            return invalid(
                "total_size_gb",
                format!("{} Gb has no tabulated tRFC (8 or 16)", self.total_size_gb),
            );
        }
        for (name, value, min) in [
            ("trp_ps", self.trp_ps, defaults::MIN_T_RP_PS),
            ("tras_ps", self.tras_ps, defaults::MIN_T_RAS_PS),
            ("trcd_ps", self.trcd_ps, defaults::MIN_T_RP_PS),
        ] {
            if value <= min {
                return invalid(
                    name,
                    format!("{value} is not plausible in picoseconds (expected > {min})"),
                );
            }
        }
        Ok(())
    }

    /// Number of tracked bank states.
    pub const fn bank_count(&self) -> usize {
        self.num_banks_per_bankgroup as usize
    }

    /// Number of bits in a bank address.
    pub const fn bank_bits(&self) -> u32 {
        self.num_banks_per_bankgroup.trailing_zeros()
    }

    /// tRP + tRAS + tRCD in picoseconds: the shortest activate-to-activate window of one bank.
    pub const fn t_act_ps(&self) -> u64 {
        self.trp_ps + self.tras_ps + self.trcd_ps
    }

    /// REFab refresh cycle time in seconds (tRFC2 with FGR, tRFC1 otherwise).
    pub fn t_rfc_sec(&self) -> Option<f64> {
        let table = if self.fgr {
            &jedec::T_RFC2_NS
        } else {
            &jedec::T_RFC1_NS
        };
        lookup_density(table, self.total_size_gb).map(ns_to_sec)
    }

    /// REFsb refresh cycle time in seconds; `None` without FGR.
    pub fn t_rfc_sb_sec(&self) -> Option<f64> {
        if !self.fgr {
            return None;
        }
        lookup_density(&jedec::T_RFC_SB_NS, self.total_size_gb).map(ns_to_sec)
    }

    /// REFab refresh interval in seconds.
    pub fn t_refi_ab_sec(&self, temperature: Temperature) -> f64 {
        let base = if self.fgr {
            jedec::T_REFI_FGR_NS
        } else {
            jedec::T_REFI_NS
        };
        ns_to_sec(base / temperature.interval_divisor())
    }

    /// REFsb refresh interval in seconds: the FGR interval shared by the banks of a bankgroup.
    pub fn t_refi_sb_sec(&self, temperature: Temperature) -> f64 {
        ns_to_sec(
            jedec::T_REFI_FGR_NS
                / temperature.interval_divisor()
                / f64::from(self.num_banks_per_bankgroup.max(1)),
        )
    }
}

impl Default for DimmConfig {
    fn default() -> Self {
        Self {
            dimm_id: None,
            num_bankgroups: defaults::NUM_BANKGROUPS,
            num_banks_per_bankgroup: defaults::NUM_BANKS_PER_BANKGROUP,
            total_size_gb: defaults::TOTAL_SIZE_GB,
            fgr: false,
            trp_ps: defaults::T_RP_PS,
            tras_ps: defaults::T_RAS_PS,
            trcd_ps: defaults::T_RCD_PS,
        }
    }
}

/// Multi-file run settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// Worker threads; 0 uses every core
    #[serde(default)]
    pub workers: usize,

    /// Clock column used when a trace has no cycle counter
    #[serde(default = "BatchConfig::default_clock_column")]
    pub clock_column: String,
}

impl BatchConfig {
    fn default_clock_column() -> String {
        defaults::CLOCK_COLUMN.to_owned()
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            clock_column: defaults::CLOCK_COLUMN.to_owned(),
        }
    }
}

fn lookup_density(table: &[(u32, f64)], size_gb: u32) -> Option<f64> {
    table
        .iter()
        .find(|&&(size, _)| size == size_gb)
        .map(|&(_, ns)| ns)
}

fn ns_to_sec(ns: f64) -> f64 {
    ns * 1e-9
}
