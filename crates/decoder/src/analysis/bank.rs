//! Per-bank protocol state machine.
//!
//! The machine consumes the decoded, deduplicated command stream of one trace. It tracks the
//! status and last refresh time of every bank, enforces the refresh legality rules of the DIMM,
//! and counts every command it accepts. A command without a bank field targets every bank.
//!
//! Transitions:
//! 1. **ACT** opens the bank (`Active`).
//! 2. **RD/RDA/WR/WRA** move it to the matching access state.
//! 3. **REFab/REFsb/RFMab/RFMsb** block it and stamp its last refresh time.
//! 4. **Everything else** is counted without a transition.

use std::fmt;

use serde::Serialize;

use crate::analysis::stats::CommandStats;
use crate::common::error::LegalityViolation;
use crate::config::DimmConfig;
use crate::decode::DecodedCommand;
use crate::protocol::CommandClass;

/// Status of one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BankStatus {
    /// No open row.
    #[default]
    Idle,
    /// Refreshing; no access allowed.
    Blocked,
    /// Row open.
    Active,
    /// Closing its row. Precharge commands are only counted, so no transition enters this
    /// state; it exists for consumers that model tRP themselves.
    Precharging,
    /// Read issued.
    Reading,
    /// Read with auto-precharge issued.
    ReadingAp,
    /// Write issued.
    Writing,
    /// Write with auto-precharge issued.
    WritingAp,
}

impl BankStatus {
    const fn after(class: CommandClass) -> Option<Self> {
        match class {
            CommandClass::Activate => Some(Self::Active),
            CommandClass::Read => Some(Self::Reading),
            CommandClass::ReadAutoPrecharge => Some(Self::ReadingAp),
            CommandClass::Write => Some(Self::Writing),
            CommandClass::WriteAutoPrecharge => Some(Self::WritingAp),
            CommandClass::Refresh { .. } => Some(Self::Blocked),
            CommandClass::Other => None,
        }
    }
}

impl fmt::Display for BankStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "IDLE",
            Self::Blocked => "BLOCKED",
            Self::Active => "ACTIVE",
            Self::Precharging => "PRECHARGING",
            Self::Reading => "READING",
            Self::ReadingAp => "READING_AP",
            Self::Writing => "WRITING",
            Self::WritingAp => "WRITING_AP",
        })
    }
}

/// State of one bank.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BankState {
    /// Current status.
    pub status: BankStatus,
    /// Time of the last refresh that targeted the bank, in seconds.
    pub last_refresh: Option<f64>,
}

/// Bank state machine for one trace.
#[derive(Debug, Clone)]
pub struct BankStateMachine {
    banks: Vec<BankState>,
    fgr: bool,
    stats: CommandStats,
}

impl BankStateMachine {
    /// Creates a machine with one idle bank per bank address of `dimm`.
    pub fn new(dimm: &DimmConfig) -> Self {
        Self::with_banks(dimm.bank_count(), dimm.fgr)
    }

    /// Creates a machine with `count` idle banks.
    pub fn with_banks(count: usize, fgr: bool) -> Self {
        Self {
            banks: vec![BankState::default(); count],
            fgr,
            stats: CommandStats::new(),
        }
    }

    /// Seeds the command counters, e.g. with zero rows from `CommandStats::for_registry`.
    #[must_use]
    pub fn with_stats(mut self, stats: CommandStats) -> Self {
        self.stats = stats;
        self
    }

    /// Applies one command.
    ///
    /// # Errors
    ///
    /// * [`LegalityViolation::SameBankRefreshWithoutFgr`] for REFsb/RFMsb while FGR is off.
    /// * [`LegalityViolation::BankOutOfRange`] for a bank address the DIMM does not have.
    ///
    /// A rejected command leaves banks and counters untouched.
    pub fn apply(&mut self, command: &DecodedCommand) -> Result<(), LegalityViolation> {
        let class = command.id.class();
        if matches!(class, CommandClass::Refresh { same_bank: true }) && !self.fgr {
            return Err(LegalityViolation::SameBankRefreshWithoutFgr {
                id: command.id,
                cycle: command.cycle,
            });
        }

        if let Some(status) = BankStatus::after(class) {
            let refresh = matches!(class, CommandClass::Refresh { .. });
            let targets = match command.fields.bank() {
                Some(bank) => {
                    let index = bank.value() as usize;
                    if index >= self.banks.len() {
                        return Err(LegalityViolation::BankOutOfRange {
                            id: command.id,
                            cycle: command.cycle,
                            bank: bank.value(),
                            banks: self.banks.len(),
                        });
                    }
                    index..index + 1
                }
                None => 0..self.banks.len(),
            };
            for bank in &mut self.banks[targets] {
                bank.status = status;
                if refresh {
                    bank.last_refresh = Some(command.timestamp);
                }
            }
        }

        self.stats.record(command);
        Ok(())
    }

    /// All bank states, indexed by bank address.
    pub fn banks(&self) -> &[BankState] {
        &self.banks
    }

    /// State of bank `index`.
    pub fn bank(&self, index: usize) -> Option<&BankState> {
        self.banks.get(index)
    }

    /// Banks currently blocked by a refresh.
    pub fn blocked_banks(&self) -> Vec<usize> {
        self.banks
            .iter()
            .enumerate()
            .filter(|(_, bank)| bank.status == BankStatus::Blocked)
            .map(|(index, _)| index)
            .collect()
    }

    /// Shortest time since the last refresh of `bank`, or of any bank when `None`.
    ///
    /// Banks never refreshed are skipped; `None` if no considered bank was refreshed yet.
    pub fn time_since_refresh(&self, now: f64, bank: Option<usize>) -> Option<f64> {
        let range = bank.map_or(0..self.banks.len(), |index| index..index + 1);
        self.banks
            .get(range)?
            .iter()
            .filter_map(|state| state.last_refresh)
            .map(|last| now - last)
            .min_by(f64::total_cmp)
    }

    /// Command counters accumulated so far.
    pub const fn stats(&self) -> &CommandStats {
        &self.stats
    }

    /// Consumes the machine, returning its counters.
    pub fn into_stats(self) -> CommandStats {
        self.stats
    }
}
