//! Upper bounds on activations and refreshes within one record window.
//!
//! The activate bound follows the per-bank row cycle: a bank cannot be reactivated faster than
//! `tRP + tRAS + tRCD`, so a window of length `T` holds at most `ceil(T / (tRP + tRAS + tRCD))`
//! activations per bank. Refresh bounds are `T / tREFI` at standard and high temperature.

use serde::Serialize;

use crate::common::signal::SampleRow;
use crate::config::{DimmConfig, Temperature};

/// Expected command bounds for one record window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    /// Window length in seconds.
    pub record_sec: f64,
    /// Maximum activations per bank.
    pub max_acts: u64,
    /// Maximum REFab at standard temperature.
    pub max_refab_temp_std: f64,
    /// Maximum REFab at high temperature.
    pub max_refab_temp_high: f64,
    /// Maximum REFsb at standard temperature.
    pub max_refsb_temp_std: f64,
    /// Maximum REFsb at high temperature.
    pub max_refsb_temp_high: f64,
    /// REFab refresh cycle time in seconds.
    pub t_rfc_sec: Option<f64>,
    /// REFsb refresh cycle time in seconds (FGR only).
    pub t_rfc_sb_sec: Option<f64>,
}

impl Bounds {
    /// Computes every bound for a window of `record_sec` seconds.
    pub fn compute(record_sec: f64, dimm: &DimmConfig) -> Self {
        let refs = |interval: f64| record_sec / interval;
        Self {
            record_sec,
            max_acts: max_activates(record_sec, dimm),
            max_refab_temp_std: refs(dimm.t_refi_ab_sec(Temperature::Standard)),
            max_refab_temp_high: refs(dimm.t_refi_ab_sec(Temperature::High)),
            max_refsb_temp_std: refs(dimm.t_refi_sb_sec(Temperature::Standard)),
            max_refsb_temp_high: refs(dimm.t_refi_sb_sec(Temperature::High)),
            t_rfc_sec: dimm.t_rfc_sec(),
            t_rfc_sb_sec: dimm.t_rfc_sb_sec(),
        }
    }
}

/// Maximum activations of one bank in `record_sec` seconds, rounded up.
pub fn max_activates(record_sec: f64, dimm: &DimmConfig) -> u64 {
    let t_act_ps = dimm.t_act_ps();
    if t_act_ps == 0 || record_sec <= 0.0 {
        return 0;
    }
    (record_sec * 1e12 / t_act_ps as f64).ceil() as u64
}

/// Length of a capture: time between its first and last row.
pub fn record_length(rows: &[SampleRow]) -> f64 {
    match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => (last.timestamp - first.timestamp).max(0.0),
        _ => 0.0,
    }
}
