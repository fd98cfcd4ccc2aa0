//! Rising-edge sampler for raw captures.
//!
//! A logic analyzer records the bus many times per clock period. The command bus is latched on
//! the rising clock edge, so only the first sample after each low-to-high transition is kept;
//! cycles are numbered by edge count starting at 0. A sample that is already high at the start
//! of the capture is not an edge.
//!
//! The sampler also reports signal-consistency glitches: a non-clock signal changing between two
//! consecutive samples while the clock stays high. Such a change inside the latched half-period
//! means the sampled value depends on exactly where the edge fell.

use serde::Serialize;
use tracing::{debug, warn};

use crate::common::error::LayoutError;
use crate::common::signal::{SampleRow, SignalLayout};

/// One raw sample of every signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Sample time in seconds.
    pub timestamp: f64,
    /// Bus state, packed like [`SampleRow::bits`].
    pub bits: u64,
}

/// Signals that changed while the clock stayed high.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Glitch {
    /// Index of the later of the two samples.
    pub sample: usize,
    /// Time of the later sample in seconds.
    pub timestamp: f64,
    /// Names of the changed signals.
    pub signals: Vec<String>,
}

/// Output of [`EdgeSampler::sample`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sampled {
    /// One row per rising edge.
    pub rows: Vec<SampleRow>,
    /// Consistency glitches in sample order.
    pub glitches: Vec<Glitch>,
}

/// Rising-edge sampler bound to one layout.
#[derive(Debug, Clone)]
pub struct EdgeSampler<'l> {
    layout: &'l SignalLayout,
    clock: u8,
    signals: u64,
}

impl<'l> EdgeSampler<'l> {
    /// Creates a sampler using `clock_column` of `layout` as the clock.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::MissingColumn`] if the clock column is absent.
    pub fn new(layout: &'l SignalLayout, clock_column: &str) -> Result<Self, LayoutError> {
        let clock = layout.require(clock_column)?;
        let all = if layout.len() >= 64 {
            u64::MAX
        } else {
            (1u64 << layout.len()) - 1
        };
        Ok(Self {
            layout,
            clock,
            signals: all & !(1u64 << clock),
        })
    }

    /// Samples `samples` at every rising clock edge and collects glitches.
    pub fn sample(&self, samples: &[RawSample]) -> Sampled {
        let mut out = Sampled::default();
        let mut cycle = 0u64;
        let mut previous: Option<&RawSample> = None;

        for (index, sample) in samples.iter().enumerate() {
            let high = self.is_high(sample);
            if let Some(prev) = previous {
                let prev_high = self.is_high(prev);
                if high && !prev_high {
                    out.rows
                        .push(SampleRow::new(sample.timestamp, cycle, sample.bits));
                    cycle += 1;
                } else if high && prev_high {
                    let changed = (prev.bits ^ sample.bits) & self.signals;
                    if changed != 0 {
                        let glitch = Glitch {
                            sample: index,
                            timestamp: sample.timestamp,
                            signals: self.names(changed),
                        };
                        debug!(sample = index, signals = ?glitch.signals, "signal changed while clock high");
                        out.glitches.push(glitch);
                    }
                }
            }
            previous = Some(sample);
        }

        if !out.glitches.is_empty() {
            warn!(
                glitches = out.glitches.len(),
                "signals changed while the clock was high"
            );
        }
        out
    }

    const fn is_high(&self, sample: &RawSample) -> bool {
        (sample.bits >> self.clock) & 1 == 1
    }

    fn names(&self, mask: u64) -> Vec<String> {
        self.layout
            .names()
            .iter()
            .enumerate()
            .filter(|(i, _)| (mask >> i) & 1 == 1)
            .map(|(_, name)| name.clone())
            .collect()
    }
}
