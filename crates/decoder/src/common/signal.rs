//! Signal layout and sampled rows.
//!
//! A trace's signal columns are fixed for the whole file, so each row stores its bus state as a
//! packed bit word. [`SignalLayout`] maps column names to bit indices in that word.

use std::collections::HashMap;

use crate::common::error::LayoutError;

/// Maximum number of signal columns in one layout.
pub const MAX_SIGNALS: usize = 64;

/// Column name to bit index mapping for one trace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignalLayout {
    names: Vec<String>,
    index: HashMap<String, u8>,
}

impl SignalLayout {
    /// Builds a layout from column names in sample order.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::DuplicateColumn`] if a name repeats and
    /// [`LayoutError::TooManyColumns`] beyond [`MAX_SIGNALS`] columns.
    pub fn new<I, S>(names: I) -> Result<Self, LayoutError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() > MAX_SIGNALS {
            return Err(LayoutError::TooManyColumns {
                count: names.len(),
                limit: MAX_SIGNALS,
            });
        }
        let mut index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if index.insert(name.clone(), i as u8).is_some() {
                return Err(LayoutError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self { names, index })
    }

    /// Bit index of `name`.
    pub fn position(&self, name: &str) -> Option<u8> {
        self.index.get(name).copied()
    }

    /// Bit index of `name`, or [`LayoutError::MissingColumn`].
    ///
    /// # Errors
    ///
    /// Fails when the column is not part of the layout.
    pub fn require(&self, name: &str) -> Result<u8, LayoutError> {
        self.position(name)
            .ok_or_else(|| LayoutError::MissingColumn(name.to_owned()))
    }

    /// Column names in sample order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of columns.
    pub const fn len(&self) -> usize {
        self.names.len()
    }

    /// True if the layout has no columns.
    pub const fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One clock cycle of the capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRow {
    /// Sample time in seconds.
    pub timestamp: f64,
    /// Monotonic cycle counter.
    pub cycle: u64,
    /// Bus state; bit `i` is the column at index `i` of the layout.
    pub bits: u64,
}

impl SampleRow {
    /// Creates a row from a packed bit word.
    pub const fn new(timestamp: f64, cycle: u64, bits: u64) -> Self {
        Self {
            timestamp,
            cycle,
            bits,
        }
    }

    /// Creates a row by setting named signals; unnamed signals are 0.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::MissingColumn`] for a name outside `layout`.
    pub fn from_signals(
        layout: &SignalLayout,
        timestamp: f64,
        cycle: u64,
        signals: &[(&str, u8)],
    ) -> Result<Self, LayoutError> {
        let mut bits = 0u64;
        for &(name, value) in signals {
            let position = layout.require(name)?;
            if value != 0 {
                bits |= 1 << position;
            }
        }
        Ok(Self::new(timestamp, cycle, bits))
    }

    /// Value (0 or 1) of the bit at `position`.
    pub const fn bit(&self, position: u8) -> u8 {
        ((self.bits >> position) & 1) as u8
    }

    /// Value of the named signal, if it is part of `layout`.
    pub fn signal(&self, layout: &SignalLayout, name: &str) -> Option<u8> {
        layout.position(name).map(|position| self.bit(position))
    }
}
