//! Command and cycle templates.
//!
//! A [`CycleTemplate`] is one truth-table row: the bus columns that must carry a fixed value,
//! plus the columns whose sampled value is routed into an address field. A [`CommandTemplate`]
//! binds an identifier to either one cycle template or a first/second pair.
//!
//! Templates are plain immutable data. Matching never writes into them; it produces fresh
//! values (see `decode::matcher`).

use std::collections::BTreeMap;

use super::{CommandId, Protocol};
use crate::common::field::AddressField;

/// One sampled column routed into an address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataBit {
    /// Bus column the bit is sampled from.
    pub column: &'static str,
    /// Bit position within the field.
    pub position: u8,
    /// Field receiving the bit.
    pub field: AddressField,
}

/// Fixed requirements and metadata layout of one bus cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CycleTemplate {
    requirements: BTreeMap<&'static str, u8>,
    metadata: Vec<MetadataBit>,
}

impl CycleTemplate {
    /// Creates a cycle template from `(column, value)` requirements.
    pub fn new(requirements: &[(&'static str, u8)]) -> Self {
        Self {
            requirements: requirements.iter().copied().collect(),
            metadata: Vec::new(),
        }
    }

    /// Adds metadata bits for `field`, given as `(column, bit position)` pairs.
    #[must_use]
    pub fn field(mut self, field: AddressField, bits: &[(&'static str, u8)]) -> Self {
        self.metadata
            .extend(bits.iter().map(|&(column, position)| MetadataBit {
                column,
                position,
                field,
            }));
        self
    }

    /// Adds `columns` as consecutive bits of `field`, the first column being bit `msb` and each
    /// following column one position lower.
    #[must_use]
    pub fn field_run(mut self, field: AddressField, msb: u8, columns: &[&'static str]) -> Self {
        let mut position = msb;
        for &column in columns {
            self.metadata.push(MetadataBit {
                column,
                position,
                field,
            });
            position = position.saturating_sub(1);
        }
        self
    }

    /// Required value of `column`, or `None` if the column is don't-care.
    pub fn requires(&self, column: &str) -> Option<u8> {
        self.requirements.get(column).copied()
    }

    /// All fixed requirements, ordered by column name.
    pub const fn requirements(&self) -> &BTreeMap<&'static str, u8> {
        &self.requirements
    }

    /// Metadata bits in declaration order.
    pub fn metadata(&self) -> &[MetadataBit] {
        &self.metadata
    }

    /// True if some bit pattern satisfies both templates, i.e. every column constrained by both
    /// carries the same required value.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.requirements.iter().all(|(column, value)| {
            other
                .requirements
                .get(column)
                .is_none_or(|other_value| other_value == value)
        })
    }
}

/// Cycle structure of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// Command occupies one bus cycle.
    Single(CycleTemplate),
    /// Command spans two bus cycles.
    TwoCycle {
        /// First half; selects the operation.
        first: CycleTemplate,
        /// Second half; carries the remaining address bits.
        second: CycleTemplate,
    },
}

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    /// Protocol the template belongs to.
    pub protocol: Protocol,
    /// Identifier produced when the template matches.
    pub id: CommandId,
    /// Cycle templates.
    pub encoding: Encoding,
}

impl CommandTemplate {
    /// Creates a single-cycle template.
    pub const fn single(id: CommandId, cycle: CycleTemplate) -> Self {
        Self {
            protocol: id.protocol(),
            id,
            encoding: Encoding::Single(cycle),
        }
    }

    /// Creates a two-cycle template.
    pub const fn two_cycle(id: CommandId, first: CycleTemplate, second: CycleTemplate) -> Self {
        Self {
            protocol: id.protocol(),
            id,
            encoding: Encoding::TwoCycle { first, second },
        }
    }

    /// True for two-cycle commands.
    pub const fn is_two_cycle(&self) -> bool {
        matches!(self.encoding, Encoding::TwoCycle { .. })
    }

    /// The only cycle of a single-cycle command, or the first half of a two-cycle command.
    pub const fn first_cycle(&self) -> &CycleTemplate {
        match &self.encoding {
            Encoding::Single(cycle) | Encoding::TwoCycle { first: cycle, .. } => cycle,
        }
    }

    /// Second half of a two-cycle command.
    pub const fn second_cycle(&self) -> Option<&CycleTemplate> {
        match &self.encoding {
            Encoding::Single(_) => None,
            Encoding::TwoCycle { second, .. } => Some(second),
        }
    }

    /// All cycle templates in bus order.
    pub fn cycles(&self) -> impl Iterator<Item = &CycleTemplate> {
        std::iter::once(self.first_cycle()).chain(self.second_cycle())
    }

    /// True if any cycle routes bits into an address field.
    pub fn has_metadata(&self) -> bool {
        self.cycles().any(|cycle| !cycle.metadata.is_empty())
    }

    /// Fields this command carries.
    pub fn fields(&self) -> Vec<AddressField> {
        let mut fields: Vec<AddressField> = self
            .cycles()
            .flat_map(|cycle| cycle.metadata.iter().map(|bit| bit.field))
            .collect();
        fields.sort_unstable();
        fields.dedup();
        fields
    }
}
