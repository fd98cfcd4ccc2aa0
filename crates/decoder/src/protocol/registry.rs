//! Command template registry.
//!
//! The registry owns the truth table of one protocol. It is built once, validated, and then
//! only read: the matcher compiles it against a trace's signal layout and every worker shares
//! it by reference.
//!
//! Validation enforces the collision-free invariant:
//! 1. **Single-cycle templates** are compared pairwise; two collide when every column both
//!    constrain carries the same required value.
//! 2. **Two-cycle templates** are compared as (first, second) pairs and collide only when both
//!    halves overlap. First halves may overlap on purpose (WR/WRA are told apart by the second
//!    cycle alone).
//! 3. **Selectors:** on DDR5 every first half requires `CA1=0`, no single-cycle template
//!    requires it, and every second half requires `CS=1`.
//! 4. **Metadata:** field bits are unique per command, below 32, and never sampled from a
//!    column the same cycle also requires.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use super::command::CommandId;
use super::template::{CommandTemplate, CycleTemplate};
use super::{ddr4, ddr5, Protocol};
use crate::common::error::{CyclePosition, RegistryError};
use crate::common::field::MAX_FIELD_BITS;

/// Validated, immutable template table for one protocol.
#[derive(Debug, Clone)]
pub struct Registry {
    protocol: Protocol,
    templates: Vec<CommandTemplate>,
}

impl Registry {
    /// Built-in truth table of `protocol`.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in table itself violates the registry invariants.
    pub fn for_protocol(protocol: Protocol) -> Result<Self, RegistryError> {
        let templates = match protocol {
            Protocol::Ddr4 => ddr4::templates(),
            Protocol::Ddr5 => ddr5::templates(),
        };
        Self::new(protocol, templates)
    }

    /// Validates `templates` and builds a registry.
    ///
    /// # Arguments
    ///
    /// * `protocol` - Protocol every template must belong to.
    /// * `templates` - Templates in registry order; order decides candidate order at decode time.
    ///
    /// # Errors
    ///
    /// Returns the first [`RegistryError`] found.
    pub fn new(protocol: Protocol, templates: Vec<CommandTemplate>) -> Result<Self, RegistryError> {
        for template in &templates {
            validate_template(protocol, template)?;
        }
        check_collisions(&templates)?;
        debug!(
            protocol = %protocol,
            templates = templates.len(),
            "command registry validated"
        );
        Ok(Self {
            protocol,
            templates,
        })
    }

    /// Builds a registry without validation.
    ///
    /// Decoding with an inconsistent table surfaces the collision as
    /// `DecodeError::AmbiguousMatch` instead of failing up front.
    pub const fn new_unchecked(protocol: Protocol, templates: Vec<CommandTemplate>) -> Self {
        Self {
            protocol,
            templates,
        }
    }

    /// Registry protocol.
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// All templates in registry order.
    pub fn templates(&self) -> &[CommandTemplate] {
        &self.templates
    }

    /// Template at `index`.
    pub fn get(&self, index: usize) -> Option<&CommandTemplate> {
        self.templates.get(index)
    }

    /// First template with identifier `id`.
    ///
    /// Some identifiers (DDR5 `RFU`) own several templates; use
    /// [`lookup_all`](Self::lookup_all) to see every encoding.
    pub fn lookup(&self, id: CommandId) -> Option<&CommandTemplate> {
        self.templates.iter().find(|template| template.id == id)
    }

    /// Every template with identifier `id`.
    pub fn lookup_all(&self, id: CommandId) -> impl Iterator<Item = &CommandTemplate> + '_ {
        self.templates.iter().filter(move |template| template.id == id)
    }

    /// Looks up a template by its truth-table name.
    pub fn lookup_name(&self, name: &str) -> Option<&CommandTemplate> {
        CommandId::from_name(self.protocol, name).and_then(|id| self.lookup(id))
    }

    /// Distinct identifiers in registry order.
    pub fn identifiers(&self) -> Vec<CommandId> {
        let mut seen = HashSet::new();
        self.templates
            .iter()
            .map(|template| template.id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Every column the registry constrains or samples, plus chip-select.
    pub fn columns(&self) -> BTreeSet<&'static str> {
        let mut columns = BTreeSet::new();
        let _ = columns.insert(self.protocol.chip_select());
        if let Some((selector, _)) = self.protocol.two_cycle_selector() {
            let _ = columns.insert(selector);
        }
        for cycle in self.templates.iter().flat_map(CommandTemplate::cycles) {
            columns.extend(cycle.requirements().keys().copied());
            columns.extend(cycle.metadata().iter().map(|bit| bit.column));
        }
        columns
    }
}

fn validate_template(protocol: Protocol, template: &CommandTemplate) -> Result<(), RegistryError> {
    let id = template.id;
    if template.protocol != protocol {
        return Err(RegistryError::ProtocolMismatch {
            id,
            expected: protocol,
            found: template.protocol,
        });
    }

    let selector = protocol.two_cycle_selector();
    match (template.first_cycle(), template.second_cycle()) {
        (single, None) => {
            validate_cycle(id, single, CyclePosition::Single)?;
            if let Some((column, value)) = selector {
                if single.requires(column) == Some(value) {
                    return Err(RegistryError::SelectorInSingleCycle { id, column, value });
                }
            }
        }
        (first, Some(second)) => {
            let Some((column, value)) = selector else {
                return Err(RegistryError::TwoCycleUnsupported { id, protocol });
            };
            validate_cycle(id, first, CyclePosition::First)?;
            validate_cycle(id, second, CyclePosition::Second)?;
            if first.requires(column) != Some(value) {
                return Err(RegistryError::MissingSelector { id, column, value });
            }
            let chip_select = protocol.chip_select();
            if second.requires(chip_select) != Some(1) {
                return Err(RegistryError::UnselectedSecondCycle {
                    id,
                    column: chip_select,
                });
            }
        }
    }

    let mut declared = HashSet::new();
    for bit in template.cycles().flat_map(CycleTemplate::metadata) {
        if bit.position >= MAX_FIELD_BITS {
            return Err(RegistryError::FieldBitOutOfRange {
                id,
                field: bit.field,
                position: bit.position,
            });
        }
        if !declared.insert((bit.field, bit.position)) {
            return Err(RegistryError::DuplicateFieldBit {
                id,
                field: bit.field,
                position: bit.position,
            });
        }
    }
    Ok(())
}

fn validate_cycle(
    id: CommandId,
    cycle: &CycleTemplate,
    position: CyclePosition,
) -> Result<(), RegistryError> {
    if let Some((&column, &value)) = cycle.requirements().iter().find(|&(_, &value)| value > 1) {
        return Err(RegistryError::InvalidBitValue { id, column, value });
    }
    if let Some(bit) = cycle
        .metadata()
        .iter()
        .find(|bit| cycle.requires(bit.column).is_some())
    {
        return Err(RegistryError::MetadataOnRequiredColumn {
            id,
            column: bit.column,
            field: bit.field,
            position,
        });
    }
    Ok(())
}

fn check_collisions(templates: &[CommandTemplate]) -> Result<(), RegistryError> {
    for (i, a) in templates.iter().enumerate() {
        for b in &templates[i + 1..] {
            let position = match (a.second_cycle(), b.second_cycle()) {
                (None, None) if a.first_cycle().overlaps(b.first_cycle()) => {
                    CyclePosition::Single
                }
                (Some(a_second), Some(b_second))
                    if a.first_cycle().overlaps(b.first_cycle())
                        && a_second.overlaps(b_second) =>
                {
                    CyclePosition::Second
                }
                // A single-cycle template against a first half is kept apart by the selector,
                // which validate_template already enforced.
                _ => continue,
            };
            return Err(RegistryError::Collision {
                first: a.id,
                second: b.id,
                position,
            });
        }
    }
    Ok(())
}
