//! Frame matcher.
//!
//! The matcher compiles every cycle template of a registry against one trace's
//! [`SignalLayout`] into a `(mask, value)` pair over the packed row word, so matching a row is a
//! single AND and compare per template. On DDR5 the two-cycle selector bit (`CA1`) decides which
//! half of the table is consulted: single-cycle templates when it is high, first halves when it
//! is low.

use rayon::prelude::*;

use crate::common::error::{DecodeError, LayoutError, MatchPosition};
use crate::common::field::{AddressField, AddressFields, FieldAccumulator};
use crate::common::signal::{SampleRow, SignalLayout};
use crate::protocol::{CommandId, CommandList, CommandTemplate, CycleTemplate, Registry};

/// Classification of one sampled row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Chip-select is deasserted; the row carries no command.
    Deselected,
    /// No template matches.
    Unknown,
    /// Exactly one single-cycle template matches (registry index).
    Single(usize),
    /// First half of a two-cycle command; every matching first half, in registry order.
    FirstCycle(Vec<usize>),
}

#[derive(Debug, Clone)]
struct CompiledCycle {
    mask: u64,
    value: u64,
    /// (row bit, field, field bit)
    metadata: Vec<(u8, AddressField, u8)>,
}

impl CompiledCycle {
    fn compile(cycle: &CycleTemplate, layout: &SignalLayout) -> Result<Self, LayoutError> {
        let mut mask = 0u64;
        let mut value = 0u64;
        for (&column, &required) in cycle.requirements() {
            let position = layout.require(column)?;
            mask |= 1 << position;
            if required != 0 {
                value |= 1 << position;
            }
        }
        let metadata = cycle
            .metadata()
            .iter()
            .map(|bit| {
                layout
                    .require(bit.column)
                    .map(|row_bit| (row_bit, bit.field, bit.position))
            })
            .collect::<Result<Vec<_>, LayoutError>>()?;
        Ok(Self {
            mask,
            value,
            metadata,
        })
    }

    const fn matches(&self, row: &SampleRow) -> bool {
        row.bits & self.mask == self.value
    }

    fn extract(&self, row: &SampleRow, acc: &mut FieldAccumulator) {
        for &(row_bit, field, field_bit) in &self.metadata {
            acc.push(field, field_bit, row.bit(row_bit));
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledTemplate {
    id: CommandId,
    has_metadata: bool,
    first: CompiledCycle,
    second: Option<CompiledCycle>,
}

/// Registry compiled against one signal layout.
#[derive(Debug)]
pub struct FrameMatcher<'r> {
    registry: &'r Registry,
    templates: Vec<CompiledTemplate>,
    single: Vec<usize>,
    first: Vec<usize>,
    chip_select: u8,
    selector: Option<(u8, u8)>,
    parallel: bool,
}

impl<'r> FrameMatcher<'r> {
    /// Compiles `registry` against `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::MissingColumn`] if a column used by the registry (or its
    /// chip-select or selector column) is not part of the layout.
    pub fn new(registry: &'r Registry, layout: &SignalLayout) -> Result<Self, LayoutError> {
        let protocol = registry.protocol();
        let chip_select = layout.require(protocol.chip_select())?;
        let selector = protocol
            .two_cycle_selector()
            .map(|(column, value)| layout.require(column).map(|bit| (bit, value)))
            .transpose()?;

        let mut templates = Vec::with_capacity(registry.templates().len());
        let mut single = Vec::new();
        let mut first = Vec::new();
        for (index, template) in registry.templates().iter().enumerate() {
            templates.push(compile_template(template, layout)?);
            if template.is_two_cycle() {
                first.push(index);
            } else {
                single.push(index);
            }
        }

        Ok(Self {
            registry,
            templates,
            single,
            first,
            chip_select,
            selector,
            parallel: false,
        })
    }

    /// Tests candidate templates of a row on the rayon pool.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Registry the matcher was compiled from.
    pub const fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Identifier of the template at `index`.
    pub fn id(&self, index: usize) -> Option<CommandId> {
        self.templates.get(index).map(|template| template.id)
    }

    /// True if the row's chip-select is deasserted.
    pub const fn is_deselected(&self, row: &SampleRow) -> bool {
        row.bit(self.chip_select) == 1
    }

    /// Classifies `row`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::AmbiguousMatch`] if more than one single-cycle template matches,
    /// which only happens with an unvalidated registry.
    pub fn classify(&self, row: &SampleRow) -> Result<Frame, DecodeError> {
        if self.is_deselected(row) {
            return Ok(Frame::Deselected);
        }

        let two_cycle = self
            .selector
            .is_some_and(|(bit, value)| row.bit(bit) == value);
        if two_cycle {
            let candidates = self.filter(&self.first, |t| t.first.matches(row));
            return Ok(if candidates.is_empty() {
                Frame::Unknown
            } else {
                Frame::FirstCycle(candidates)
            });
        }

        let matches = self.filter(&self.single, |t| t.first.matches(row));
        match matches.as_slice() {
            [] => Ok(Frame::Unknown),
            [index] => Ok(Frame::Single(*index)),
            _ => Err(self.ambiguous(row, &matches, MatchPosition::Single)),
        }
    }

    /// Candidates among `candidates` whose second half matches `row`, in registry order.
    pub fn second_cycle_matches(&self, candidates: &[usize], row: &SampleRow) -> Vec<usize> {
        self.filter(candidates, |t| {
            t.second.as_ref().is_some_and(|second| second.matches(row))
        })
    }

    /// Assembles the address fields of the template at `index` from its first row and, for
    /// two-cycle commands, its second row.
    ///
    /// Templates without metadata yield empty fields without touching the rows.
    pub fn extract(
        &self,
        index: usize,
        first: &SampleRow,
        second: Option<&SampleRow>,
    ) -> AddressFields {
        let Some(template) = self.templates.get(index).filter(|t| t.has_metadata) else {
            return AddressFields::default();
        };
        let mut acc = FieldAccumulator::new();
        template.first.extract(first, &mut acc);
        if let (Some(cycle), Some(row)) = (&template.second, second) {
            cycle.extract(row, &mut acc);
        }
        acc.finish()
    }

    pub(crate) fn ambiguous(
        &self,
        row: &SampleRow,
        indices: &[usize],
        position: MatchPosition,
    ) -> DecodeError {
        DecodeError::AmbiguousMatch {
            cycle: row.cycle,
            candidates: CommandList(indices.iter().filter_map(|&i| self.id(i)).collect()),
            position,
        }
    }

    fn filter<F>(&self, indices: &[usize], predicate: F) -> Vec<usize>
    where
        F: Fn(&CompiledTemplate) -> bool + Sync,
    {
        let keep = |index: &usize| {
            self.templates
                .get(*index)
                .is_some_and(|template| predicate(template))
        };
        if self.parallel {
            // collect() keeps registry order.
            indices.par_iter().copied().filter(keep).collect()
        } else {
            indices.iter().copied().filter(keep).collect()
        }
    }
}

fn compile_template(
    template: &CommandTemplate,
    layout: &SignalLayout,
) -> Result<CompiledTemplate, LayoutError> {
    let first = CompiledCycle::compile(template.first_cycle(), layout)?;
    let second = template
        .second_cycle()
        .map(|cycle| CompiledCycle::compile(cycle, layout))
        .transpose()?;
    Ok(CompiledTemplate {
        id: template.id,
        has_metadata: template.has_metadata(),
        first,
        second,
    })
}
