//! Command statistics collection and reporting.
//!
//! This module tracks what the bank state machine accepted. It provides:
//! 1. **Occurrence counts:** Per command identifier, optionally seeded with zero rows for every
//!    identifier of a registry so absent commands still show up.
//! 2. **ACT frequency:** Per (bankgroup, bank, row) address, plus per-bankgroup, per-bank, and
//!    per-row projections used by refresh-synchronization analysis.
//! 3. **Reporting:** Mergeable across files and printable by section.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};

use serde::Serialize;

use crate::common::field::{AddressField, FieldValue};
use crate::decode::DecodedCommand;
use crate::protocol::{CommandClass, CommandId, Registry};

const RULE: &str = "==========================================================";
const THIN_RULE: &str = "----------------------------------------------------------";

/// Address of one activated row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ActAddress {
    /// Bankgroup, if the protocol encodes one.
    pub bankgroup: Option<FieldValue>,
    /// Bank.
    pub bank: Option<FieldValue>,
    /// Row.
    pub row: Option<FieldValue>,
}

impl ActAddress {
    fn get(&self, field: AddressField) -> Option<FieldValue> {
        match field {
            AddressField::BankGroup => self.bankgroup,
            AddressField::Bank => self.bank,
            AddressField::Row => self.row,
            _ => None,
        }
    }
}

impl fmt::Display for ActAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |value: Option<FieldValue>| value.map_or_else(|| "-".to_owned(), |v| v.to_string());
        write!(
            f,
            "bg={} bk={} row={}",
            show(self.bankgroup),
            show(self.bank),
            show(self.row)
        )
    }
}

/// Command counters of one or more traces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandStats {
    counts: BTreeMap<CommandId, u64>,
    activations: HashMap<ActAddress, u64>,
}

impl CommandStats {
    /// Creates empty counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates counters with a zero row for every identifier of `registry`.
    pub fn for_registry(registry: &Registry) -> Self {
        Self {
            counts: registry.identifiers().into_iter().map(|id| (id, 0)).collect(),
            activations: HashMap::new(),
        }
    }

    /// Counts `command`; activations are also counted per address.
    pub fn record(&mut self, command: &DecodedCommand) {
        *self.counts.entry(command.id).or_insert(0) += 1;
        if command.id.class() == CommandClass::Activate {
            let address = ActAddress {
                bankgroup: command.fields.bankgroup(),
                bank: command.fields.bank(),
                row: command.fields.row(),
            };
            *self.activations.entry(address).or_insert(0) += 1;
        }
    }

    /// Occurrences of `id`.
    pub fn count(&self, id: CommandId) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// All occurrence counts, in identifier order.
    pub const fn counts(&self) -> &BTreeMap<CommandId, u64> {
        &self.counts
    }

    /// Total number of counted commands.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Activations per address.
    pub const fn activations(&self) -> &HashMap<ActAddress, u64> {
        &self.activations
    }

    /// Activations projected onto one address field (bankgroup, bank, or row).
    pub fn activations_by(&self, field: AddressField) -> BTreeMap<FieldValue, u64> {
        let mut projected = BTreeMap::new();
        for (address, count) in &self.activations {
            if let Some(value) = address.get(field) {
                *projected.entry(value).or_insert(0) += count;
            }
        }
        projected
    }

    /// The `n` most activated addresses, most frequent first; ties in address order.
    pub fn most_frequent(&self, n: usize) -> Vec<(ActAddress, u64)> {
        let mut ranked: Vec<(ActAddress, u64)> =
            self.activations.iter().map(|(a, c)| (*a, *c)).collect();
        ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Adds every counter of `other`.
    pub fn merge(&mut self, other: &Self) {
        for (id, count) in &other.counts {
            *self.counts.entry(*id).or_insert(0) += count;
        }
        for (address, count) in &other.activations {
            *self.activations.entry(*address).or_insert(0) += count;
        }
    }

    /// Occurrence counts keyed by command name.
    pub fn by_name(&self) -> BTreeMap<&'static str, u64> {
        self.counts.iter().map(|(id, count)| (id.name(), *count)).collect()
    }

    /// Renders the requested sections; an empty slice renders all of them.
    ///
    /// Sections: `commands`, `activations`, `top`.
    pub fn render_sections(&self, sections: &[String], top: usize) -> String {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let total = self.total().max(1);
        let mut out = String::new();

        let _ = writeln!(out, "\n{RULE}");
        let _ = writeln!(out, "DRAM COMMAND STATISTICS");
        let _ = writeln!(out, "{RULE}");
        if want("commands") {
            let _ = writeln!(out, "COMMANDS");
            for (id, count) in &self.counts {
                let share = (*count as f64 / total as f64) * 100.0;
                let _ = writeln!(out, "  {:<22} {count} ({share:.2}%)", id.name());
            }
            let _ = writeln!(out, "  {:<22} {}", "total", self.total());
            let _ = writeln!(out, "{THIN_RULE}");
        }
        if want("activations") {
            let _ = writeln!(out, "ACTIVATIONS");
            for field in [AddressField::BankGroup, AddressField::Bank] {
                for (value, count) in self.activations_by(field) {
                    let _ = writeln!(out, "  {field}={value} x{count}");
                }
            }
            let _ = writeln!(
                out,
                "  distinct rows          {}",
                self.activations_by(AddressField::Row).len()
            );
            let _ = writeln!(out, "{THIN_RULE}");
        }
        if want("top") {
            let _ = writeln!(out, "MOST FREQUENT ADDRESSES");
            for (address, count) in self.most_frequent(top) {
                let _ = writeln!(out, "  {address} x{count}");
            }
        }
        let _ = writeln!(out, "{RULE}");
        out
    }

    /// Prints the requested sections to stdout.
    pub fn print_sections(&self, sections: &[String], top: usize) {
        print!("{}", self.render_sections(sections, top));
    }
}
