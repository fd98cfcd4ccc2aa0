//! # Shared Test Infrastructure
//!
//! Builders for signal layouts, sampled rows, and synthetic command encodings, plus a one-call
//! decode harness.

use std::collections::BTreeMap;

use dramscope_core::common::field::{AddressField, AddressFields, FieldValue};
use dramscope_core::common::{DecodeError, SampleRow, SignalLayout};
use dramscope_core::config::Config;
use dramscope_core::decode::DecodedTrace;
use dramscope_core::protocol::{AddressingMode, CommandTemplate, CycleTemplate, Protocol};
use dramscope_core::{Registry, TraceDecoder};

/// Clock period used for synthetic timestamps, in seconds.
pub const PERIOD: f64 = 1e-9;

/// DDR5 bus columns, clock first.
pub const DDR5_COLUMNS: &[&str] = &[
    "CK0", "CS", "CA0", "CA1", "CA2", "CA3", "CA4", "CA5", "CA6", "CA7", "CA8", "CA9", "CA10",
    "CA11", "CA12", "CA13",
];

/// DDR4 bus columns, clock first.
pub const DDR4_COLUMNS: &[&str] = &[
    "CK0", "CS0_n", "ACT_n", "RAS_n", "CAS_n", "WE_n", "BG1", "BG0", "BA1", "BA0", "A17", "A13",
    "A12", "A11", "A10", "A9", "A8", "A7", "A6", "A5", "A4", "A3", "A2", "A1", "A0",
];

/// Signal list type used by every builder.
pub type Signals = Vec<(&'static str, u8)>;

/// Timestamp of `cycle`.
pub fn time(cycle: u64) -> f64 {
    cycle as f64 * PERIOD
}

pub fn layout(protocol: Protocol) -> SignalLayout {
    let columns = match protocol {
        Protocol::Ddr4 => DDR4_COLUMNS,
        Protocol::Ddr5 => DDR5_COLUMNS,
    };
    SignalLayout::new(columns.iter().copied()).unwrap()
}

pub fn registry(protocol: Protocol) -> Registry {
    Registry::for_protocol(protocol).unwrap()
}

/// Spreads `value` over `columns`, most significant bit first.
pub fn bits(columns: &[&'static str], value: u32) -> Signals {
    let n = columns.len();
    columns
        .iter()
        .enumerate()
        .map(|(i, column)| (*column, ((value >> (n - 1 - i)) & 1) as u8))
        .collect()
}

/// Concatenates signal lists.
pub fn join(parts: &[Signals]) -> Signals {
    parts.iter().flatten().copied().collect()
}

// ══════════════════════════════════════════════════════════
// DDR5 encodings
// ══════════════════════════════════════════════════════════

pub mod ddr5 {
    use super::{Signals, bits, join};

    pub const BANK: [&str; 2] = ["CA7", "CA6"];
    pub const BANKGROUP: [&str; 3] = ["CA10", "CA9", "CA8"];
    pub const ROW_LOW: [&str; 4] = ["CA5", "CA4", "CA3", "CA2"];
    pub const ROW_HIGH: [&str; 12] = [
        "CA11", "CA10", "CA9", "CA8", "CA7", "CA6", "CA5", "CA4", "CA3", "CA2", "CA1", "CA0",
    ];
    pub const COLUMN: [&str; 9] = ["CA8", "CA7", "CA6", "CA5", "CA4", "CA3", "CA2", "CA1", "CA0"];

    /// REFab: CA0=1 CA1=1 CA2=0 CA3=0 CA4=1 CA9=1 CA10=0.
    pub fn refab() -> Signals {
        vec![("CA0", 1), ("CA1", 1), ("CA2", 0), ("CA3", 0), ("CA4", 1), ("CA9", 1), ("CA10", 0)]
    }

    /// REFsb for `bank`.
    pub fn refsb(bank: u32) -> Signals {
        join(&[
            vec![("CA0", 1), ("CA1", 1), ("CA2", 0), ("CA3", 0), ("CA4", 1), ("CA9", 1), ("CA10", 1)],
            bits(&BANK, bank),
        ])
    }

    /// NOP/PDX.
    pub fn nop() -> Signals {
        vec![("CA0", 1), ("CA1", 1), ("CA2", 1), ("CA3", 1), ("CA4", 1)]
    }

    /// First half of ACT.
    pub fn act_first(bankgroup: u32, bank: u32, row_low: u32) -> Signals {
        join(&[
            vec![("CA0", 0), ("CA1", 0)],
            bits(&BANKGROUP, bankgroup),
            bits(&BANK, bank),
            bits(&ROW_LOW, row_low),
        ])
    }

    /// Second half of ACT.
    pub fn act_second(row_high: u32) -> Signals {
        join(&[vec![("CS", 1)], bits(&ROW_HIGH, row_high)])
    }

    /// First half of WR (`read = false`) or RD.
    pub fn column_first(read: bool, bankgroup: u32, bank: u32) -> Signals {
        join(&[
            vec![("CA0", 1), ("CA1", 0), ("CA2", 1), ("CA3", 1), ("CA4", u8::from(read))],
            bits(&BANKGROUP, bankgroup),
            bits(&BANK, bank),
        ])
    }

    /// Second half of a column command; `auto_precharge` clears CA10.
    pub fn column_second(auto_precharge: bool, column: u32) -> Signals {
        join(&[
            vec![("CS", 1), ("CA10", u8::from(!auto_precharge))],
            bits(&COLUMN, column),
        ])
    }
}

// ══════════════════════════════════════════════════════════
// Trace builder
// ══════════════════════════════════════════════════════════

/// Fluent builder for a sampled trace.
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    layout: SignalLayout,
    chip_select: &'static str,
    rows: Vec<SampleRow>,
}

impl TraceBuilder {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            layout: layout(protocol),
            chip_select: protocol.chip_select(),
            rows: Vec::new(),
        }
    }

    pub fn ddr5() -> Self {
        Self::new(Protocol::Ddr5)
    }

    pub fn ddr4() -> Self {
        Self::new(Protocol::Ddr4)
    }

    /// Row at `cycle` with the given signals; unnamed signals (including chip-select) are 0.
    pub fn row(mut self, cycle: u64, signals: &[(&'static str, u8)]) -> Self {
        let row = SampleRow::from_signals(&self.layout, time(cycle), cycle, signals).unwrap();
        self.rows.push(row);
        self
    }

    /// Deselected row at `cycle`.
    pub fn idle(self, cycle: u64) -> Self {
        let cs = self.chip_select;
        self.row(cycle, &[(cs, 1)])
    }

    /// Deselected rows for every cycle in `range`.
    pub fn idle_range(mut self, range: std::ops::Range<u64>) -> Self {
        for cycle in range {
            self = self.idle(cycle);
        }
        self
    }

    pub fn layout(&self) -> &SignalLayout {
        &self.layout
    }

    pub fn rows(&self) -> &[SampleRow] {
        &self.rows
    }

    pub fn build(self) -> (SignalLayout, Vec<SampleRow>) {
        (self.layout, self.rows)
    }
}

// ══════════════════════════════════════════════════════════
// Synthetic encodings from templates
// ══════════════════════════════════════════════════════════

/// Signals satisfying `cycle` exactly, with metadata bits taken from `patterns`.
///
/// Bit `k` of a pattern goes to the field's `k`-th lowest declared position (`ranks`).
fn synth_cycle(
    cycle: &CycleTemplate,
    chip_select: &'static str,
    patterns: &BTreeMap<AddressField, u32>,
    ranks: &BTreeMap<(AddressField, u8), u32>,
) -> Signals {
    let mut signals: Signals = vec![(chip_select, 0)];
    signals.extend(cycle.requirements().iter().map(|(c, v)| (*c, *v)));
    for bit in cycle.metadata() {
        let pattern = patterns.get(&bit.field).copied().unwrap_or(0);
        let rank = ranks[&(bit.field, bit.position)];
        signals.push((bit.column, ((pattern >> rank) & 1) as u8));
    }
    signals
}

/// Signals of every cycle of `template`, plus the fields the decoder must recover.
pub fn synthesize(
    template: &CommandTemplate,
    chip_select: &'static str,
    patterns: &BTreeMap<AddressField, u32>,
) -> (Vec<Signals>, AddressFields) {
    let mut positions: BTreeMap<AddressField, Vec<u8>> = BTreeMap::new();
    for bit in template.cycles().flat_map(CycleTemplate::metadata) {
        positions.entry(bit.field).or_default().push(bit.position);
    }

    let mut ranks = BTreeMap::new();
    let mut expected = AddressFields::default();
    for (field, mut declared) in positions {
        declared.sort_unstable();
        for (rank, position) in declared.iter().enumerate() {
            let _ = ranks.insert((field, *position), rank as u32);
        }
        let pattern = patterns.get(&field).copied().unwrap_or(0);
        expected.set(field, FieldValue::new(pattern, declared.len() as u8));
    }

    let cycles = template
        .cycles()
        .map(|cycle| synth_cycle(cycle, chip_select, patterns, &ranks))
        .collect();
    (cycles, expected)
}

// ══════════════════════════════════════════════════════════
// Decode harness
// ══════════════════════════════════════════════════════════

/// Configuration for `protocol` with the given addressing mode and FGR capability.
pub fn config(protocol: Protocol, addressing: AddressingMode, fgr: bool) -> Config {
    let mut config = Config::default();
    config.decoder.protocol = protocol;
    config.decoder.addressing = addressing;
    config.dimm.fgr = fgr;
    config
}

/// Decodes `rows` with the built-in registry of `config.decoder.protocol`.
pub fn decode_with(
    config: &Config,
    layout: &SignalLayout,
    rows: &[SampleRow],
) -> Result<DecodedTrace, DecodeError> {
    let registry = registry(config.decoder.protocol);
    TraceDecoder::new(&registry, config)?.decode(layout, rows)
}

/// Decodes a DDR5 2N trace without FGR.
pub fn decode_ddr5(builder: &TraceBuilder) -> Result<DecodedTrace, DecodeError> {
    let config = config(Protocol::Ddr5, AddressingMode::TwoN, false);
    decode_with(&config, builder.layout(), builder.rows())
}

// ══════════════════════════════════════════════════════════
// Trace files
// ══════════════════════════════════════════════════════════

/// Renders `rows` as a cycle-counted CSV trace.
pub fn to_csv(layout: &SignalLayout, rows: &[SampleRow]) -> String {
    let columns = layout.names();
    let mut text = format!("Time,cycle_cnt,{}\n", columns.join(","));
    for row in rows {
        let cells: Vec<String> = (0..columns.len())
            .map(|position| row.bit(position as u8).to_string())
            .collect();
        text.push_str(&format!("{},{},{}\n", row.timestamp, row.cycle, cells.join(",")));
    }
    text
}

/// Writes `builder`'s trace to `path` as a cycle-counted CSV file.
pub fn write_trace(path: &std::path::Path, builder: &TraceBuilder) {
    std::fs::write(path, to_csv(builder.layout(), builder.rows())).unwrap();
}
