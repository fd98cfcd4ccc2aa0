//! DDR5 command truth table (JESD79-5, CA bus).
//!
//! Every command drives `CS` low in its first cycle. `CA1` splits the table: single-cycle
//! commands drive it high, two-cycle commands drive it low and follow up with a second cycle in
//! which `CS` is high.

use super::command::{CommandId, Ddr5Command};
use super::template::{CommandTemplate, CycleTemplate};
use crate::common::field::AddressField;

const BANK: [&str; 2] = ["CA7", "CA6"];
const BANKGROUP: [&str; 3] = ["CA10", "CA9", "CA8"];
const ROW_LOW: [&str; 4] = ["CA5", "CA4", "CA3", "CA2"];
const ROW_HIGH: [&str; 12] = [
    "CA11", "CA10", "CA9", "CA8", "CA7", "CA6", "CA5", "CA4", "CA3", "CA2", "CA1", "CA0",
];
const COLUMN: [&str; 9] = ["CA8", "CA7", "CA6", "CA5", "CA4", "CA3", "CA2", "CA1", "CA0"];
const MODE_REGISTER: [&str; 8] = ["CA12", "CA11", "CA10", "CA9", "CA8", "CA7", "CA6", "CA5"];
const OPCODE_MPC: [&str; 8] = MODE_REGISTER;
const OPCODE_MRW: [&str; 8] = ["CA7", "CA6", "CA5", "CA4", "CA3", "CA2", "CA1", "CA0"];

/// Single-cycle command: `CS=0 CA0=1 CA1=1` plus the opcode bits `CA2..CA4` and `extra`.
fn single(cmd: Ddr5Command, ca2_4: [u8; 3], extra: &[(&'static str, u8)]) -> CycleTemplate {
    let mut requirements = vec![
        ("CS", 0),
        ("CA0", 1),
        ("CA1", 1),
        ("CA2", ca2_4[0]),
        ("CA3", ca2_4[1]),
        ("CA4", ca2_4[2]),
    ];
    requirements.extend_from_slice(extra);
    let cycle = CycleTemplate::new(&requirements);
    match cmd {
        Ddr5Command::RefSb | Ddr5Command::RfmSb | Ddr5Command::PreSb => {
            cycle.field_run(AddressField::Bank, 1, &BANK)
        }
        Ddr5Command::PrePb => cycle
            .field_run(AddressField::Bank, 1, &BANK)
            .field_run(AddressField::BankGroup, 2, &BANKGROUP),
        Ddr5Command::Mpc => cycle.field_run(AddressField::Opcode, 7, &OPCODE_MPC),
        _ => cycle,
    }
}

/// First half of a column command (`CA0=1 CA1=0`), keyed by `CA2..CA4`.
fn column_first(ca2_4: [u8; 3]) -> CycleTemplate {
    CycleTemplate::new(&[
        ("CS", 0),
        ("CA0", 1),
        ("CA1", 0),
        ("CA2", ca2_4[0]),
        ("CA3", ca2_4[1]),
        ("CA4", ca2_4[2]),
    ])
}

fn bank_address(cycle: CycleTemplate) -> CycleTemplate {
    cycle
        .field_run(AddressField::Bank, 1, &BANK)
        .field_run(AddressField::BankGroup, 2, &BANKGROUP)
}

/// Second half of a read/write; `CA10` high keeps the row open, low requests auto-precharge.
fn column_second(ca10: u8) -> CycleTemplate {
    CycleTemplate::new(&[("CS", 1), ("CA10", ca10)]).field_run(AddressField::Column, 10, &COLUMN)
}

fn id(cmd: Ddr5Command) -> CommandId {
    CommandId::Ddr5(cmd)
}

/// Builds the DDR5 truth table in registry order.
pub fn templates() -> Vec<CommandTemplate> {
    use Ddr5Command as C;

    let singles: [(Ddr5Command, [u8; 3], &[(&'static str, u8)]); 15] = [
        (C::RefAb, [0, 0, 1], &[("CA9", 1), ("CA10", 0)]),
        (C::RefSb, [0, 0, 1], &[("CA9", 1), ("CA10", 1)]),
        (C::RfmAb, [0, 0, 1], &[("CA9", 0), ("CA10", 0)]),
        (C::RfmSb, [0, 0, 1], &[("CA9", 0), ("CA10", 1)]),
        (C::PreAb, [0, 1, 0], &[("CA10", 0)]),
        (C::PreSb, [0, 1, 0], &[("CA10", 1)]),
        (C::PrePb, [0, 1, 1], &[]),
        (C::NopPdx, [1, 1, 1], &[]),
        (C::Mpc, [1, 1, 0], &[]),
        (C::Pde, [1, 0, 1], &[("CA10", 1)]),
        (C::Sre, [1, 0, 1], &[("CA9", 1), ("CA10", 0)]),
        (C::SreF, [1, 0, 1], &[("CA9", 0), ("CA10", 0)]),
        (C::Rfu1c, [1, 0, 0], &[]),
        (C::VrefCa, [0, 0, 0], &[("CA12", 0)]),
        (C::VrefCs, [0, 0, 0], &[("CA12", 1)]),
    ];
    let mut table: Vec<CommandTemplate> = singles
        .into_iter()
        .map(|(cmd, opcode, extra)| CommandTemplate::single(id(cmd), single(cmd, opcode, extra)))
        .collect();

    // Row bits 3..0 travel in the first half, 15..4 in the second.
    table.push(CommandTemplate::two_cycle(
        id(C::Act),
        bank_address(CycleTemplate::new(&[("CS", 0), ("CA0", 0), ("CA1", 0)]))
            .field_run(AddressField::Row, 3, &ROW_LOW),
        CycleTemplate::new(&[("CS", 1)]).field_run(AddressField::Row, 15, &ROW_HIGH),
    ));

    for (cmd, opcode, ca10) in [
        (C::Wr, [1, 1, 0], 1),
        (C::Wra, [1, 1, 0], 0),
        (C::Rd, [1, 1, 1], 1),
        (C::Rda, [1, 1, 1], 0),
    ] {
        table.push(CommandTemplate::two_cycle(
            id(cmd),
            bank_address(column_first(opcode)),
            column_second(ca10),
        ));
    }

    table.push(CommandTemplate::two_cycle(
        id(C::Mrr),
        column_first([1, 0, 1]).field_run(AddressField::ModeRegister, 7, &MODE_REGISTER),
        CycleTemplate::new(&[("CS", 1), ("CA0", 0), ("CA1", 0)]),
    ));
    table.push(CommandTemplate::two_cycle(
        id(C::Mrw),
        column_first([1, 0, 0]).field_run(AddressField::ModeRegister, 7, &MODE_REGISTER),
        CycleTemplate::new(&[("CS", 1)]).field_run(AddressField::Opcode, 7, &OPCODE_MRW),
    ));

    // Three reserved first-cycle encodings share one identifier.
    for opcode in [[0, 0, 0], [0, 0, 1], [0, 1, 1]] {
        table.push(CommandTemplate::two_cycle(
            id(C::Rfu),
            column_first(opcode),
            CycleTemplate::new(&[("CS", 1)]),
        ));
    }

    table
}
