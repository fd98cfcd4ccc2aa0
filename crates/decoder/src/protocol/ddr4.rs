//! DDR4 command truth table (JESD79-4).
//!
//! DDR4 commands are single-cycle. `ACT_n` low selects an activate and turns `RAS_n`, `CAS_n`,
//! and `WE_n` into row address bits 16..14; with `ACT_n` high those three pins carry the command.

use super::command::{CommandId, Ddr4Command};
use super::template::{CommandTemplate, CycleTemplate};
use crate::common::field::AddressField;

const BANKGROUP: [&str; 2] = ["BG1", "BG0"];
const BANK: [&str; 2] = ["BA1", "BA0"];
const ROW: [&str; 18] = [
    "A17", "RAS_n", "CAS_n", "WE_n", "A13", "A12", "A11", "A10", "A9", "A8", "A7", "A6", "A5",
    "A4", "A3", "A2", "A1", "A0",
];
const COLUMN: [&str; 10] = ["A9", "A8", "A7", "A6", "A5", "A4", "A3", "A2", "A1", "A0"];

fn command(ras_cas_we: [u8; 3]) -> CycleTemplate {
    CycleTemplate::new(&[
        ("CS0_n", 0),
        ("ACT_n", 1),
        ("RAS_n", ras_cas_we[0]),
        ("CAS_n", ras_cas_we[1]),
        ("WE_n", ras_cas_we[2]),
    ])
}

fn bank_address(cycle: CycleTemplate) -> CycleTemplate {
    cycle
        .field_run(AddressField::BankGroup, 1, &BANKGROUP)
        .field_run(AddressField::Bank, 1, &BANK)
}

/// Builds the DDR4 truth table in registry order.
pub fn templates() -> Vec<CommandTemplate> {
    use Ddr4Command as C;

    let id = CommandId::Ddr4;
    vec![
        CommandTemplate::single(id(C::Mrs), command([0, 0, 0])),
        CommandTemplate::single(id(C::Ref), command([0, 0, 1])),
        // A10 selects PREA; the bank bits are still routed so the caller can tell.
        CommandTemplate::single(id(C::Pre), bank_address(command([0, 1, 0]))),
        CommandTemplate::single(id(C::Rfu), command([0, 1, 1])),
        CommandTemplate::single(
            id(C::Act),
            bank_address(CycleTemplate::new(&[("CS0_n", 0), ("ACT_n", 0)]))
                .field_run(AddressField::Row, 17, &ROW),
        ),
        CommandTemplate::single(
            id(C::Wr),
            bank_address(command([1, 0, 0])).field_run(AddressField::Column, 9, &COLUMN),
        ),
        CommandTemplate::single(
            id(C::Rd),
            bank_address(command([1, 0, 1])).field_run(AddressField::Column, 9, &COLUMN),
        ),
    ]
}
