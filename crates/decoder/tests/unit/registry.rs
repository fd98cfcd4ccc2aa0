//! # Registry Tests
//!
//! Built-in truth tables validate, and every class of inconsistent table is rejected when the
//! registry is built.

use dramscope_core::Registry;
use dramscope_core::common::field::AddressField;
use dramscope_core::common::{CyclePosition, RegistryError};
use dramscope_core::protocol::{
    CommandId, CommandTemplate, CycleTemplate, Ddr4Command, Ddr5Command, Protocol,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn ddr5(cmd: Ddr5Command) -> CommandId {
    CommandId::Ddr5(cmd)
}

fn single(cmd: Ddr5Command, requirements: &[(&'static str, u8)]) -> CommandTemplate {
    CommandTemplate::single(ddr5(cmd), CycleTemplate::new(requirements))
}

// ══════════════════════════════════════════════════════════
// 1. Built-in tables
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(Protocol::Ddr5, 23)]
#[case(Protocol::Ddr4, 7)]
fn test_builtin_identifiers(#[case] protocol: Protocol, #[case] count: usize) {
    let registry = Registry::for_protocol(protocol).unwrap();
    assert_eq!(registry.protocol(), protocol);
    let mut identifiers = registry.identifiers();
    assert_eq!(identifiers.len(), count);
    identifiers.sort_unstable();
    let mut all = CommandId::all(protocol);
    all.sort_unstable();
    assert_eq!(identifiers, all);
}

#[test]
fn test_ddr5_two_cycle_commands() {
    let registry = Registry::for_protocol(Protocol::Ddr5).unwrap();
    let two_cycle: Vec<&str> = registry
        .templates()
        .iter()
        .filter(|t| t.is_two_cycle())
        .map(|t| t.id.name())
        .collect();
    assert_eq!(
        two_cycle,
        vec!["ACT", "WR", "WRA", "RD", "RDA", "MRR", "MRW", "RFU", "RFU", "RFU"]
    );
}

#[test]
fn test_ddr4_has_no_two_cycle_commands() {
    let registry = Registry::for_protocol(Protocol::Ddr4).unwrap();
    assert!(registry.templates().iter().all(|t| !t.is_two_cycle()));
}

#[test]
fn test_lookup_by_name() {
    let registry = Registry::for_protocol(Protocol::Ddr5).unwrap();
    let act = registry.lookup_name("ACT").unwrap();
    assert_eq!(act.id, ddr5(Ddr5Command::Act));
    assert_eq!(
        act.fields(),
        vec![AddressField::BankGroup, AddressField::Bank, AddressField::Row]
    );
    assert!(registry.lookup_name("REFpb").is_none());
    assert!(registry.lookup(ddr5(Ddr5Command::RefAb)).is_some());
}

#[test]
fn test_columns_include_chip_select() {
    let registry = Registry::for_protocol(Protocol::Ddr4).unwrap();
    let columns = registry.columns();
    assert!(columns.contains("CS0_n"));
    assert!(columns.contains("ACT_n"));
    assert!(columns.contains("A17"));
}

#[test]
fn test_act_row_spans_both_cycles() {
    let registry = Registry::for_protocol(Protocol::Ddr5).unwrap();
    let act = registry.lookup(ddr5(Ddr5Command::Act)).unwrap();
    let row_bits = |cycle: &CycleTemplate| {
        cycle
            .metadata()
            .iter()
            .filter(|bit| bit.field == AddressField::Row)
            .count()
    };
    assert_eq!(row_bits(act.first_cycle()), 4);
    assert_eq!(row_bits(act.second_cycle().unwrap()), 12);
}

// ══════════════════════════════════════════════════════════
// 2. Collisions
// ══════════════════════════════════════════════════════════

#[test]
fn test_single_cycle_collision() {
    // Neither template constrains a column the other pins to a different value.
    let templates = vec![
        single(Ddr5Command::RefAb, &[("CS", 0), ("CA0", 1), ("CA1", 1), ("CA9", 1)]),
        single(Ddr5Command::RfmAb, &[("CS", 0), ("CA0", 1), ("CA1", 1), ("CA10", 0)]),
    ];
    assert_eq!(
        Registry::new(Protocol::Ddr5, templates).unwrap_err(),
        RegistryError::Collision {
            first: ddr5(Ddr5Command::RefAb),
            second: ddr5(Ddr5Command::RfmAb),
            position: CyclePosition::Single,
        }
    );
}

#[test]
fn test_exclusive_single_cycle_templates() {
    let templates = vec![
        single(Ddr5Command::RefAb, &[("CS", 0), ("CA0", 1), ("CA1", 1), ("CA9", 1)]),
        single(Ddr5Command::RfmAb, &[("CS", 0), ("CA0", 1), ("CA1", 1), ("CA9", 0)]),
    ];
    assert!(Registry::new(Protocol::Ddr5, templates).is_ok());
}

#[test]
fn test_shared_first_half_is_allowed() {
    let first = CycleTemplate::new(&[("CS", 0), ("CA0", 1), ("CA1", 0)]);
    let templates = vec![
        CommandTemplate::two_cycle(
            ddr5(Ddr5Command::Wr),
            first.clone(),
            CycleTemplate::new(&[("CS", 1), ("CA10", 1)]),
        ),
        CommandTemplate::two_cycle(
            ddr5(Ddr5Command::Wra),
            first,
            CycleTemplate::new(&[("CS", 1), ("CA10", 0)]),
        ),
    ];
    assert!(Registry::new(Protocol::Ddr5, templates).is_ok());
}

#[test]
fn test_two_cycle_collision() {
    let first = CycleTemplate::new(&[("CS", 0), ("CA0", 1), ("CA1", 0)]);
    let second = CycleTemplate::new(&[("CS", 1)]);
    let templates = vec![
        CommandTemplate::two_cycle(ddr5(Ddr5Command::Rd), first.clone(), second.clone()),
        CommandTemplate::two_cycle(ddr5(Ddr5Command::Rda), first, second),
    ];
    assert!(matches!(
        Registry::new(Protocol::Ddr5, templates),
        Err(RegistryError::Collision {
            position: CyclePosition::Second,
            ..
        })
    ));
}

// ══════════════════════════════════════════════════════════
// 3. Structural checks
// ══════════════════════════════════════════════════════════

#[test]
fn test_first_cycle_requires_selector() {
    let templates = vec![CommandTemplate::two_cycle(
        ddr5(Ddr5Command::Act),
        CycleTemplate::new(&[("CS", 0), ("CA0", 0)]),
        CycleTemplate::new(&[("CS", 1)]),
    )];
    assert_eq!(
        Registry::new(Protocol::Ddr5, templates).unwrap_err(),
        RegistryError::MissingSelector {
            id: ddr5(Ddr5Command::Act),
            column: "CA1",
            value: 0,
        }
    );
}

#[test]
fn test_second_cycle_requires_chip_select_high() {
    let templates = vec![CommandTemplate::two_cycle(
        ddr5(Ddr5Command::Act),
        CycleTemplate::new(&[("CS", 0), ("CA0", 0), ("CA1", 0)]),
        CycleTemplate::new(&[("CA0", 1)]),
    )];
    assert_eq!(
        Registry::new(Protocol::Ddr5, templates).unwrap_err(),
        RegistryError::UnselectedSecondCycle {
            id: ddr5(Ddr5Command::Act),
            column: "CS",
        }
    );
}

#[test]
fn test_single_cycle_may_not_require_selector() {
    let templates = vec![single(Ddr5Command::NopPdx, &[("CS", 0), ("CA1", 0)])];
    assert!(matches!(
        Registry::new(Protocol::Ddr5, templates),
        Err(RegistryError::SelectorInSingleCycle { column: "CA1", .. })
    ));
}

#[test]
fn test_ddr4_rejects_two_cycle_templates() {
    let templates = vec![CommandTemplate::two_cycle(
        CommandId::Ddr4(Ddr4Command::Act),
        CycleTemplate::new(&[("CS0_n", 0)]),
        CycleTemplate::new(&[("CS0_n", 1)]),
    )];
    assert!(matches!(
        Registry::new(Protocol::Ddr4, templates),
        Err(RegistryError::TwoCycleUnsupported { .. })
    ));
}

#[test]
fn test_duplicate_field_bit() {
    let cycle = CycleTemplate::new(&[("CS", 0), ("CA0", 1), ("CA1", 1)])
        .field(AddressField::Bank, &[("CA6", 0), ("CA7", 0)]);
    let templates = vec![CommandTemplate::single(ddr5(Ddr5Command::PreSb), cycle)];
    assert_eq!(
        Registry::new(Protocol::Ddr5, templates).unwrap_err(),
        RegistryError::DuplicateFieldBit {
            id: ddr5(Ddr5Command::PreSb),
            field: AddressField::Bank,
            position: 0,
        }
    );
}

#[test]
fn test_field_bit_out_of_range() {
    let cycle = CycleTemplate::new(&[("CS", 0), ("CA0", 1), ("CA1", 1)])
        .field(AddressField::Opcode, &[("CA6", 40)]);
    let templates = vec![CommandTemplate::single(ddr5(Ddr5Command::Mpc), cycle)];
    assert!(matches!(
        Registry::new(Protocol::Ddr5, templates),
        Err(RegistryError::FieldBitOutOfRange { position: 40, .. })
    ));
}

#[test]
fn test_metadata_on_required_column() {
    let cycle = CycleTemplate::new(&[("CS", 0), ("CA0", 1), ("CA1", 1), ("CA6", 0)])
        .field(AddressField::Bank, &[("CA6", 0)]);
    let templates = vec![CommandTemplate::single(ddr5(Ddr5Command::PreSb), cycle)];
    assert!(matches!(
        Registry::new(Protocol::Ddr5, templates),
        Err(RegistryError::MetadataOnRequiredColumn { column: "CA6", .. })
    ));
}

#[test]
fn test_invalid_bit_value() {
    let templates = vec![single(Ddr5Command::NopPdx, &[("CS", 0), ("CA1", 1), ("CA2", 2)])];
    assert!(matches!(
        Registry::new(Protocol::Ddr5, templates),
        Err(RegistryError::InvalidBitValue { value: 2, .. })
    ));
}

#[test]
fn test_protocol_mismatch() {
    let templates = vec![CommandTemplate::single(
        CommandId::Ddr4(Ddr4Command::Ref),
        CycleTemplate::new(&[("CS0_n", 0)]),
    )];
    assert_eq!(
        Registry::new(Protocol::Ddr5, templates).unwrap_err(),
        RegistryError::ProtocolMismatch {
            id: CommandId::Ddr4(Ddr4Command::Ref),
            expected: Protocol::Ddr5,
            found: Protocol::Ddr4,
        }
    );
}
