//! # Frame Matcher Tests
//!
//! Row classification (deselect, unknown, single-cycle, first half), field extraction, and the
//! fatal ambiguous-match path of an unvalidated registry.

use dramscope_core::common::field::{AddressField, FieldValue};
use dramscope_core::common::{DecodeError, LayoutError, MatchPosition, SampleRow, SignalLayout};
use dramscope_core::decode::{Frame, FrameMatcher};
use dramscope_core::protocol::{
    CommandId, CommandList, CommandTemplate, CycleTemplate, Ddr4Command, Ddr5Command, Protocol,
};
use dramscope_core::Registry;
use pretty_assertions::assert_eq;

use crate::common::{self, ddr5, join};

fn index_of(registry: &Registry, id: CommandId) -> usize {
    registry.templates().iter().position(|t| t.id == id).unwrap()
}

fn row(layout: &SignalLayout, signals: &[(&'static str, u8)]) -> SampleRow {
    SampleRow::from_signals(layout, 0.0, 0, signals).unwrap()
}

// ══════════════════════════════════════════════════════════
// 1. Classification
// ══════════════════════════════════════════════════════════

#[test]
fn test_refab_literal_is_single_cycle() {
    let registry = common::registry(Protocol::Ddr5);
    let layout = common::layout(Protocol::Ddr5);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();

    let refab = row(&layout, &ddr5::refab());
    let expected = index_of(&registry, CommandId::Ddr5(Ddr5Command::RefAb));
    assert_eq!(matcher.classify(&refab).unwrap(), Frame::Single(expected));
    assert!(matcher.extract(expected, &refab, None).is_empty());
}

#[test]
fn test_dont_care_columns_are_ignored() {
    let registry = common::registry(Protocol::Ddr5);
    let layout = common::layout(Protocol::Ddr5);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();

    let noisy = row(&layout, &join(&[ddr5::refab(), vec![("CA5", 1), ("CA12", 1), ("CA13", 1)]]));
    let expected = index_of(&registry, CommandId::Ddr5(Ddr5Command::RefAb));
    assert_eq!(matcher.classify(&noisy).unwrap(), Frame::Single(expected));
}

#[test]
fn test_chip_select_high_is_deselect() {
    let registry = common::registry(Protocol::Ddr5);
    let layout = common::layout(Protocol::Ddr5);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();

    let deselected = row(&layout, &join(&[ddr5::refab(), vec![("CS", 1)]]));
    assert_eq!(matcher.classify(&deselected).unwrap(), Frame::Deselected);
}

#[test]
fn test_unassigned_first_cycle_encoding_is_unknown() {
    let registry = common::registry(Protocol::Ddr5);
    let layout = common::layout(Protocol::Ddr5);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();

    // CA1=0 with CA0=1 CA2..CA4=010 has no two-cycle template.
    let unknown = row(&layout, &[("CA0", 1), ("CA1", 0), ("CA2", 0), ("CA3", 1), ("CA4", 0)]);
    assert_eq!(matcher.classify(&unknown).unwrap(), Frame::Unknown);
}

#[test]
fn test_ddr4_undefined_encoding_is_unknown() {
    let registry = common::registry(Protocol::Ddr4);
    let layout = common::layout(Protocol::Ddr4);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();

    let undefined = row(&layout, &[("ACT_n", 1), ("RAS_n", 1), ("CAS_n", 1), ("WE_n", 0)]);
    assert_eq!(matcher.classify(&undefined).unwrap(), Frame::Unknown);

    let refresh = row(&layout, &[("ACT_n", 1), ("RAS_n", 0), ("CAS_n", 0), ("WE_n", 1)]);
    let expected = index_of(&registry, CommandId::Ddr4(Ddr4Command::Ref));
    assert_eq!(matcher.classify(&refresh).unwrap(), Frame::Single(expected));
}

#[test]
fn test_write_first_half_has_two_candidates() {
    let registry = common::registry(Protocol::Ddr5);
    let layout = common::layout(Protocol::Ddr5);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();

    let first = row(&layout, &ddr5::column_first(false, 0, 0));
    let wr = index_of(&registry, CommandId::Ddr5(Ddr5Command::Wr));
    let wra = index_of(&registry, CommandId::Ddr5(Ddr5Command::Wra));
    assert_eq!(matcher.classify(&first).unwrap(), Frame::FirstCycle(vec![wr, wra]));

    let second = row(&layout, &ddr5::column_second(true, 0));
    assert_eq!(matcher.second_cycle_matches(&[wr, wra], &second), vec![wra]);
}

#[test]
fn test_parallel_matching_agrees() {
    let registry = common::registry(Protocol::Ddr5);
    let layout = common::layout(Protocol::Ddr5);
    let sequential = FrameMatcher::new(&registry, &layout).unwrap();
    let parallel = FrameMatcher::new(&registry, &layout)
        .unwrap()
        .with_parallel(true);

    for bits in (0..1u64 << 12).step_by(7) {
        // Bits 1..=12 are CS and CA0..CA10.
        let sample = SampleRow::new(0.0, 0, bits << 1);
        assert_eq!(
            sequential.classify(&sample).unwrap(),
            parallel.classify(&sample).unwrap()
        );
    }
}

// ══════════════════════════════════════════════════════════
// 2. Field extraction
// ══════════════════════════════════════════════════════════

#[test]
fn test_presb_bank_field() {
    let registry = common::registry(Protocol::Ddr5);
    let layout = common::layout(Protocol::Ddr5);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();

    let presb = row(
        &layout,
        &[("CA0", 1), ("CA1", 1), ("CA2", 0), ("CA3", 1), ("CA4", 0), ("CA10", 1), ("CA7", 1)],
    );
    let Frame::Single(index) = matcher.classify(&presb).unwrap() else {
        panic!("PREsb must match a single-cycle template");
    };
    assert_eq!(matcher.id(index), Some(CommandId::Ddr5(Ddr5Command::PreSb)));
    let fields = matcher.extract(index, &presb, None);
    assert_eq!(fields.bank(), Some(FieldValue::new(0b10, 2)));
    assert_eq!(fields.get(AddressField::BankGroup), None);
}

#[test]
fn test_ddr4_act_row_uses_command_pins() {
    let registry = common::registry(Protocol::Ddr4);
    let layout = common::layout(Protocol::Ddr4);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();

    let act = row(&layout, &[("ACT_n", 0), ("RAS_n", 1), ("A0", 1), ("BG0", 1), ("BA1", 1)]);
    let Frame::Single(index) = matcher.classify(&act).unwrap() else {
        panic!("ACT must match a single-cycle template");
    };
    let fields = matcher.extract(index, &act, None);
    assert_eq!(fields.row(), Some(FieldValue::new((1 << 16) | 1, 18)));
    assert_eq!(fields.bankgroup(), Some(FieldValue::new(0b01, 2)));
    assert_eq!(fields.bank(), Some(FieldValue::new(0b10, 2)));
}

// ══════════════════════════════════════════════════════════
// 3. Errors
// ══════════════════════════════════════════════════════════

#[test]
fn test_missing_registry_column() {
    let registry = common::registry(Protocol::Ddr5);
    let columns: Vec<&str> = common::DDR5_COLUMNS
        .iter()
        .copied()
        .filter(|c| *c != "CA12")
        .collect();
    let layout = SignalLayout::new(columns).unwrap();
    assert_eq!(
        FrameMatcher::new(&registry, &layout).unwrap_err(),
        LayoutError::MissingColumn("CA12".into())
    );
}

#[test]
fn test_unvalidated_collision_is_ambiguous() {
    let cycle = CycleTemplate::new(&[("CS", 0), ("CA0", 1), ("CA1", 1)]);
    let registry = Registry::new_unchecked(
        Protocol::Ddr5,
        vec![
            CommandTemplate::single(CommandId::Ddr5(Ddr5Command::Pde), cycle.clone()),
            CommandTemplate::single(CommandId::Ddr5(Ddr5Command::Sre), cycle),
        ],
    );
    let layout = common::layout(Protocol::Ddr5);
    let matcher = FrameMatcher::new(&registry, &layout).unwrap();
    let sample = SampleRow::from_signals(&layout, 0.0, 42, &[("CA0", 1), ("CA1", 1)]).unwrap();

    assert_eq!(
        matcher.classify(&sample).unwrap_err(),
        DecodeError::AmbiguousMatch {
            cycle: 42,
            candidates: CommandList(vec![
                CommandId::Ddr5(Ddr5Command::Pde),
                CommandId::Ddr5(Ddr5Command::Sre),
            ]),
            position: MatchPosition::Single,
        }
    );
}
