//! # Two-Cycle Resolver Tests
//!
//! Look-ahead in 1N and 2N mode, row field concatenation across halves, and every way
//! resolution can fail.

use dramscope_core::common::field::FieldValue;
use dramscope_core::common::{DecodeError, MatchPosition};
use dramscope_core::decode::{Frame, FrameMatcher, Resolution, TwoCycleResolver};
use dramscope_core::protocol::{
    AddressingMode, CommandId, CommandTemplate, CycleTemplate, Ddr5Command, Protocol,
};
use dramscope_core::Registry;
use pretty_assertions::assert_eq;

use crate::common::{self, TraceBuilder, ddr5, time};

fn candidates(matcher: &FrameMatcher<'_>, builder: &TraceBuilder, index: usize) -> Vec<usize> {
    match matcher.classify(&builder.rows()[index]).unwrap() {
        Frame::FirstCycle(candidates) => candidates,
        other => panic!("row {index} is not a first half: {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════
// 1. Resolution
// ══════════════════════════════════════════════════════════

#[test]
fn test_act_two_n_concatenates_row() {
    let registry = common::registry(Protocol::Ddr5);
    let builder = TraceBuilder::ddr5()
        .row(10, &ddr5::act_first(0b000, 0b10, 0b1011))
        .idle(11)
        .row(12, &ddr5::act_second(0b1000_0000_0001));
    let matcher = FrameMatcher::new(&registry, builder.layout()).unwrap();
    let first = candidates(&matcher, &builder, 0);

    let resolver = TwoCycleResolver::new(AddressingMode::TwoN);
    assert_eq!(resolver.offset(), 2);
    let Resolution::Resolved {
        command,
        second_row,
    } = resolver.resolve(&matcher, builder.rows(), 0, &first).unwrap()
    else {
        panic!("ACT must resolve");
    };

    assert_eq!(second_row, 2);
    assert_eq!(command.id, CommandId::Ddr5(Ddr5Command::Act));
    assert_eq!(command.cycle, 10);
    assert_eq!(command.timestamp, time(10));
    assert!(command.two_cycle);
    assert_eq!(command.fields.bank(), Some(FieldValue::new(0b10, 2)));
    assert_eq!(command.fields.bankgroup(), Some(FieldValue::new(0, 3)));
    assert_eq!(
        command.fields.row(),
        Some(FieldValue::new(0b1000_0000_0001_1011, 16))
    );
    assert_eq!(command.fields.row().unwrap().to_string(), "1000000000011011");
}

#[test]
fn test_one_n_reads_next_cycle() {
    let registry = common::registry(Protocol::Ddr5);
    let builder = TraceBuilder::ddr5()
        .row(4, &ddr5::column_first(true, 0b011, 0b01))
        .row(5, &ddr5::column_second(false, 0b1_0000_0001));
    let matcher = FrameMatcher::new(&registry, builder.layout()).unwrap();
    let first = candidates(&matcher, &builder, 0);

    let resolution = TwoCycleResolver::new(AddressingMode::OneN)
        .resolve(&matcher, builder.rows(), 0, &first)
        .unwrap();
    let Resolution::Resolved { command, .. } = resolution else {
        panic!("RD must resolve");
    };
    assert_eq!(command.id, CommandId::Ddr5(Ddr5Command::Rd));
    assert_eq!(command.fields.column(), Some(FieldValue::new(0b1_0000_0001, 9)));
    assert_eq!(command.fields.bankgroup(), Some(FieldValue::new(0b011, 3)));
}

#[test]
fn test_ca10_selects_auto_precharge() {
    let registry = common::registry(Protocol::Ddr5);
    let builder = TraceBuilder::ddr5()
        .row(0, &ddr5::column_first(false, 0, 0))
        .idle(1)
        .row(2, &ddr5::column_second(true, 0));
    let matcher = FrameMatcher::new(&registry, builder.layout()).unwrap();
    let first = candidates(&matcher, &builder, 0);

    let resolution = TwoCycleResolver::new(AddressingMode::TwoN)
        .resolve(&matcher, builder.rows(), 0, &first)
        .unwrap();
    assert!(matches!(
        resolution,
        Resolution::Resolved { command, .. } if command.id == CommandId::Ddr5(Ddr5Command::Wra)
    ));
}

// ══════════════════════════════════════════════════════════
// 2. Failures
// ══════════════════════════════════════════════════════════

#[test]
fn test_second_cycle_beyond_trace() {
    let registry = common::registry(Protocol::Ddr5);
    let builder = TraceBuilder::ddr5()
        .idle(0)
        .row(1, &ddr5::act_first(0, 0, 0));
    let matcher = FrameMatcher::new(&registry, builder.layout()).unwrap();
    let first = candidates(&matcher, &builder, 1);

    assert_eq!(
        TwoCycleResolver::new(AddressingMode::TwoN)
            .resolve(&matcher, builder.rows(), 1, &first)
            .unwrap(),
        Resolution::MissingSecondCycle {
            expected_cycle: 3,
            last_row: 1,
        }
    );
}

#[test]
fn test_gap_at_expected_cycle() {
    let registry = common::registry(Protocol::Ddr5);
    let builder = TraceBuilder::ddr5()
        .row(10, &ddr5::act_first(0, 0, 0))
        .idle(11)
        .idle(13);
    let matcher = FrameMatcher::new(&registry, builder.layout()).unwrap();
    let first = candidates(&matcher, &builder, 0);

    assert_eq!(
        TwoCycleResolver::new(AddressingMode::TwoN)
            .resolve(&matcher, builder.rows(), 0, &first)
            .unwrap(),
        Resolution::MissingSecondCycle {
            expected_cycle: 12,
            last_row: 2,
        }
    );
}

#[test]
fn test_selected_second_cycle_does_not_match() {
    let registry = common::registry(Protocol::Ddr5);
    // The expected row carries chip-select low, so no second half can match it.
    let builder = TraceBuilder::ddr5()
        .row(0, &ddr5::column_first(false, 0, 0))
        .idle(1)
        .row(2, &ddr5::nop());
    let matcher = FrameMatcher::new(&registry, builder.layout()).unwrap();
    let first = candidates(&matcher, &builder, 0);

    assert_eq!(
        TwoCycleResolver::new(AddressingMode::TwoN)
            .resolve(&matcher, builder.rows(), 0, &first)
            .unwrap(),
        Resolution::NoSecondCycleMatch {
            second_cycle: 2,
            second_row: 2,
        }
    );
}

#[test]
fn test_two_matching_second_halves_are_fatal() {
    let first = CycleTemplate::new(&[("CS", 0), ("CA0", 1), ("CA1", 0)]);
    let second = CycleTemplate::new(&[("CS", 1)]);
    let registry = Registry::new_unchecked(
        Protocol::Ddr5,
        vec![
            CommandTemplate::two_cycle(
                CommandId::Ddr5(Ddr5Command::Mrr),
                first.clone(),
                second.clone(),
            ),
            CommandTemplate::two_cycle(CommandId::Ddr5(Ddr5Command::Mrw), first, second),
        ],
    );
    let builder = TraceBuilder::ddr5()
        .row(0, &[("CA0", 1), ("CA1", 0)])
        .idle(1);
    let matcher = FrameMatcher::new(&registry, builder.layout()).unwrap();
    let first = candidates(&matcher, &builder, 0);

    let err = TwoCycleResolver::new(AddressingMode::OneN)
        .resolve(&matcher, builder.rows(), 0, &first)
        .unwrap_err();
    assert!(matches!(
        err,
        DecodeError::AmbiguousMatch {
            cycle: 1,
            position: MatchPosition::SecondCycle,
            ..
        }
    ));
}
