//! Per-trace decode pipeline.
//!
//! Rows flow strictly in cycle order through:
//! 1. **Frame matcher:** deselect, unknown, single-cycle command, or two-cycle first half.
//! 2. **Two-cycle resolver:** looks ahead for the second half and merges fields.
//! 3. **Deduplicator:** drops oversampling repeats of single-cycle commands.
//! 4. **Bank state machine:** validates legality and counts the command.
//!
//! Recoverable conditions go into the [`DecodeReport`]; the first fatal condition aborts the
//! trace and is returned as a [`DecodeError`].

use tracing::{debug, warn};

use crate::analysis::bank::{BankState, BankStateMachine};
use crate::analysis::stats::CommandStats;
use crate::common::error::DecodeError;
use crate::common::signal::{SampleRow, SignalLayout};
use crate::config::{Config, DecoderConfig, DimmConfig};
use crate::decode::command::DecodedCommand;
use crate::decode::dedup::Deduplicator;
use crate::decode::matcher::{Frame, FrameMatcher};
use crate::decode::report::{DecodeFailure, DecodeReport, UnresolvedReason};
use crate::decode::resolver::{Resolution, TwoCycleResolver};
use crate::protocol::{CommandList, Registry};

/// Result of decoding one trace.
#[derive(Debug, Clone)]
pub struct DecodedTrace {
    /// Decoded commands in increasing cycle order.
    pub commands: Vec<DecodedCommand>,
    /// Counters and recoverable failures.
    pub report: DecodeReport,
    /// Occurrence counts and ACT frequencies.
    pub stats: CommandStats,
    /// Final bank states.
    pub banks: Vec<BankState>,
}

/// Decodes traces against one registry and configuration.
///
/// The decoder holds no per-trace state; every call to [`decode`](Self::decode) starts with idle
/// banks and empty counters, so one decoder can be shared by many workers.
#[derive(Debug, Clone)]
pub struct TraceDecoder<'r> {
    registry: &'r Registry,
    decoder: DecoderConfig,
    dimm: DimmConfig,
}

impl<'r> TraceDecoder<'r> {
    /// Creates a decoder.
    ///
    /// # Errors
    ///
    /// * [`DecodeError::ProtocolMismatch`] if `registry` is not for the configured protocol.
    /// * [`DecodeError::Config`] if the DIMM configuration is invalid.
    pub fn new(registry: &'r Registry, config: &Config) -> Result<Self, DecodeError> {
        if registry.protocol() != config.decoder.protocol {
            return Err(DecodeError::ProtocolMismatch {
                registry: registry.protocol(),
                configured: config.decoder.protocol,
            });
        }
        config.dimm.validate()?;
        Ok(Self {
            registry,
            decoder: config.decoder.clone(),
            dimm: config.dimm.clone(),
        })
    }

    /// Registry used for matching.
    pub const fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Decodes one trace.
    ///
    /// # Arguments
    ///
    /// * `layout` - Column layout of `rows`.
    /// * `rows` - The complete trace, in strictly increasing cycle order.
    ///
    /// # Errors
    ///
    /// Returns the first fatal condition: unordered rows, a layout missing registry columns, an
    /// ambiguous match, or a protocol legality violation.
    pub fn decode(
        &self,
        layout: &SignalLayout,
        rows: &[SampleRow],
    ) -> Result<DecodedTrace, DecodeError> {
        check_cycle_order(rows)?;
        let matcher =
            FrameMatcher::new(self.registry, layout)?.with_parallel(self.decoder.parallel_match);
        let resolver = TwoCycleResolver::new(self.decoder.addressing);

        let mut run = Run {
            commands: Vec::new(),
            report: DecodeReport::default(),
            dedup: Deduplicator::new(),
            banks: BankStateMachine::new(&self.dimm)
                .with_stats(CommandStats::for_registry(self.registry)),
        };

        for (index, row) in rows.iter().enumerate() {
            run.report.rows += 1;
            match matcher.classify(row)? {
                Frame::Deselected => run.report.deselected += 1,
                Frame::Unknown => self.unknown(&mut run.report, index, row),
                Frame::Single(template) => {
                    let Some(id) = matcher.id(template) else {
                        self.unknown(&mut run.report, index, row);
                        continue;
                    };
                    run.emit(DecodedCommand {
                        timestamp: row.timestamp,
                        id,
                        fields: matcher.extract(template, row, None),
                        cycle: row.cycle,
                        two_cycle: false,
                    })?;
                }
                Frame::FirstCycle(candidates) => {
                    match resolver.resolve(&matcher, rows, index, &candidates)? {
                        Resolution::Resolved { command, .. } => run.emit(command)?,
                        Resolution::MissingSecondCycle {
                            expected_cycle,
                            last_row,
                        } => run.unresolved(
                            &matcher,
                            index,
                            row,
                            last_row,
                            &candidates,
                            UnresolvedReason::MissingSecondCycle { expected_cycle },
                        ),
                        Resolution::NoSecondCycleMatch {
                            second_cycle,
                            second_row,
                        } => run.unresolved(
                            &matcher,
                            index,
                            row,
                            second_row,
                            &candidates,
                            UnresolvedReason::NoSecondCycleMatch { second_cycle },
                        ),
                    }
                }
            }
        }

        run.report.suppressed = run.dedup.suppressed();
        debug!(report = %run.report, commands = run.commands.len(), "trace decoded");
        Ok(DecodedTrace {
            commands: run.commands,
            report: run.report,
            banks: run.banks.banks().to_vec(),
            stats: run.banks.into_stats(),
        })
    }

    fn unknown(&self, report: &mut DecodeReport, index: usize, row: &SampleRow) {
        debug!(row = index, cycle = row.cycle, "unknown command");
        report.unknown_command(self.decoder.report_unknown.then_some(
            DecodeFailure::UnknownCommand {
                row: index,
                cycle: row.cycle,
                timestamp: row.timestamp,
            },
        ));
    }
}

struct Run {
    commands: Vec<DecodedCommand>,
    report: DecodeReport,
    dedup: Deduplicator,
    banks: BankStateMachine,
}

impl Run {
    fn emit(&mut self, command: DecodedCommand) -> Result<(), DecodeError> {
        if !self.dedup.admit(&command) {
            debug!(cycle = command.cycle, cmd = %command.id, "oversampling repeat suppressed");
            return Ok(());
        }
        self.banks.apply(&command)?;
        debug!(%command, "decoded");
        self.commands.push(command);
        Ok(())
    }

    fn unresolved(
        &mut self,
        matcher: &FrameMatcher<'_>,
        first_row: usize,
        row: &SampleRow,
        last_row: usize,
        candidates: &[usize],
        reason: UnresolvedReason,
    ) {
        let candidates = CommandList(candidates.iter().filter_map(|&i| matcher.id(i)).collect());
        warn!(
            row = first_row,
            cycle = row.cycle,
            candidates = %candidates,
            %reason,
            "dropping unresolved two-cycle command"
        );
        self.report
            .unresolved_two_cycle(DecodeFailure::UnresolvedTwoCycle {
                first_row,
                last_row,
                cycle: row.cycle,
                timestamp: row.timestamp,
                candidates,
                reason,
            });
    }
}

fn check_cycle_order(rows: &[SampleRow]) -> Result<(), DecodeError> {
    for (index, pair) in rows.windows(2).enumerate() {
        if pair[1].cycle <= pair[0].cycle {
            return Err(DecodeError::CycleOrder {
                index: index + 1,
                cycle: pair[1].cycle,
                previous: pair[0].cycle,
            });
        }
    }
    Ok(())
}
