//! Oversampling deduplicator.
//!
//! The capture samples far faster than the command bus toggles, so one single-cycle command can
//! show up on consecutive clock edges. A single-cycle command is suppressed when the last
//! retained command is a single-cycle command with the same identifier and fields, one cycle
//! earlier. Two-cycle commands are always retained. Timestamps are ignored.

use crate::decode::command::DecodedCommand;

/// Streaming deduplicator.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    last: Option<DecodedCommand>,
    suppressed: usize,
}

impl Deduplicator {
    /// Creates an empty deduplicator.
    pub const fn new() -> Self {
        Self {
            last: None,
            suppressed: 0,
        }
    }

    /// Returns `true` if `command` is retained, `false` if it is an oversampling repeat.
    pub fn admit(&mut self, command: &DecodedCommand) -> bool {
        if let Some(last) = &self.last {
            let repeat = !command.two_cycle
                && !last.two_cycle
                && command.cycle == last.cycle + 1
                && command.same_command(last);
            if repeat {
                self.suppressed += 1;
                return false;
            }
        }
        self.last = Some(*command);
        true
    }

    /// Number of suppressed commands so far.
    pub const fn suppressed(&self) -> usize {
        self.suppressed
    }
}

/// Deduplicates a whole command stream.
pub fn deduplicate<I>(commands: I) -> Vec<DecodedCommand>
where
    I: IntoIterator<Item = DecodedCommand>,
{
    let mut dedup = Deduplicator::new();
    commands
        .into_iter()
        .filter(|command| dedup.admit(command))
        .collect()
}
