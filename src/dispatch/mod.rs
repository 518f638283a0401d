//! Best-effort command dispatch.
//!
//! # Delivery guarantee
//!
//! A `Dispatcher` makes exactly one delivery attempt per call:
//! - the call returns within the dispatcher's configured timeout
//! - failures (timeout, refused connection, bad response) come back as `Err`
//!   and are never retried at this layer
//! - nothing is queued; an instruction that was not delivered is gone
//!
//! Callers are expected to discard the error. The next frame's instruction
//! corrects for a dropped one.

mod http;

pub use http::{HttpDispatcher, HttpDispatcherConfig};

use anyhow::{anyhow, Result};

use crate::instruction::{Instruction, WireFormat};

pub trait Dispatcher {
    /// Attempt delivery once.
    fn dispatch(&mut self, instruction: Instruction) -> Result<()>;
}

impl<C: Dispatcher + ?Sized> Dispatcher for Box<C> {
    fn dispatch(&mut self, instruction: Instruction) -> Result<()> {
        (**self).dispatch(instruction)
    }
}

/// Delivery counters kept by the control loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub sent: u64,
    pub dropped: u64,
}

impl DispatchStats {
    pub fn record(&mut self, outcome: &Result<()>) {
        match outcome {
            Ok(()) => self.sent += 1,
            Err(_) => self.dropped += 1,
        }
    }
}

/// Dry-run dispatcher: logs instead of sending.
#[derive(Debug, Default)]
pub struct NullDispatcher {
    wire_format: WireFormat,
}

impl NullDispatcher {
    pub fn new(wire_format: WireFormat) -> Self {
        Self { wire_format }
    }
}

impl Dispatcher for NullDispatcher {
    fn dispatch(&mut self, instruction: Instruction) -> Result<()> {
        log::info!("dry-run: {}", instruction.wire(self.wire_format));
        Ok(())
    }
}

/// In-memory dispatcher that records every attempt.
///
/// While `offline` is set every attempt is recorded and then fails, as a
/// dropped network send would.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    attempts: Vec<Instruction>,
    offline: bool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self {
            attempts: Vec::new(),
            offline: true,
        }
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn attempts(&self) -> &[Instruction] {
        &self.attempts
    }

    pub fn take(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.attempts)
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch(&mut self, instruction: Instruction) -> Result<()> {
        self.attempts.push(instruction);
        if self.offline {
            Err(anyhow!("vehicle unreachable"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_count_outcomes() {
        let mut stats = DispatchStats::default();
        stats.record(&Ok(()));
        stats.record(&Err(anyhow!("timeout")));
        stats.record(&Ok(()));
        assert_eq!(stats, DispatchStats { sent: 2, dropped: 1 });
    }

    #[test]
    fn recording_dispatcher_records_failed_attempts_too() {
        let mut dispatcher = RecordingDispatcher::offline();
        assert!(dispatcher.dispatch(Instruction::Stop).is_err());
        dispatcher.set_offline(false);
        assert!(dispatcher.dispatch(Instruction::TurnLeft).is_ok());
        assert_eq!(dispatcher.take(), vec![Instruction::Stop, Instruction::TurnLeft]);
        assert!(dispatcher.attempts().is_empty());
    }
}
