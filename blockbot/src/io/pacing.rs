//! Wall-clock pacing between executed blocks.
//!
//! The engine stays pure; this observer adds the human-visible delay after
//! each block and optionally streams trace lines as they happen.

use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::core::engine::{ExecutionObserver, TraceEvent};
use crate::core::types::RobotState;
use crate::program::Command;

/// Sleeps `delay` after every executed block and echoes trace lines to `out`.
pub struct PacedObserver<W: Write> {
    delay: Duration,
    out: Option<W>,
}

impl<W: Write> PacedObserver<W> {
    pub fn new(delay: Duration, out: Option<W>) -> Self {
        Self { delay, out }
    }
}

impl<W: Write> ExecutionObserver for PacedObserver<W> {
    fn on_event(&mut self, event: &TraceEvent) {
        if let Some(out) = self.out.as_mut() {
            // Losing a progress line must not abort the run.
            let _ = writeln!(out, "> {event}");
        }
    }

    fn after_command(&mut self, _command: &Command, _state: &RobotState) {
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}
