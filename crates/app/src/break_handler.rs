//! Break handlers — [`BreakGate`] policies shipped with the runner.

use crate::config::BreakConfig;
use crate::ports::BreakGate;

/// A gate that is never active.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBreaks;

impl BreakGate for NoBreaks {
    fn is_active(&self) -> bool {
        false
    }

    fn tick(&mut self) {}

    fn configure(&mut self, _config: &BreakConfig) {}
}

/// Fixed cadence: `interval_ticks` of work, then `duration_ticks` of pause.
#[derive(Debug, Clone)]
pub struct IntervalBreakHandler {
    interval_ticks: u32,
    duration_ticks: u32,
    elapsed: u32,
    remaining: Option<u32>,
}

impl IntervalBreakHandler {
    #[must_use]
    pub fn new(config: &BreakConfig) -> Self {
        Self {
            interval_ticks: config.interval_ticks,
            duration_ticks: config.duration_ticks,
            elapsed: 0,
            remaining: None,
        }
    }

    /// Restart the work interval and cancel any break in progress.
    pub fn reset(&mut self) {
        self.elapsed = 0;
        self.remaining = None;
    }

    /// Ticks of work left before the next break, `0` while on break.
    #[must_use]
    pub fn ticks_to_next_break(&self) -> u32 {
        if self.remaining.is_some() {
            0
        } else {
            self.interval_ticks.saturating_sub(self.elapsed)
        }
    }

    /// Ticks left in the current break, `0` while working.
    #[must_use]
    pub fn ticks_remaining_in_break(&self) -> u32 {
        self.remaining.unwrap_or(0)
    }
}

impl BreakGate for IntervalBreakHandler {
    fn is_active(&self) -> bool {
        self.remaining.is_some()
    }

    fn tick(&mut self) {
        match self.remaining {
            Some(left) if left <= 1 => {
                tracing::info!("break finished");
                self.reset();
            }
            Some(left) => self.remaining = Some(left - 1),
            None => {
                self.elapsed = self.elapsed.saturating_add(1);
                if self.elapsed >= self.interval_ticks && self.duration_ticks > 0 {
                    tracing::info!(duration_ticks = self.duration_ticks, "break started");
                    self.remaining = Some(self.duration_ticks);
                }
            }
        }
    }

    fn configure(&mut self, config: &BreakConfig) {
        self.interval_ticks = config.interval_ticks;
        self.duration_ticks = config.duration_ticks;
        self.reset();
    }
}
