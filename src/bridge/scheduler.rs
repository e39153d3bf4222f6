//! Fixed-rate tick loop
//!
//! Ticks are paced against absolute deadlines (`deadline += period`), so time
//! spent inside a tick is subtracted from the following sleep and never
//! accumulates. When a tick overruns by more than a whole period the deadline
//! is moved to "now" instead of firing a burst of catch-up ticks.
//!
//! The shutdown flag is only checked between ticks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    /// Ticks that finished after their deadline.
    pub overruns: u64,
}

pub struct FrameScheduler {
    period: Duration,
    shutdown: Arc<AtomicBool>,
    max_ticks: Option<u64>,
}

impl FrameScheduler {
    pub fn new(period: Duration, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            period,
            shutdown,
            max_ticks: None,
        }
    }

    /// Stop on its own after `max_ticks` ticks.
    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Run `tick` once per period until shutdown is requested, `max_ticks` is
    /// reached, or `tick` returns an error.
    ///
    /// `tick` receives the tick index and the instant the tick started.
    pub fn run<E, F>(&self, mut tick: F) -> Result<RunSummary, E>
    where
        F: FnMut(u64, Instant) -> Result<(), E>,
    {
        let mut summary = RunSummary::default();
        let mut deadline = Instant::now();

        while !self.shutdown.load(Ordering::Acquire) {
            if self.max_ticks.is_some_and(|max| summary.ticks >= max) {
                break;
            }

            tick(summary.ticks, Instant::now())?;
            summary.ticks += 1;
            deadline += self.period;

            let now = Instant::now();
            if now < deadline {
                spin_sleep::sleep(deadline - now);
            } else {
                summary.overruns += 1;
                let late = now - deadline;
                trace!("Tick {} overran by {:?}", summary.ticks - 1, late);
                if late > self.period {
                    deadline = now;
                }
            }
        }

        Ok(summary)
    }
}
