//! Clocks
//!
//! Time source for the session driver. Delays are expressed as timer
//! channels so they can be waited on together with control messages.

use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// A channel that fires once after `delay`
    fn timer(&self, delay: Duration) -> Receiver<Instant>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn timer(&self, delay: Duration) -> Receiver<Instant> {
        channel::after(delay)
    }
}

/// Clock that only moves when told to
///
/// Timers complete immediately and advance the clock by their delay, so
/// reconnect schedules run instantly while the elapsed time stays exact.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    /// Total modeled time since creation
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn timer(&self, delay: Duration) -> Receiver<Instant> {
        self.advance(delay);
        channel::after(Duration::ZERO)
    }
}
