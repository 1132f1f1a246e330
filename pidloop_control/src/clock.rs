//! Time sources for the control loop.
//!
//! The controller itself never reads a clock: every entry point takes `now`
//! explicitly. The cycle runner obtains `now` from a [`Clock`].

use std::cell::Cell;
use std::time::Instant;

use pidloop_common::time::Millis;

/// Monotonic, non-decreasing 32-bit millisecond counter (wraps).
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

impl<T: Clock + ?Sized> Clock for &T {
    #[inline]
    fn now_ms(&self) -> Millis {
        (**self).now_ms()
    }
}

/// Wall clock based on [`Instant`], truncated to 32 bits.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
    start: Millis,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Clock whose first reading is `start`. Starting close to `u32::MAX`
    /// exercises counter wrap early.
    pub fn starting_at(start: Millis) -> Self {
        Self {
            origin: Instant::now(),
            start,
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ms(&self) -> Millis {
        // Truncation to 32 bits is the intended wrap.
        let elapsed = self.origin.elapsed().as_millis() as u32;
        self.start.wrapping_add(elapsed)
    }
}

/// Manually advanced clock for tests and deterministic simulation.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millis>,
}

impl ManualClock {
    pub const fn new(start: Millis) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn set(&self, now: Millis) {
        self.now.set(now);
    }

    /// Advance by `ms`, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_ms(&self) -> Millis {
        self.now.get()
    }
}
