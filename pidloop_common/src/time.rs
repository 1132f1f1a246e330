//! Wrapping millisecond timestamps.
//!
//! Timestamps are a 32-bit millisecond counter that wraps after ~49.7 days.
//! Elapsed time is always computed with modular subtraction, so a single wrap
//! between two samples still yields the correct interval.

/// Millisecond timestamp from a monotonic, wrapping 32-bit counter.
pub type Millis = u32;

/// Milliseconds elapsed from `since` to `now`, tolerant of counter wrap.
#[inline]
pub const fn elapsed_ms(now: Millis, since: Millis) -> u32 {
    now.wrapping_sub(since)
}

/// Convert a millisecond interval to seconds.
#[inline]
pub fn ms_to_secs(ms: u32) -> f64 {
    f64::from(ms) / 1000.0
}
