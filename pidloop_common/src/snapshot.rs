//! Read-only view of a controller, captured for telemetry and status display.

use crate::control::{Gains, Limits, Polarity, Terms};
use crate::safety::FaultFlags;
use crate::state::LoopState;

/// Point-in-time copy of everything the tuning channel reads back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSnapshot {
    pub state: LoopState,
    pub gains: Gains,
    pub setpoint: f64,
    pub polarity: Polarity,
    /// Last actuation command.
    pub output: f64,
    /// `setpoint - measurement` of the last completed sample.
    pub error: f64,
    pub terms: Terms,
    /// Integral accumulator (before polarity).
    pub integral: f64,
    pub sample_period_ms: u32,
    pub output_limits: Limits,
    pub integral_limits: Limits,
    /// Fault recorded by the latch, empty when not faulted.
    pub fault: FaultFlags,
}

impl ControllerSnapshot {
    #[inline]
    pub const fn enabled(&self) -> bool {
        self.state.is_armed()
    }

    #[inline]
    pub const fn faulted(&self) -> bool {
        self.state.is_faulted()
    }
}
