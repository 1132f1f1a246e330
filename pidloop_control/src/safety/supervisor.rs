//! Safety supervisor: ordered measurement validation and the fault latch.
//!
//! Check order is fixed: finite → range (if enabled) → stale (if enabled).
//! The first failing check wins and is recorded in the latch. The latch is
//! only released by [`SafetySupervisor::clear`].

use pidloop_common::control::Limits;
use pidloop_common::safety::{
    FaultFlags, MeasurementFault, RangeValidation, SafetyConfig, StaleDetection,
};
use pidloop_common::time::Millis;

use super::stale::StaleDetector;
use super::validate::{check_finite, check_range};

/// Measurement supervisor with fault latch.
#[derive(Debug, Clone, Default)]
pub struct SafetySupervisor {
    range: RangeValidation,
    stale: StaleDetector,
    latched: FaultFlags,
    last_fault: Option<MeasurementFault>,
}

impl SafetySupervisor {
    /// Supervisor with the given configuration. Invalid parts of the
    /// configuration fall back to defaults (checks disabled).
    pub fn new(config: SafetyConfig) -> Self {
        let mut supervisor = Self::default();
        supervisor.configure_range(config.range);
        supervisor.stale.configure(config.stale);
        supervisor
    }

    /// Validate one measurement. On rejection the fault is latched.
    pub fn inspect(
        &mut self,
        setpoint: f64,
        measurement: f64,
        now: Millis,
    ) -> Result<(), MeasurementFault> {
        let verdict = check_finite(measurement)
            .and_then(|()| check_range(&self.range, measurement))
            .and_then(|()| self.stale.check(setpoint, measurement, now));

        if let Err(fault) = verdict {
            self.latched |= fault.flag();
            self.last_fault = Some(fault);
        }
        verdict
    }

    /// Release the latch and forget the stale baseline.
    pub fn clear(&mut self) {
        self.latched = FaultFlags::empty();
        self.last_fault = None;
        self.stale.reset_baseline();
    }

    /// Forget the stale baseline (called on enable).
    #[inline]
    pub fn rearm(&mut self) {
        self.stale.reset_baseline();
    }

    #[inline]
    pub fn is_latched(&self) -> bool {
        !self.latched.is_empty()
    }

    #[inline]
    pub fn latched(&self) -> FaultFlags {
        self.latched
    }

    /// Most recent rejection, while latched.
    #[inline]
    pub fn last_fault(&self) -> Option<MeasurementFault> {
        self.last_fault
    }

    // ── Configuration ───────────────────────────────────────────

    /// Enable range validation over `[min, max]`.
    pub fn set_range(&mut self, min: f64, max: f64) -> bool {
        self.configure_range(RangeValidation::enabled(min, max))
    }

    pub fn disable_range(&mut self) {
        self.range.enabled = false;
    }

    fn configure_range(&mut self, range: RangeValidation) -> bool {
        // Bounds of a disabled range are not checked.
        if range.enabled && Limits::new(range.min, range.max).is_none() {
            return false;
        }
        self.range = range;
        true
    }

    /// Enable stale detection with the given rate and tolerance.
    pub fn set_stale(&mut self, min_rate_of_change: f64, max_stale_ms: u32) -> bool {
        let config = StaleDetection {
            enabled: true,
            min_rate_of_change,
            max_stale_ms,
            deadband: self.stale.config().deadband,
        };
        self.stale.configure(config)
    }

    /// Set the band around setpoint considered settled.
    pub fn set_stale_deadband(&mut self, deadband: f64) -> bool {
        let config = StaleDetection {
            deadband,
            ..*self.stale.config()
        };
        self.stale.configure(config)
    }

    pub fn disable_stale(&mut self) {
        self.stale.set_enabled(false);
    }

    #[inline]
    pub fn range(&self) -> &RangeValidation {
        &self.range
    }

    #[inline]
    pub fn stale(&self) -> &StaleDetector {
        &self.stale
    }

    pub fn config(&self) -> SafetyConfig {
        SafetyConfig {
            range: self.range,
            stale: *self.stale.config(),
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
