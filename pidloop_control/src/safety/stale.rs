//! Stalled-sensor detection.
//!
//! Tracks a "last good" baseline `(time, value)`. While the process is away
//! from setpoint, a reading must move at least `min_rate_of_change` from the
//! baseline; a slower reading is tolerated until the baseline is older than
//! `max_stale_ms`.

use pidloop_common::safety::{MeasurementFault, StaleDetection};
use pidloop_common::time::{Millis, elapsed_ms, ms_to_secs};

/// Stale detector state.
#[derive(Debug, Clone, Default)]
pub struct StaleDetector {
    config: StaleDetection,
    baseline: Option<(Millis, f64)>,
}

impl StaleDetector {
    pub fn new(config: StaleDetection) -> Self {
        Self {
            config,
            baseline: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &StaleDetection {
        &self.config
    }

    /// Replace the configuration. The baseline is kept.
    pub fn configure(&mut self, config: StaleDetection) -> bool {
        if !config.is_valid() {
            return false;
        }
        self.config = config;
        true
    }

    #[inline]
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Current baseline, if one has been recorded.
    #[inline]
    pub fn baseline(&self) -> Option<(Millis, f64)> {
        self.baseline
    }

    /// Forget the baseline; the next evaluated reading starts a new one.
    #[inline]
    pub fn reset_baseline(&mut self) {
        self.baseline = None;
    }

    /// Evaluate one (already finite) measurement.
    pub fn check(&mut self, setpoint: f64, value: f64, now: Millis) -> Result<(), MeasurementFault> {
        if !self.config.enabled {
            return Ok(());
        }

        // Settled at setpoint: never stale, keep the baseline fresh.
        if (setpoint - value).abs() <= self.config.deadband {
            self.baseline = Some((now, value));
            return Ok(());
        }

        let Some((since, last_good)) = self.baseline else {
            self.baseline = Some((now, value));
            return Ok(());
        };

        let stalled_ms = elapsed_ms(now, since);
        if stalled_ms == 0 {
            return Ok(());
        }

        let rate = (value - last_good).abs() / ms_to_secs(stalled_ms);
        if rate >= self.config.min_rate_of_change {
            self.baseline = Some((now, value));
            Ok(())
        } else if stalled_ms > self.config.max_stale_ms {
            Err(MeasurementFault::Stale {
                value,
                rate,
                stalled_ms,
            })
        } else {
            Ok(())
        }
    }
}
