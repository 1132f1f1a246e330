//! PID engine: sample gating, integral clamping, derivative on measurement.
//!
//! Zero Ki disables the integral contribution; zero Kd disables derivative.
//! The engine knows nothing about enable state or faults; the controller
//! decides when to call [`PidEngine::sample`] and when to force neutral.

use pidloop_common::consts::{
    DEFAULT_INTEGRAL_MAX, DEFAULT_INTEGRAL_MIN, DEFAULT_OUTPUT_MAX, DEFAULT_OUTPUT_MIN,
    DEFAULT_SAMPLE_PERIOD_MS, NEUTRAL_OUTPUT,
};
use pidloop_common::control::{Gains, Limits, Polarity, Terms};
use pidloop_common::time::{Millis, elapsed_ms, ms_to_secs};

/// Control law state and parameters.
#[derive(Debug, Clone)]
pub struct PidEngine {
    gains: Gains,
    polarity: Polarity,
    output_limits: Limits,
    integral_limits: Limits,
    sample_period_ms: u32,

    /// Integral accumulator, always inside `integral_limits`.
    integral: f64,
    /// Measurement of the previous completed sample.
    prev_measurement: Option<f64>,
    /// Timestamp of the previous completed sample (or last resync).
    last_sample_ms: Millis,
    last_error: f64,
    terms: Terms,
    output: f64,
}

impl PidEngine {
    /// Engine with zero gains and default limits and period.
    pub fn new(polarity: Polarity) -> Self {
        Self {
            gains: Gains::default(),
            polarity,
            output_limits: Limits {
                min: DEFAULT_OUTPUT_MIN,
                max: DEFAULT_OUTPUT_MAX,
            },
            integral_limits: Limits {
                min: DEFAULT_INTEGRAL_MIN,
                max: DEFAULT_INTEGRAL_MAX,
            },
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
            integral: 0.0,
            prev_measurement: None,
            last_sample_ms: 0,
            last_error: 0.0,
            terms: Terms::ZERO,
            output: NEUTRAL_OUTPUT,
        }
    }

    /// Whether a full sample period has elapsed since the last sample.
    #[inline]
    pub fn sample_due(&self, now: Millis) -> bool {
        elapsed_ms(now, self.last_sample_ms) >= self.sample_period_ms
    }

    /// Run one sample of the control law if the period has elapsed.
    ///
    /// Returns the new clamped output, or `None` when the sample is not yet
    /// due (no state is touched in that case).
    pub fn sample(&mut self, setpoint: f64, measurement: f64, now: Millis) -> Option<f64> {
        let dt_ms = elapsed_ms(now, self.last_sample_ms);
        if dt_ms < self.sample_period_ms {
            return None;
        }
        let dt = ms_to_secs(dt_ms);
        let error = setpoint - measurement;

        // ── P term ──────────────────────────────────────────────
        let p = self.gains.kp * error;

        // ── I term (clamped accumulator) ────────────────────────
        self.integral = self
            .integral_limits
            .clamp(self.integral + self.gains.ki * error * dt);
        let i = self.integral;

        // ── D term (on measurement) ─────────────────────────────
        let d = match self.prev_measurement {
            Some(prev) if dt_ms > 0 => self.gains.kd * (measurement - prev) / dt,
            _ => 0.0,
        };

        let terms = Terms { p, i, d };
        let terms = match self.polarity {
            Polarity::Direct => terms,
            Polarity::Reverse => terms.negated(),
        };

        self.output = self.output_limits.clamp(terms.combine());
        self.terms = terms;
        self.last_error = error;
        self.prev_measurement = Some(measurement);
        self.last_sample_ms = now;

        Some(self.output)
    }

    /// Drive output to neutral (clamped into the output limits) and clear
    /// the per-term diagnostics.
    ///
    /// The integral accumulator is kept; use [`reset`](Self::reset) to
    /// discard it.
    #[inline]
    pub fn force_neutral(&mut self) {
        self.output = self.output_limits.clamp(NEUTRAL_OUTPUT);
        self.terms = Terms::ZERO;
        self.last_error = 0.0;
    }

    /// Discard all dynamic state and restart sample timing at `now`.
    pub fn reset(&mut self, now: Millis) {
        self.integral = self.integral_limits.clamp(0.0);
        self.prev_measurement = None;
        self.last_error = 0.0;
        self.terms = Terms::ZERO;
        self.output = self.output_limits.clamp(NEUTRAL_OUTPUT);
        self.last_sample_ms = now;
    }

    /// Restart sample timing at `now` without touching the accumulator.
    #[inline]
    pub fn resync(&mut self, now: Millis) {
        self.last_sample_ms = now;
    }

    // ── Setters ─────────────────────────────────────────────────

    /// Replace the gains and zero the integral. Rejects non-finite gains.
    pub fn set_gains(&mut self, gains: Gains) -> bool {
        if !gains.is_finite() {
            return false;
        }
        self.gains = gains;
        self.integral = self.integral_limits.clamp(0.0);
        true
    }

    /// Set output bounds and clamp the current output into them.
    pub fn set_output_limits(&mut self, min: f64, max: f64) -> bool {
        let Some(limits) = Limits::new(min, max) else {
            return false;
        };
        self.output_limits = limits;
        self.output = limits.clamp(self.output);
        true
    }

    /// Set integral bounds and clamp the accumulator into them.
    pub fn set_integral_limits(&mut self, min: f64, max: f64) -> bool {
        let Some(limits) = Limits::new(min, max) else {
            return false;
        };
        self.integral_limits = limits;
        self.integral = limits.clamp(self.integral);
        true
    }

    /// Set the sample period. Zero is rejected.
    pub fn set_sample_period(&mut self, period_ms: u32) -> bool {
        if period_ms == 0 {
            return false;
        }
        self.sample_period_ms = period_ms;
        true
    }

    // ── Getters ─────────────────────────────────────────────────

    #[inline]
    pub fn gains(&self) -> Gains {
        self.gains
    }

    #[inline]
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    #[inline]
    pub fn output(&self) -> f64 {
        self.output
    }

    #[inline]
    pub fn last_error(&self) -> f64 {
        self.last_error
    }

    #[inline]
    pub fn terms(&self) -> Terms {
        self.terms
    }

    #[inline]
    pub fn integral(&self) -> f64 {
        self.integral
    }

    #[inline]
    pub fn output_limits(&self) -> Limits {
        self.output_limits
    }

    #[inline]
    pub fn integral_limits(&self) -> Limits {
        self.integral_limits
    }

    #[inline]
    pub fn sample_period_ms(&self) -> u32 {
        self.sample_period_ms
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
