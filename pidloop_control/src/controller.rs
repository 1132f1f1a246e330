//! Supervised controller: safety supervisor in front of the PID engine,
//! gated by the loop state machine.
//!
//! Per update: not armed → neutral; armed → supervisor validates the
//! measurement → on rejection the fault latches and output goes neutral;
//! otherwise the engine samples if its period has elapsed.
//!
//! Invariant: a latched fault implies `state == Faulted` and neutral output.

use pidloop_common::config::ConfigError;
use pidloop_common::consts::NEUTRAL_OUTPUT;
use pidloop_common::control::{Gains, Limits, Polarity, Terms};
use pidloop_common::safety::{FaultFlags, MeasurementFault, SafetyConfig};
use pidloop_common::snapshot::ControllerSnapshot;
use pidloop_common::state::LoopState;
use pidloop_common::time::Millis;
use tracing::{debug, info, warn};

use crate::config::ControllerSettings;
use crate::control::pid::PidEngine;
use crate::safety::supervisor::SafetySupervisor;
use crate::state::machine::{LoopEvent, LoopStateMachine, LoopTransition};

/// Result of an accepted update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// Loop not armed; output is neutral.
    Inactive,
    /// Measurement accepted, sample period not yet elapsed.
    Waiting,
    /// New sample computed.
    Sampled(f64),
}

/// One supervised PID control loop.
#[derive(Debug, Clone)]
pub struct Controller {
    engine: PidEngine,
    supervisor: SafetySupervisor,
    machine: LoopStateMachine,
    setpoint: f64,
}

impl Controller {
    /// Disabled controller with zero gains and default limits.
    pub fn new(polarity: Polarity) -> Self {
        Self {
            engine: PidEngine::new(polarity),
            supervisor: SafetySupervisor::default(),
            machine: LoopStateMachine::new(),
            setpoint: 0.0,
        }
    }

    /// Build a controller from validated settings. Left disabled unless
    /// `settings.start_enabled` is set.
    pub fn from_settings(
        settings: &ControllerSettings,
        safety: &SafetyConfig,
        now: Millis,
    ) -> Result<Self, ConfigError> {
        let mut ctrl = Self::new(settings.polarity);
        ctrl.supervisor = SafetySupervisor::new(*safety);
        if safety.range.enabled && ctrl.supervisor.range() != &safety.range {
            return Err(ConfigError::ValidationError(format!(
                "invalid range validation bounds [{}, {}]",
                safety.range.min, safety.range.max
            )));
        }
        if ctrl.supervisor.config().stale != safety.stale {
            return Err(ConfigError::ValidationError(
                "invalid stale detection parameters".into(),
            ));
        }

        let reject = |what: &str| ConfigError::ValidationError(format!("invalid {what}"));
        if !ctrl.engine.set_gains(settings.gains) {
            return Err(reject("gains"));
        }
        let Limits { min, max } = settings.output_limits;
        if !ctrl.engine.set_output_limits(min, max) {
            return Err(reject("output limits"));
        }
        let Limits { min, max } = settings.integral_limits;
        if !ctrl.engine.set_integral_limits(min, max) {
            return Err(reject("integral limits"));
        }
        if !ctrl.engine.set_sample_period(settings.sample_period_ms) {
            return Err(reject("sample period"));
        }
        if !ctrl.set_setpoint(settings.setpoint) {
            return Err(reject("setpoint"));
        }

        ctrl.engine.reset(now);
        if settings.start_enabled {
            ctrl.enable(now);
        }
        Ok(ctrl)
    }

    /// Apply gains and setpoint, reset dynamic state, and enable.
    ///
    /// Returns false if the loop could not be armed (fault latched) or the
    /// values were rejected; a rejected call leaves the loop state as it was.
    pub fn begin(&mut self, gains: Gains, setpoint: f64, now: Millis) -> bool {
        let accepted = self.set_gains(gains) & self.set_setpoint(setpoint);
        if !accepted {
            return false;
        }
        self.reset(now);
        self.enable(now)
    }

    /// Run one cycle with the latest measurement.
    pub fn update(&mut self, measurement: f64, now: Millis) -> Result<UpdateOutcome, MeasurementFault> {
        if !self.machine.state().is_armed() {
            self.engine.force_neutral();
            return Ok(UpdateOutcome::Inactive);
        }

        if let Err(fault) = self.supervisor.inspect(self.setpoint, measurement, now) {
            self.engine.force_neutral();
            self.machine.handle_event(LoopEvent::Fault);
            warn!("Measurement rejected, fault latched: {fault}");
            return Err(fault);
        }

        Ok(match self.engine.sample(self.setpoint, measurement, now) {
            Some(output) => UpdateOutcome::Sampled(output),
            None => UpdateOutcome::Waiting,
        })
    }

    // ── Lifecycle ───────────────────────────────────────────────

    /// Arm the loop. Refused while a fault is latched.
    pub fn enable(&mut self, now: Millis) -> bool {
        let was = self.machine.state();
        match self.machine.handle_event(LoopEvent::Enable) {
            LoopTransition::Ok(_) => {
                if was == LoopState::Disabled {
                    self.engine.resync(now);
                    self.supervisor.rearm();
                    info!("Control loop armed");
                }
                true
            }
            LoopTransition::Rejected(reason) => {
                warn!("Enable refused: {reason}");
                false
            }
        }
    }

    /// Disarm the loop and force neutral output. A latched fault stays.
    pub fn disable(&mut self) {
        let was = self.machine.state();
        self.machine.handle_event(LoopEvent::Disable);
        self.engine.force_neutral();
        if was == LoopState::Armed {
            info!("Control loop disabled");
        }
    }

    /// Release a latched fault. The loop lands in `Disabled`.
    pub fn clear_fault(&mut self) {
        if self.machine.state().is_faulted() {
            info!("Fault cleared ({:?})", self.supervisor.latched());
        }
        self.supervisor.clear();
        self.machine.handle_event(LoopEvent::ClearFault);
    }

    /// Discard integral, derivative history and outputs; restart timing.
    pub fn reset(&mut self, now: Millis) {
        self.engine.reset(now);
    }

    // ── Runtime configuration ───────────────────────────────────

    /// Replace gains; the integral accumulator is zeroed.
    pub fn set_gains(&mut self, gains: Gains) -> bool {
        let ok = self.engine.set_gains(gains);
        if ok {
            debug!("Gains set: kp={} ki={} kd={}", gains.kp, gains.ki, gains.kd);
        } else {
            debug!("Rejected gains {gains:?}");
        }
        ok
    }

    pub fn set_setpoint(&mut self, setpoint: f64) -> bool {
        if !setpoint.is_finite() {
            debug!("Rejected setpoint {setpoint}");
            return false;
        }
        self.setpoint = setpoint;
        true
    }

    pub fn set_output_limits(&mut self, min: f64, max: f64) -> bool {
        log_rejection(self.engine.set_output_limits(min, max), "output limits", min, max)
    }

    pub fn set_integral_limits(&mut self, min: f64, max: f64) -> bool {
        log_rejection(self.engine.set_integral_limits(min, max), "integral limits", min, max)
    }

    pub fn set_sample_period(&mut self, period_ms: u32) -> bool {
        let ok = self.engine.set_sample_period(period_ms);
        if !ok {
            debug!("Rejected sample period {period_ms}ms");
        }
        ok
    }

    /// Enable range validation over `[min, max]`.
    pub fn set_range_validation(&mut self, min: f64, max: f64) -> bool {
        log_rejection(self.supervisor.set_range(min, max), "range validation", min, max)
    }

    pub fn disable_range_validation(&mut self) {
        self.supervisor.disable_range();
    }

    /// Enable stale detection.
    pub fn set_stale_detection(&mut self, min_rate_of_change: f64, max_stale_ms: u32) -> bool {
        let ok = self.supervisor.set_stale(min_rate_of_change, max_stale_ms);
        if !ok {
            debug!("Rejected stale detection rate={min_rate_of_change} max={max_stale_ms}ms");
        }
        ok
    }

    pub fn set_stale_deadband(&mut self, deadband: f64) -> bool {
        let ok = self.supervisor.set_stale_deadband(deadband);
        if !ok {
            debug!("Rejected stale deadband {deadband}");
        }
        ok
    }

    pub fn disable_stale_detection(&mut self) {
        self.supervisor.disable_stale();
    }

    // ── Accessors ───────────────────────────────────────────────

    #[inline]
    pub fn state(&self) -> LoopState {
        self.machine.state()
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.machine.state().is_armed()
    }

    #[inline]
    pub fn is_faulted(&self) -> bool {
        self.machine.state().is_faulted()
    }

    #[inline]
    pub fn fault(&self) -> FaultFlags {
        self.supervisor.latched()
    }

    #[inline]
    pub fn last_fault(&self) -> Option<MeasurementFault> {
        self.supervisor.last_fault()
    }

    #[inline]
    pub fn gains(&self) -> Gains {
        self.engine.gains()
    }

    #[inline]
    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    #[inline]
    pub fn polarity(&self) -> Polarity {
        self.engine.polarity()
    }

    /// Current actuation command; neutral unless armed.
    #[inline]
    pub fn output(&self) -> f64 {
        if self.is_enabled() {
            self.engine.output()
        } else {
            NEUTRAL_OUTPUT
        }
    }

    #[inline]
    pub fn error(&self) -> f64 {
        self.engine.last_error()
    }

    #[inline]
    pub fn terms(&self) -> Terms {
        self.engine.terms()
    }

    #[inline]
    pub fn proportional(&self) -> f64 {
        self.engine.terms().p
    }

    #[inline]
    pub fn integral_term(&self) -> f64 {
        self.engine.terms().i
    }

    #[inline]
    pub fn derivative(&self) -> f64 {
        self.engine.terms().d
    }

    /// Raw integral accumulator.
    #[inline]
    pub fn integral(&self) -> f64 {
        self.engine.integral()
    }

    #[inline]
    pub fn output_limits(&self) -> Limits {
        self.engine.output_limits()
    }

    #[inline]
    pub fn integral_limits(&self) -> Limits {
        self.engine.integral_limits()
    }

    #[inline]
    pub fn sample_period_ms(&self) -> u32 {
        self.engine.sample_period_ms()
    }

    #[inline]
    pub fn safety_config(&self) -> SafetyConfig {
        self.supervisor.config()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.state(),
            gains: self.gains(),
            setpoint: self.setpoint,
            polarity: self.polarity(),
            output: self.output(),
            error: self.error(),
            terms: self.terms(),
            integral: self.integral(),
            sample_period_ms: self.sample_period_ms(),
            output_limits: self.output_limits(),
            integral_limits: self.integral_limits(),
            fault: self.fault(),
        }
    }
}

fn log_rejection(ok: bool, what: &str, min: f64, max: f64) -> bool {
    if !ok {
        debug!("Rejected {what} [{min}, {max}]");
    }
    ok
}

// ─── Tests ──────────────────────────────────────────────────────────
