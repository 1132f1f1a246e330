//! First-order process simulator with sensor fault injection.
//!
//! `dpv/dt = (ambient + gain * drive - pv) / time_constant_s`
//!
//! The plant advances by a fixed step on every read, so one read per runner
//! cycle keeps simulated time in step with the cycle period.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::io::{ActuationSink, MeasurementSource};

/// Plant parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantConfig {
    /// Steady-state process change per unit of drive.
    #[serde(default = "default_gain")]
    pub gain: f64,
    /// First-order time constant [s].
    #[serde(default = "default_time_constant_s")]
    pub time_constant_s: f64,
    /// Process value with zero drive.
    #[serde(default = "default_ambient")]
    pub ambient: f64,
}

fn default_gain() -> f64 {
    1.0
}
fn default_time_constant_s() -> f64 {
    5.0
}
fn default_ambient() -> f64 {
    20.0
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            gain: default_gain(),
            time_constant_s: default_time_constant_s(),
            ambient: default_ambient(),
        }
    }
}

impl PlantConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.time_constant_s.is_finite() && self.time_constant_s > 0.0) {
            return Err(format!("time_constant_s must be > 0, got {}", self.time_constant_s));
        }
        if !self.gain.is_finite() || !self.ambient.is_finite() {
            return Err("gain and ambient must be finite".into());
        }
        Ok(())
    }
}

/// Sensor failure modes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SensorFault {
    #[default]
    Healthy,
    /// Reading frozen at the value seen when the fault began.
    Stuck,
    /// Reading is NaN.
    NotANumber,
    /// No reading available.
    Offline,
    /// Constant offset added to the true value.
    Offset(f64),
}

/// Simulated first-order process with a faultable sensor.
#[derive(Debug, Clone)]
pub struct FirstOrderPlant {
    config: PlantConfig,
    step_s: f64,
    pv: f64,
    drive: f64,
    reads: u64,
    fault: SensorFault,
    stuck_at: f64,
    scheduled: Option<(u64, SensorFault)>,
}

impl FirstOrderPlant {
    /// Plant at ambient, advancing `step_s` seconds per read.
    pub fn new(config: PlantConfig, step_s: f64) -> Self {
        Self {
            config,
            step_s,
            pv: config.ambient,
            drive: 0.0,
            reads: 0,
            fault: SensorFault::Healthy,
            stuck_at: config.ambient,
            scheduled: None,
        }
    }

    /// True process value (independent of sensor faults).
    #[inline]
    pub fn process_value(&self) -> f64 {
        self.pv
    }

    #[inline]
    pub fn drive(&self) -> f64 {
        self.drive
    }

    #[inline]
    pub fn fault(&self) -> SensorFault {
        self.fault
    }

    /// Apply a sensor fault now.
    pub fn inject(&mut self, fault: SensorFault) {
        if fault == SensorFault::Stuck {
            self.stuck_at = self.pv;
        }
        if fault != self.fault {
            info!("Sensor fault injected: {fault:?}");
        }
        self.fault = fault;
    }

    /// Apply a sensor fault once `reads` reads have happened.
    pub fn schedule_fault(&mut self, reads: u64, fault: SensorFault) {
        self.scheduled = Some((reads, fault));
    }

    /// Advance the process by `dt` seconds (exact first-order step).
    pub fn advance(&mut self, dt: f64) {
        let target = self.config.ambient + self.config.gain * self.drive;
        let alpha = 1.0 - (-dt / self.config.time_constant_s).exp();
        self.pv += alpha * (target - self.pv);
    }
}

impl MeasurementSource for FirstOrderPlant {
    fn read(&mut self) -> Option<f64> {
        if let Some((at, fault)) = self.scheduled {
            if self.reads >= at {
                self.scheduled = None;
                self.inject(fault);
            }
        }
        self.reads += 1;
        self.advance(self.step_s);

        match self.fault {
            SensorFault::Healthy => Some(self.pv),
            SensorFault::Stuck => Some(self.stuck_at),
            SensorFault::NotANumber => Some(f64::NAN),
            SensorFault::Offline => None,
            SensorFault::Offset(offset) => Some(self.pv + offset),
        }
    }
}

impl ActuationSink for FirstOrderPlant {
    fn write(&mut self, command: f64) {
        debug!("Plant drive {command:.3}");
        self.drive = command;
    }
}
