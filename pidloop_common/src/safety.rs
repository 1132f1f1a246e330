//! Measurement validation settings and fault types.
//!
//! Range validation and staleness detection are optional; the non-finite
//! check is always active. Any rejection latches a fault on the controller.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{DEFAULT_MAX_STALE_MS, DEFAULT_MIN_RATE_OF_CHANGE, DEFAULT_STALE_DEADBAND};
use crate::control::Limits;

/// Static envelope check on the measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeValidation {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_range_min")]
    pub min: f64,
    #[serde(default = "default_range_max")]
    pub max: f64,
}

fn default_range_min() -> f64 {
    f64::MIN
}
fn default_range_max() -> f64 {
    f64::MAX
}

impl Default for RangeValidation {
    fn default() -> Self {
        Self {
            enabled: false,
            min: default_range_min(),
            max: default_range_max(),
        }
    }
}

impl RangeValidation {
    /// Enabled range check over `[min, max]`.
    pub const fn enabled(min: f64, max: f64) -> Self {
        Self {
            enabled: true,
            min,
            max,
        }
    }

    /// Bounds as a validated range, if consistent.
    pub fn limits(&self) -> Option<Limits> {
        Limits::new(self.min, self.max)
    }
}

/// Stalled-sensor detection settings.
///
/// A measurement is stale when, while away from setpoint by more than
/// `deadband`, it moves slower than `min_rate_of_change` for longer than
/// `max_stale_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaleDetection {
    #[serde(default)]
    pub enabled: bool,
    /// Minimum |Δmeasurement| / Δt [units/s] for a reading to count as alive.
    #[serde(default = "default_min_rate")]
    pub min_rate_of_change: f64,
    /// Longest tolerated stall [ms].
    #[serde(default = "default_max_stale_ms")]
    pub max_stale_ms: u32,
    /// Band around setpoint considered settled.
    #[serde(default = "default_deadband")]
    pub deadband: f64,
}

fn default_min_rate() -> f64 {
    DEFAULT_MIN_RATE_OF_CHANGE
}
fn default_max_stale_ms() -> u32 {
    DEFAULT_MAX_STALE_MS
}
fn default_deadband() -> f64 {
    DEFAULT_STALE_DEADBAND
}

impl Default for StaleDetection {
    fn default() -> Self {
        Self {
            enabled: false,
            min_rate_of_change: DEFAULT_MIN_RATE_OF_CHANGE,
            max_stale_ms: DEFAULT_MAX_STALE_MS,
            deadband: DEFAULT_STALE_DEADBAND,
        }
    }
}

impl StaleDetection {
    /// Enabled stale detection with the default deadband.
    pub const fn enabled(min_rate_of_change: f64, max_stale_ms: u32) -> Self {
        Self {
            enabled: true,
            min_rate_of_change,
            max_stale_ms,
            deadband: DEFAULT_STALE_DEADBAND,
        }
    }

    /// Whether the parameters are usable.
    pub fn is_valid(&self) -> bool {
        self.min_rate_of_change.is_finite()
            && self.min_rate_of_change >= 0.0
            && self.deadband.is_finite()
            && self.deadband >= 0.0
    }
}

/// Complete supervisor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default)]
    pub range: RangeValidation,
    #[serde(default)]
    pub stale: StaleDetection,
}

bitflags! {
    /// Fault kinds recorded in the latch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u8 {
        /// Non-finite or unavailable measurement.
        const INVALID_MEASUREMENT = 0x01;
        /// Measurement outside the configured envelope.
        const OUT_OF_RANGE        = 0x02;
        /// Measurement stalled while away from setpoint.
        const STALE_MEASUREMENT   = 0x04;
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl FaultFlags {
    /// Short wire label of the highest-priority flag set, if any.
    pub const fn label(&self) -> Option<&'static str> {
        if self.contains(Self::INVALID_MEASUREMENT) {
            Some("invalid_measurement")
        } else if self.contains(Self::OUT_OF_RANGE) {
            Some("out_of_range")
        } else if self.contains(Self::STALE_MEASUREMENT) {
            Some("stale_measurement")
        } else {
            None
        }
    }
}

/// Reason the supervisor rejected a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MeasurementFault {
    /// Measurement was NaN, infinite, or unavailable.
    #[error("invalid measurement: {value}")]
    InvalidMeasurement { value: f64 },

    /// Measurement outside the configured envelope.
    #[error("measurement {value} outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// Measurement stalled while away from setpoint.
    #[error("stale measurement {value}: {rate:.4}/s below minimum for {stalled_ms}ms")]
    Stale {
        value: f64,
        rate: f64,
        stalled_ms: u32,
    },
}

impl MeasurementFault {
    /// Flag corresponding to this fault.
    pub const fn flag(&self) -> FaultFlags {
        match self {
            Self::InvalidMeasurement { .. } => FaultFlags::INVALID_MEASUREMENT,
            Self::OutOfRange { .. } => FaultFlags::OUT_OF_RANGE,
            Self::Stale { .. } => FaultFlags::STALE_MEASUREMENT,
        }
    }
}
