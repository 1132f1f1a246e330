//! Control types shared between the controller and its collaborators.
//!
//! Defines `Gains`, `Polarity`, `Limits` and the `Terms` diagnostic vector.

use serde::{Deserialize, Serialize};

/// PID tuning coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gains {
    /// Proportional gain.
    #[serde(default)]
    pub kp: f64,
    /// Integral gain (0 = disabled).
    #[serde(default)]
    pub ki: f64,
    /// Derivative gain (0 = disabled).
    #[serde(default)]
    pub kd: f64,
}

impl Gains {
    pub const fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    /// Returns true if all three gains are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()
    }
}

/// Direction of action between error and output.
///
/// `Direct`: output rises when the measurement is below setpoint (heating).
/// `Reverse`: output rises when the measurement is above setpoint (cooling).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Polarity {
    #[default]
    Direct = 0,
    Reverse = 1,
}

impl Polarity {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Direct),
            1 => Some(Self::Reverse),
            _ => None,
        }
    }
}

/// Closed numeric range `[min, max]` with `min < max`.
///
/// Both bounds are finite. Constructed through [`Limits::new`], which refuses
/// degenerate or non-finite ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub min: f64,
    pub max: f64,
}

impl Limits {
    /// Build a range, returning `None` if `min >= max` or a bound is not finite.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        let limits = Self { min, max };
        limits.is_valid().then_some(limits)
    }

    /// Whether this range is usable (finite bounds, `min < max`).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }

    /// Clamp `value` into the range. NaN maps to `min`.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            self.min
        } else if value > self.max {
            self.max
        } else if value < self.min {
            self.min
        } else {
            value
        }
    }

    /// Whether `value` lies inside the closed range.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Last computed contribution of each PID term.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Terms {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

impl Terms {
    pub const ZERO: Self = Self {
        p: 0.0,
        i: 0.0,
        d: 0.0,
    };

    /// Negate all three terms together.
    #[inline]
    pub fn negated(self) -> Self {
        Self {
            p: -self.p,
            i: -self.i,
            d: -self.d,
        }
    }

    /// Combine terms into the raw (unclamped) output.
    ///
    /// D is subtracted: it is computed on the measurement, whose slope has the
    /// opposite sign of the error slope.
    #[inline]
    pub fn combine(&self) -> f64 {
        self.p + self.i - self.d
    }
}
