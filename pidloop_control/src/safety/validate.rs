//! Stateless measurement checks.

use pidloop_common::safety::{MeasurementFault, RangeValidation};

/// Reject NaN and infinite measurements. Always active.
#[inline]
pub fn check_finite(value: f64) -> Result<(), MeasurementFault> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(MeasurementFault::InvalidMeasurement { value })
    }
}

/// Reject measurements outside the configured envelope (bounds inclusive).
/// Passes unconditionally when range validation is disabled.
#[inline]
pub fn check_range(range: &RangeValidation, value: f64) -> Result<(), MeasurementFault> {
    if !range.enabled || (value >= range.min && value <= range.max) {
        Ok(())
    } else {
        Err(MeasurementFault::OutOfRange {
            value,
            min: range.min,
            max: range.max,
        })
    }
}
