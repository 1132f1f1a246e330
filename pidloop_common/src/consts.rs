//! System-wide constants for the pidloop workspace.
//!
//! Single source of truth for default tuning values, numeric limits and
//! default paths.

/// Neutral actuation command written whenever the loop is not armed.
pub const NEUTRAL_OUTPUT: f64 = 0.0;

/// Default controller sample period [ms].
pub const DEFAULT_SAMPLE_PERIOD_MS: u32 = 100;

/// Default lower output bound (8-bit PWM range).
pub const DEFAULT_OUTPUT_MIN: f64 = 0.0;

/// Default upper output bound (8-bit PWM range).
pub const DEFAULT_OUTPUT_MAX: f64 = 255.0;

/// Default lower integral accumulator bound.
pub const DEFAULT_INTEGRAL_MIN: f64 = -1000.0;

/// Default upper integral accumulator bound.
pub const DEFAULT_INTEGRAL_MAX: f64 = 1000.0;

/// Default band around setpoint inside which staleness is not evaluated.
pub const DEFAULT_STALE_DEADBAND: f64 = 0.5;

/// Default minimum rate of change [units/s] for a live measurement.
pub const DEFAULT_MIN_RATE_OF_CHANGE: f64 = 0.1;

/// Default maximum time [ms] a measurement may stall before rejection.
pub const DEFAULT_MAX_STALE_MS: u32 = 5000;

/// Default cycle runner period [µs] (10 ms polling).
pub const CYCLE_TIME_US: u32 = 10_000;

/// Minimum allowed cycle runner period [µs].
pub const CYCLE_TIME_US_MIN: u32 = 100;

/// Maximum allowed cycle runner period [µs].
pub const CYCLE_TIME_US_MAX: u32 = 1_000_000;

/// Default telemetry emission interval [ms] (10 Hz).
pub const TELEMETRY_INTERVAL_MS: u32 = 100;

/// Default step-test duration [ms].
pub const STEP_TEST_DURATION_MS: u32 = 5000;

/// Capacity of the tuning protocol line buffer [bytes].
pub const LINE_BUFFER_CAPACITY: usize = 256;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "config/pidloop.toml";
