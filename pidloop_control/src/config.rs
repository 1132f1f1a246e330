//! TOML configuration loader with validation.
//!
//! One file describes a complete loop: `[shared]`, `[controller]`,
//! `[safety.range]`, `[safety.stale]`, `[cycle]` and `[plant]`. Every
//! section except `[shared]` is optional and falls back to defaults.

use std::path::Path;

use pidloop_common::config::{ConfigError, ConfigLoader, SharedConfig, Validate};
use pidloop_common::consts::{
    CYCLE_TIME_US, CYCLE_TIME_US_MAX, CYCLE_TIME_US_MIN, DEFAULT_INTEGRAL_MAX,
    DEFAULT_INTEGRAL_MIN, DEFAULT_OUTPUT_MAX, DEFAULT_OUTPUT_MIN, DEFAULT_SAMPLE_PERIOD_MS,
    TELEMETRY_INTERVAL_MS,
};
use pidloop_common::control::{Gains, Limits, Polarity};
use pidloop_common::safety::SafetyConfig;
use pidloop_common::time::Millis;
use serde::{Deserialize, Serialize};

use crate::sim::plant::PlantConfig;

// ─── Controller ─────────────────────────────────────────────────────

/// Initial controller parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    #[serde(default)]
    pub gains: Gains,
    #[serde(default)]
    pub setpoint: f64,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u32,
    #[serde(default = "default_output_limits")]
    pub output_limits: Limits,
    #[serde(default = "default_integral_limits")]
    pub integral_limits: Limits,
    /// Arm the loop immediately after construction.
    #[serde(default)]
    pub start_enabled: bool,
}

fn default_sample_period_ms() -> u32 {
    DEFAULT_SAMPLE_PERIOD_MS
}
fn default_output_limits() -> Limits {
    Limits {
        min: DEFAULT_OUTPUT_MIN,
        max: DEFAULT_OUTPUT_MAX,
    }
}
fn default_integral_limits() -> Limits {
    Limits {
        min: DEFAULT_INTEGRAL_MIN,
        max: DEFAULT_INTEGRAL_MAX,
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            gains: Gains::default(),
            setpoint: 0.0,
            polarity: Polarity::Direct,
            sample_period_ms: DEFAULT_SAMPLE_PERIOD_MS,
            output_limits: default_output_limits(),
            integral_limits: default_integral_limits(),
            start_enabled: false,
        }
    }
}

impl ControllerSettings {
    pub fn validate(&self) -> Result<(), String> {
        if !self.gains.is_finite() {
            return Err(format!("gains must be finite, got {:?}", self.gains));
        }
        if !self.setpoint.is_finite() {
            return Err(format!("setpoint must be finite, got {}", self.setpoint));
        }
        if self.sample_period_ms == 0 {
            return Err("sample_period_ms must be > 0".into());
        }
        if !self.output_limits.is_valid() {
            return Err(format!(
                "output_limits: min ({}) must be < max ({})",
                self.output_limits.min, self.output_limits.max
            ));
        }
        if !self.integral_limits.is_valid() {
            return Err(format!(
                "integral_limits: min ({}) must be < max ({})",
                self.integral_limits.min, self.integral_limits.max
            ));
        }
        Ok(())
    }
}

// ─── Cycle ──────────────────────────────────────────────────────────

/// Cycle runner timing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleSettings {
    /// Polling period of the runner [µs]. The controller's own sample
    /// period gates how often the law actually runs.
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,
    /// Interval between telemetry log lines [ms].
    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u32,
    /// First clock reading [ms].
    #[serde(default)]
    pub clock_start_ms: Millis,
}

fn default_cycle_time_us() -> u32 {
    CYCLE_TIME_US
}
fn default_telemetry_interval_ms() -> u32 {
    TELEMETRY_INTERVAL_MS
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            cycle_time_us: CYCLE_TIME_US,
            telemetry_interval_ms: TELEMETRY_INTERVAL_MS,
            clock_start_ms: 0,
        }
    }
}

impl CycleSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.cycle_time_us < CYCLE_TIME_US_MIN || self.cycle_time_us > CYCLE_TIME_US_MAX {
            return Err(format!(
                "cycle_time_us {} out of range [{CYCLE_TIME_US_MIN}, {CYCLE_TIME_US_MAX}]",
                self.cycle_time_us
            ));
        }
        if self.telemetry_interval_ms == 0 {
            return Err("telemetry_interval_ms must be > 0".into());
        }
        Ok(())
    }
}

// ─── Bundle ─────────────────────────────────────────────────────────

/// Complete loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub controller: ControllerSettings,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub cycle: CycleSettings,
    #[serde(default)]
    pub plant: PlantConfig,
}

impl Validate for LoopConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.controller
            .validate()
            .map_err(|e| ConfigError::in_section("controller", e))?;
        validate_safety(&self.safety).map_err(|e| ConfigError::in_section("safety", e))?;
        self.cycle
            .validate()
            .map_err(|e| ConfigError::in_section("cycle", e))?;
        self.plant
            .validate()
            .map_err(|e| ConfigError::in_section("plant", e))
    }
}

fn validate_safety(safety: &SafetyConfig) -> Result<(), String> {
    if safety.range.enabled && safety.range.limits().is_none() {
        return Err(format!(
            "range: min ({}) must be < max ({})",
            safety.range.min, safety.range.max
        ));
    }
    if !safety.stale.is_valid() {
        return Err(format!(
            "stale: min_rate_of_change ({}) and deadband ({}) must be finite and >= 0",
            safety.stale.min_rate_of_change, safety.stale.deadband
        ));
    }
    Ok(())
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate a loop configuration file.
pub fn load_config(path: &Path) -> Result<LoopConfig, ConfigError> {
    LoopConfig::load_validated(path)
}

/// Parse and validate a loop configuration from a TOML string.
pub fn load_config_from_str(content: &str) -> Result<LoopConfig, ConfigError> {
    LoopConfig::parse_validated(content)
}

// ─── Tests ──────────────────────────────────────────────────────────
