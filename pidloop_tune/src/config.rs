//! Tuning binary configuration: a loop configuration plus a `[tune]` section.

use std::path::Path;

use pidloop_common::config::{ConfigError, ConfigLoader, Validate};
use pidloop_common::consts::{STEP_TEST_DURATION_MS, TELEMETRY_INTERVAL_MS};
use pidloop_control::config::LoopConfig;
use serde::{Deserialize, Serialize};

/// Protocol timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuneSettings {
    /// Interval between `data` messages [ms].
    #[serde(default = "default_data_interval_ms")]
    pub data_interval_ms: u32,
    /// Step test duration [ms].
    #[serde(default = "default_step_test_duration_ms")]
    pub step_test_duration_ms: u32,
}

fn default_data_interval_ms() -> u32 {
    TELEMETRY_INTERVAL_MS
}
fn default_step_test_duration_ms() -> u32 {
    STEP_TEST_DURATION_MS
}

impl Default for TuneSettings {
    fn default() -> Self {
        Self {
            data_interval_ms: TELEMETRY_INTERVAL_MS,
            step_test_duration_ms: STEP_TEST_DURATION_MS,
        }
    }
}

impl TuneSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.data_interval_ms == 0 {
            return Err("data_interval_ms must be > 0".into());
        }
        if self.step_test_duration_ms == 0 {
            return Err("step_test_duration_ms must be > 0".into());
        }
        Ok(())
    }
}

/// Loop configuration extended with tuning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuneConfig {
    #[serde(flatten)]
    pub loop_config: LoopConfig,
    #[serde(default)]
    pub tune: TuneSettings,
}

impl Validate for TuneConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.loop_config.validate()?;
        self.tune
            .validate()
            .map_err(|e| ConfigError::in_section("tune", e))
    }
}

/// Load and validate a tuning configuration file.
pub fn load_config(path: &Path) -> Result<TuneConfig, ConfigError> {
    TuneConfig::load_validated(path)
}

/// Parse and validate a tuning configuration from a TOML string.
pub fn load_config_from_str(content: &str) -> Result<TuneConfig, ConfigError> {
    TuneConfig::parse_validated(content)
}
