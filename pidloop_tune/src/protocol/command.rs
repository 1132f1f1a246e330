//! Inbound commands.
//!
//! Each line is one JSON object tagged by `"cmd"`. A line that is not JSON
//! is answered with `Invalid JSON`; JSON without a known `cmd` with
//! `Unknown command`.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Parameter update. Every field is optional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SetParams {
    pub kp: Option<f64>,
    pub ki: Option<f64>,
    pub kd: Option<f64>,
    /// Sample period [ms].
    pub loop_period: Option<u32>,
    /// Apply `output_min`/`output_max` when true.
    pub output_limit: Option<bool>,
    pub output_min: Option<f64>,
    pub output_max: Option<f64>,
    /// Apply `integral_min`/`integral_max` when true.
    pub integral_limit: Option<bool>,
    pub integral_min: Option<f64>,
    pub integral_max: Option<f64>,
}

impl SetParams {
    /// Output bounds, if the flag is set and both bounds are present.
    pub fn output_limits(&self) -> Option<(f64, f64)> {
        match (self.output_limit, self.output_min, self.output_max) {
            (Some(true), Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    /// Integral bounds, if the flag is set and both bounds are present.
    pub fn integral_limits(&self) -> Option<(f64, f64)> {
        match (self.integral_limit, self.integral_min, self.integral_max) {
            (Some(true), Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }
}

/// A decoded tuning command.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    SetParams(SetParams),
    SetSp {
        #[serde(default)]
        value: Option<f64>,
    },
    Start,
    Stop,
    GetStatus,
    StepTest {
        #[serde(default)]
        amplitude: Option<f64>,
    },
    ClearFault,
    Reset,
}

const KNOWN_COMMANDS: [&str; 8] = [
    "set_params",
    "set_sp",
    "start",
    "stop",
    "get_status",
    "step_test",
    "clear_fault",
    "reset",
];

/// Why a line was not accepted as a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Invalid JSON")]
    InvalidJson,
    #[error("Unknown command")]
    UnknownCommand,
}

/// Decode one line.
pub fn parse_command(line: &[u8]) -> Result<Command, CommandError> {
    let value: Value = serde_json::from_slice(line).map_err(|_| CommandError::InvalidJson)?;
    match value.get("cmd").and_then(Value::as_str) {
        Some(cmd) if KNOWN_COMMANDS.contains(&cmd) => {}
        _ => return Err(CommandError::UnknownCommand),
    }
    serde_json::from_value(value).map_err(|_| CommandError::InvalidJson)
}
