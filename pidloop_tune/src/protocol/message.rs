//! Outbound messages.
//!
//! One JSON object per line, tagged by `"type"`. Error replies are the only
//! untagged shape: `{"error": "..."}`.

use std::io::Write;

use pidloop_common::snapshot::ControllerSnapshot;
use serde::Serialize;

use super::command::CommandError;
use crate::error::TuneError;

/// Periodic telemetry sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Data {
    pub pv: f64,
    pub sp: f64,
    pub output: f64,
    /// `sp - pv` at the time of sending.
    pub error: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "I")]
    pub i: f64,
    #[serde(rename = "D")]
    pub d: f64,
    /// Millisecond timestamp.
    pub time: u32,
}

impl Data {
    pub fn new(snapshot: &ControllerSnapshot, pv: f64, time: u32) -> Self {
        Self {
            pv,
            sp: snapshot.setpoint,
            output: snapshot.output,
            error: snapshot.setpoint - pv,
            p: snapshot.terms.p,
            i: snapshot.terms.i,
            d: snapshot.terms.d,
            time,
        }
    }
}

/// Controller status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Status {
    /// Session-level run flag toggled by start/stop.
    pub running: bool,
    pub enabled: bool,
    pub faulted: bool,
    /// Latched fault label, `null` when clear.
    pub fault: Option<&'static str>,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub sp: f64,
    pub loop_period: u32,
}

impl Status {
    pub fn new(snapshot: &ControllerSnapshot, running: bool) -> Self {
        Self {
            running,
            enabled: snapshot.enabled(),
            faulted: snapshot.faulted(),
            fault: snapshot.fault.label(),
            kp: snapshot.gains.kp,
            ki: snapshot.gains.ki,
            kd: snapshot.gains.kd,
            sp: snapshot.setpoint,
            loop_period: snapshot.sample_period_ms,
        }
    }
}

/// Tagged outbound message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Data(Data),
    Status(Status),
    Debug { debug: &'static str },
    StepTestStarted { amplitude: f64 },
    StepTestComplete,
    Fault { fault: &'static str, detail: String },
}

/// Untagged error reply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorReply {
    pub error: &'static str,
}

impl From<CommandError> for ErrorReply {
    fn from(e: CommandError) -> Self {
        let error = match e {
            CommandError::InvalidJson => "Invalid JSON",
            CommandError::UnknownCommand => "Unknown command",
        };
        Self { error }
    }
}

/// Write one value as a JSON line.
pub fn write_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), TuneError> {
    serde_json::to_writer(&mut *out, value)?;
    out.write_all(b"\n")?;
    Ok(())
}
