//! # pidloop Tune
//!
//! Tuning and telemetry channel for a supervised controller, carried as
//! newline-delimited JSON over any byte stream.
//!
//! - Inbound: commands tagged by `"cmd"` (`set_params`, `set_sp`, `start`,
//!   `stop`, `get_status`, `step_test`, `clear_fault`, `reset`)
//! - Outbound: messages tagged by `"type"` (`data`, `status`, `debug`,
//!   `step_test_started`, `step_test_complete`, `fault`) plus bare
//!   `{"error": ...}` replies
//!
//! [`session::TuneSession`] owns the framing buffer and protocol state; the
//! caller drives it once per cycle with the bytes received since the last
//! call.

pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
