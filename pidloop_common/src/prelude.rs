//! Prelude module for common re-exports.
//!
//! ```rust
//! use pidloop_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};

// ─── Control ────────────────────────────────────────────────────────
pub use crate::control::{Gains, Limits, Polarity, Terms};
pub use crate::snapshot::ControllerSnapshot;
pub use crate::state::LoopState;

// ─── Safety ─────────────────────────────────────────────────────────
pub use crate::safety::{
    FaultFlags, MeasurementFault, RangeValidation, SafetyConfig, StaleDetection,
};

// ─── Time ───────────────────────────────────────────────────────────
pub use crate::consts::NEUTRAL_OUTPUT;
pub use crate::time::{Millis, elapsed_ms, ms_to_secs};
