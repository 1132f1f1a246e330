//! Control law root.
//!
//! Positional PID with integral clamping, derivative on measurement, and
//! polarity. Gating to the configured sample period lives in the engine.

pub mod pid;
