//! Safety module root.
//!
//! Measurement validation (finite and envelope checks), stalled-sensor
//! detection, and the supervisor that sequences them and holds the latch.

pub mod stale;
pub mod supervisor;
pub mod validate;
