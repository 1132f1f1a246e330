//! # pidloop Control Library
//!
//! Supervised PID control loop. Every sample, a safety supervisor validates
//! the measurement (finite, optional envelope, optional stall detection)
//! before the control law may consume it. Any rejection latches a fault,
//! forces neutral output, and holds the loop disabled until an explicit
//! clear-fault followed by a separate enable.
//!
//! ## Layers
//!
//! 1. **PidEngine** — control law: sample gating, clamped integral,
//!    derivative on measurement, polarity, output clamping
//! 2. **SafetySupervisor** — ordered measurement checks and fault latch
//! 3. **LoopStateMachine** — Disabled / Armed / Faulted lifecycle
//! 4. **Controller** — composition of the three above
//! 5. **ControlLoop / CycleRunner** — process I/O binding and pacing
//!
//! ## Fixed-Cost Cycle
//!
//! An update performs no allocation and no blocking; all state is held
//! inline in the controller.

pub mod clock;
pub mod config;
pub mod control;
pub mod controller;
pub mod cycle;
pub mod io;
pub mod safety;
pub mod sim;
pub mod state;
