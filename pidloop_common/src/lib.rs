//! pidloop Common Library
//!
//! Shared types, constants and configuration loading used by every crate in
//! the pidloop workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Default tuning values and numeric limits
//! - [`config`] - Configuration loading traits and types
//! - [`control`] - Gains, polarity, limit ranges and term diagnostics
//! - [`safety`] - Measurement validation settings and fault types
//! - [`state`] - Controller lifecycle state
//! - [`snapshot`] - Read-only view of a controller for telemetry
//! - [`time`] - Wrapping millisecond timestamps
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use pidloop_common::prelude::*;
//!
//! let limits = Limits::new(0.0, 255.0).unwrap();
//! assert_eq!(limits.clamp(300.0), 255.0);
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod prelude;
pub mod safety;
pub mod snapshot;
pub mod state;
pub mod time;
