//! Simulated process for running the loop without hardware.

pub mod plant;
