mod closed_loop;
mod config_to_loop;
mod control_law;
mod properties;
mod safety_latch;
mod timing;
