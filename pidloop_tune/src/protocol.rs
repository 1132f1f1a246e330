//! Wire protocol: line framing, inbound commands, outbound messages.

pub mod command;
pub mod framing;
pub mod message;
