//! Tuning channel errors.

use thiserror::Error;

/// Failure writing to the tuning channel.
#[derive(Debug, Error)]
pub enum TuneError {
    /// Underlying stream failed.
    #[error("tuning stream I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Message could not be encoded.
    #[error("message encoding: {0}")]
    Encode(#[from] serde_json::Error),
}
