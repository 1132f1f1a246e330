//! Fixed-capacity line framing.
//!
//! `\n` or `\r` ends a line. Empty lines are skipped. Bytes arriving after
//! the buffer is full are dropped until the next terminator, so an overlong
//! line is delivered truncated.

use heapless::Vec;
use pidloop_common::consts::LINE_BUFFER_CAPACITY;
use tracing::debug;

/// One complete (possibly truncated) line, without terminator.
pub type Line = Vec<u8, LINE_BUFFER_CAPACITY>;

/// Accumulates bytes into lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Line,
    dropped: usize,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            dropped: 0,
        }
    }

    /// Feed one byte. Returns a line when `byte` terminates a non-empty one.
    pub fn push(&mut self, byte: u8) -> Option<Line> {
        match byte {
            b'\n' | b'\r' => {
                if self.dropped > 0 {
                    debug!("Line overflow: dropped {} bytes", self.dropped);
                    self.dropped = 0;
                }
                if self.buf.is_empty() {
                    None
                } else {
                    Some(core::mem::take(&mut self.buf))
                }
            }
            _ => {
                if self.buf.push(byte).is_err() {
                    self.dropped += 1;
                }
                None
            }
        }
    }

    /// Bytes buffered for the current, unterminated line.
    #[inline]
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.dropped = 0;
    }
}
