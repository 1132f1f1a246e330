//! Controller lifecycle state.
//!
//! `Disabled → Armed` on enable, `Armed → Faulted` on a rejected measurement,
//! `Faulted → Disabled` on clear-fault. Output is non-neutral only in `Armed`.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// Lifecycle state of one control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LoopState {
    /// Output forced neutral, no fault pending.
    #[default]
    Disabled = 0,
    /// Enabled and computing output.
    Armed = 1,
    /// Fault latched; forced neutral until cleared.
    Faulted = 2,
}

const_assert_eq!(core::mem::size_of::<LoopState>(), 1);

impl LoopState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Armed),
            2 => Some(Self::Faulted),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_armed(self) -> bool {
        matches!(self, Self::Armed)
    }

    #[inline]
    pub const fn is_faulted(self) -> bool {
        matches!(self, Self::Faulted)
    }
}
