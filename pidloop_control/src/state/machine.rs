//! Loop lifecycle: Disabled ↔ Armed → Faulted → Disabled.
//!
//! Faulted is a latch. Only an explicit clear-fault leaves it, and it always
//! lands in Disabled; re-arming is a separate enable.

use pidloop_common::state::LoopState;

/// Events that drive the loop state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// Operator enables the loop.
    Enable,
    /// Operator disables the loop.
    Disable,
    /// Supervisor rejected a measurement.
    Fault,
    /// Operator acknowledges and clears the latched fault.
    ClearFault,
}

/// Result of a loop state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopTransition {
    Ok(LoopState),
    Rejected(&'static str),
}

/// Loop lifecycle state machine.
#[derive(Debug, Clone, Default)]
pub struct LoopStateMachine {
    state: LoopState,
}

impl LoopStateMachine {
    pub const fn new() -> Self {
        Self {
            state: LoopState::Disabled,
        }
    }

    #[inline]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Handle a lifecycle event.
    pub fn handle_event(&mut self, event: LoopEvent) -> LoopTransition {
        use LoopEvent as E;
        use LoopState as S;

        let next = match (self.state, event) {
            (S::Disabled | S::Armed, E::Enable) => S::Armed,
            (S::Faulted, E::Enable) => {
                return LoopTransition::Rejected("fault latched, clear it before enabling");
            }

            (S::Disabled | S::Armed, E::Disable) => S::Disabled,
            // Disabling does not clear the latch.
            (S::Faulted, E::Disable) => S::Faulted,

            (S::Armed | S::Faulted, E::Fault) => S::Faulted,

            (S::Faulted, E::ClearFault) => S::Disabled,
            (S::Disabled, E::ClearFault) => S::Disabled,
            (S::Armed, E::ClearFault) => S::Armed,

            _ => return LoopTransition::Rejected("invalid loop transition"),
        };

        self.state = next;
        LoopTransition::Ok(next)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
