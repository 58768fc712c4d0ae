//! Controller lifecycle transitions.
//!
//! `Idle → Preflight → Moving → Stopping → Idle`. `Faulted` is entered when a
//! stop cannot be confirmed or a device reply is unusable, and is left only
//! through a reset, which re-runs the stop sequence.

use lift_common::control::state::ControllerState;

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded, new state.
    Ok(ControllerState),
    /// Transition rejected, reason.
    Rejected(&'static str),
}

/// Event that can trigger a controller transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Movement request accepted for checking.
    Request,
    /// A precondition failed; nothing was written.
    PreconditionFailed,
    /// Primary actuator already within tolerance of the target.
    AlreadyAtTarget,
    /// Direction flag written; the session is running.
    DirectionAsserted,
    /// A stop was decided (safety, abort, completion, port failure).
    StopRequested,
    /// Both direction flags cleared.
    StopConfirmed,
    /// A stop write failed.
    StopFailed,
    /// Device reply unusable; actuator state unknown.
    DeviceFault,
    /// Operator asked to clear a fault.
    ResetRequested,
}

/// Controller state holder.
#[derive(Debug, Clone, Default)]
pub struct ControllerStateMachine {
    state: ControllerState,
}

impl ControllerStateMachine {
    /// Create a state machine in Idle.
    pub const fn new() -> Self {
        Self {
            state: ControllerState::Idle,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: ControllerEvent) -> TransitionResult {
        use ControllerEvent::*;
        use ControllerState::*;

        let next = match (self.state, event) {
            (Idle, Request) => Preflight,

            // Preflight exits
            (Preflight, PreconditionFailed) => Idle,
            (Preflight, AlreadyAtTarget) => Idle,
            (Preflight, DirectionAsserted) => Moving,

            // Not-level preflight, failed direction write, or a session stop
            (Preflight | Moving, StopRequested) => Stopping,

            (Stopping, StopConfirmed) => Idle,
            (Stopping, StopFailed) => Faulted,

            // Reset re-runs the stop sequence
            (Faulted, ResetRequested) => Stopping,

            (Idle, DeviceFault) => {
                return TransitionResult::Rejected("Idle: no device request outstanding");
            }
            (_, DeviceFault) => Faulted,

            _ => return TransitionResult::Rejected(invalid_transition_reason(self.state)),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

fn invalid_transition_reason(state: ControllerState) -> &'static str {
    match state {
        ControllerState::Idle => "Idle: only Request allowed",
        ControllerState::Preflight => "Preflight: invalid event for current state",
        ControllerState::Moving => "Moving: only StopRequested or DeviceFault allowed",
        ControllerState::Stopping => "Stopping: only StopConfirmed, StopFailed or DeviceFault allowed",
        ControllerState::Faulted => "Faulted: only ResetRequested allowed",
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
