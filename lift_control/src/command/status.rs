//! Controller status as seen by observers.
//!
//! The controller publishes every transition and outcome to a
//! [`StatusBoard`]; the command surface reads it and claims the idle slot
//! through it.

use lift_common::control::outcome::MovementOutcome;
use lift_common::control::state::ControllerState;
use lift_common::frame::FrameSnapshot;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerStatus {
    /// Lifecycle state.
    pub state: ControllerState,
    /// Outcome of the most recent request.
    pub last_outcome: Option<MovementOutcome>,
    /// Most recent snapshot taken by the controller.
    pub last_frame: Option<FrameSnapshot>,
    /// Sessions that issued a direction command and ended.
    pub sessions_completed: u64,
}

/// Shared, lock-protected controller status.
#[derive(Debug, Clone, Default)]
pub struct StatusBoard {
    inner: Arc<Mutex<ControllerStatus>>,
}

impl StatusBoard {
    /// Board reporting Idle with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current status.
    pub fn snapshot(&self) -> ControllerStatus {
        self.inner.lock().clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.inner.lock().state
    }

    pub(crate) fn set_state(&self, state: ControllerState) {
        self.inner.lock().state = state;
    }

    pub(crate) fn set_frame(&self, frame: &FrameSnapshot) {
        self.inner.lock().last_frame = Some(frame.clone());
    }

    /// Publish the settled state and the outcome that led to it in one step.
    pub(crate) fn settle(
        &self,
        state: ControllerState,
        outcome: &MovementOutcome,
        session_ended: bool,
    ) {
        let mut status = self.inner.lock();
        status.state = state;
        if let Some(frame) = outcome.frame() {
            status.last_frame = Some(frame.clone());
        }
        status.last_outcome = Some(outcome.clone());
        if session_ended {
            status.sessions_completed += 1;
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, ControllerStatus> {
        self.inner.lock()
    }
}
