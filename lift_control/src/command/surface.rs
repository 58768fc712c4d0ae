//! Command surface.
//!
//! The only entry points the outer layers may call into the controller:
//! `request_move`, `request_move_to`, `request_abort`, `request_reset` and
//! `current_state`. Requests are never queued. A move is accepted only when
//! the status board reports Idle, and the surface claims the Preflight slot
//! under the board lock before handing the request to the controller task.

use lift_common::control::command::{MovementRequest, Preset, UnknownPreset};
use lift_common::control::outcome::ErrorClass;
use lift_common::control::state::ControllerState;
use lift_common::frame::config::{LiftConfig, PresetTable};
use lift_common::port::DevicePort;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use super::abort::AbortSignal;
use super::status::{ControllerStatus, StatusBoard};
use crate::controller::MovementController;

/// Work item handed from the surface to the controller task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerRequest {
    /// Run one movement.
    Move(MovementRequest),
    /// Re-issue the stop writes to leave Faulted.
    Reset,
}

/// Why the surface refused a call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// A session is in progress; retry once it ends.
    #[error("controller busy ({0})")]
    Busy(ControllerState),

    /// The controller is faulted; only a reset is accepted.
    #[error("controller faulted, reset required")]
    Faulted,

    /// Preset name not known.
    #[error(transparent)]
    UnknownPreset(#[from] UnknownPreset),

    /// Reset asked for while not faulted.
    #[error("controller not faulted ({0})")]
    NotFaulted(ControllerState),

    /// The controller task has exited.
    #[error("controller task is gone")]
    ControllerGone,
}

impl Rejection {
    /// Error class reported to observers.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownPreset(_) => ErrorClass::Validation,
            Self::ControllerGone => ErrorClass::Transport,
            Self::Busy(_) | Self::Faulted | Self::NotFaulted(_) => ErrorClass::Precondition,
        }
    }
}

/// Acknowledgement of an abort. Aborts are always accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortAck {
    /// The active session will stop at its next poll boundary.
    Signalled(ControllerState),
    /// No session was active; nothing changed.
    NoActiveSession,
}

impl AbortAck {
    /// Whether a running session was told to stop.
    #[inline]
    pub const fn signalled(&self) -> bool {
        matches!(self, Self::Signalled(_))
    }
}

/// Cloneable handle onto a running controller task.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    board: StatusBoard,
    abort: AbortSignal,
    requests: mpsc::Sender<ControllerRequest>,
    presets: PresetTable,
}

/// Spawn the controller task on the current runtime.
///
/// The task ends when every handle is dropped and returns the port.
pub fn spawn_controller<P>(port: P, config: &LiftConfig) -> (ControllerHandle, JoinHandle<P>)
where
    P: DevicePort + 'static,
{
    let board = StatusBoard::new();
    let abort = AbortSignal::new();
    let (requests, inbox) = mpsc::channel(1);
    let controller = MovementController::new(port, config, abort.clone(), board.clone());
    let task = tokio::spawn(controller.run(inbox));
    let handle = ControllerHandle {
        board,
        abort,
        requests,
        presets: config.presets,
    };
    (handle, task)
}

impl ControllerHandle {
    /// Move to a preset.
    pub fn request_move(&self, preset: Preset) -> Result<(), Rejection> {
        self.submit(MovementRequest::preset(preset, &self.presets))
    }

    /// Move to a preset given by name.
    pub fn request_move_named(&self, name: &str) -> Result<(), Rejection> {
        let preset: Preset = name.parse()?;
        self.request_move(preset)
    }

    /// Move to an explicit position.
    pub fn request_move_to(&self, target: i16) -> Result<(), Rejection> {
        self.submit(MovementRequest::direct(target))
    }

    /// Ask the active session to stop at its next poll.
    ///
    /// Idempotent. Without an active session the flag is left untouched so
    /// it cannot reach a later session.
    pub fn request_abort(&self) -> AbortAck {
        let status = self.board.lock();
        if status.state.is_busy() {
            self.abort.raise();
            info!(state = %status.state, "Abort requested");
            AbortAck::Signalled(status.state)
        } else {
            debug!(state = %status.state, "Abort accepted, no active session");
            AbortAck::NoActiveSession
        }
    }

    /// Ask a faulted controller to re-issue the stop writes.
    pub fn request_reset(&self) -> Result<(), Rejection> {
        let mut status = self.board.lock();
        if status.state != ControllerState::Faulted {
            return Err(Rejection::NotFaulted(status.state));
        }
        self.requests
            .try_send(ControllerRequest::Reset)
            .map_err(|_| Rejection::ControllerGone)?;
        status.state = ControllerState::Stopping;
        Ok(())
    }

    /// Current status snapshot.
    pub fn current_state(&self) -> ControllerStatus {
        self.board.snapshot()
    }

    /// Poll the status until no session is active.
    pub async fn wait_until_settled(&self, period: Duration) -> ControllerStatus {
        loop {
            let status = self.board.snapshot();
            if !status.state.is_busy() {
                return status;
            }
            sleep(period).await;
        }
    }

    /// Whether the controller task still accepts requests.
    pub fn is_connected(&self) -> bool {
        !self.requests.is_closed()
    }

    fn submit(&self, request: MovementRequest) -> Result<(), Rejection> {
        let mut status = self.board.lock();
        match status.state {
            ControllerState::Idle => {}
            ControllerState::Faulted => return Err(Rejection::Faulted),
            busy => return Err(Rejection::Busy(busy)),
        }
        match self.requests.try_send(ControllerRequest::Move(request)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(Rejection::Busy(status.state)),
            Err(TrySendError::Closed(_)) => return Err(Rejection::ControllerGone),
        }
        // Claimed under the board lock; a pending abort belongs to an
        // earlier session.
        status.state = ControllerState::Preflight;
        self.abort.clear();
        info!(%request, "Movement request queued for controller");
        Ok(())
    }
}
