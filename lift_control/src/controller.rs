//! Movement controller.
//!
//! The controller is the only owner of the device port. Each request runs to
//! completion inside [`MovementController::execute`]:
//!
//! 1. **Preflight** - target window, direction flags, range, level, no-op
//! 2. **Moving** - exactly one direction flag asserted, then one snapshot per
//!    poll checked for level, range, overshoot and tolerance in that order
//! 3. **Stopping** - both direction flags cleared, always
//!
//! Any stop that cannot be confirmed, and any unusable device reply, leaves
//! the controller `Faulted` until [`MovementController::reset`] succeeds.

use lift_common::control::command::MovementRequest;
use lift_common::control::outcome::{
    FaultReport, FaultTrigger, MovementOutcome, PreflightError, StopReason,
};
use lift_common::control::state::ControllerState;
use lift_common::frame::config::{LiftConfig, MovementLimits, PollConfig};
use lift_common::frame::{DirectionFlags, FrameLayout, FrameSnapshot};
use lift_common::port::{DevicePort, PortError, read_direction_flags, read_frame};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::command::abort::AbortSignal;
use crate::command::status::StatusBoard;
use crate::command::surface::ControllerRequest;
use crate::safety::checks::{
    PollVerdict, evaluate_poll, is_level, is_within_range, is_within_tolerance, primary_position,
};
use crate::safety::stop::stop_all;
use crate::state::machine::{ControllerEvent, ControllerStateMachine, TransitionResult};
use crate::state::session::MovementSession;

/// Errors from [`MovementController::reset`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResetError {
    /// Only a faulted controller can be reset.
    #[error("controller is not faulted ({0})")]
    NotFaulted(ControllerState),

    /// The re-issued stop failed; the controller stays faulted.
    #[error("stop could not be confirmed: {0}")]
    StopFailed(PortError),
}

/// Drives movement requests against one frame.
///
/// # Known race
///
/// The direction flag read during preflight and the direction write that
/// starts the session are two separate requests. An external actor (a
/// physical panel) asserting a flag in between is not detected until the
/// frame stops converging. The device protocol offers no reservation
/// primitive, so this window is accepted.
pub struct MovementController<P> {
    port: P,
    layout: FrameLayout,
    flags: DirectionFlags,
    limits: MovementLimits,
    poll: PollConfig,
    machine: ControllerStateMachine,
    abort: AbortSignal,
    board: StatusBoard,
}

impl<P: DevicePort> MovementController<P> {
    /// Create an idle controller over `port`.
    pub fn new(port: P, config: &LiftConfig, abort: AbortSignal, board: StatusBoard) -> Self {
        board.set_state(ControllerState::Idle);
        Self {
            port,
            layout: config.layout(),
            flags: config.direction_flags(),
            limits: config.limits,
            poll: config.poll,
            machine: ControllerStateMachine::new(),
            abort,
            board,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> ControllerState {
        self.machine.state()
    }

    /// Status board this controller publishes to.
    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    /// Serve requests until every sender is dropped, then return the port.
    pub async fn run(mut self, mut requests: mpsc::Receiver<ControllerRequest>) -> P {
        info!("Movement controller running on '{}' port", self.port.name());
        while let Some(request) = requests.recv().await {
            match request {
                ControllerRequest::Move(request) => {
                    self.execute(request).await;
                }
                ControllerRequest::Reset => {
                    if let Err(err) = self.reset().await {
                        warn!("Fault reset failed: {}", err);
                    }
                }
            }
        }
        info!("Command surface closed, movement controller exiting");
        self.port
    }

    /// Handle one movement request to completion.
    pub async fn execute(&mut self, request: MovementRequest) -> MovementOutcome {
        if let TransitionResult::Rejected(reason) =
            self.machine.handle_event(ControllerEvent::Request)
        {
            let state = self.machine.state();
            warn!(%request, %state, "Request refused: {}", reason);
            let outcome = MovementOutcome::Rejected(PreflightError::NotReady { state });
            self.board.settle(state, &outcome, false);
            return outcome;
        }
        self.board.set_state(ControllerState::Preflight);
        info!(%request, "Movement request accepted");

        let (outcome, session_ran) = match self.preflight(request).await {
            Ok(session) => (self.drive(session).await, true),
            Err(outcome) => (outcome, false),
        };

        match outcome.class() {
            None => info!(%outcome, "Request finished"),
            Some(_) if outcome.is_fault() => {
                error!(%outcome, "Controller faulted, reset required")
            }
            Some(class) => warn!(?class, %outcome, "Request finished with error"),
        }
        self.board.settle(self.machine.state(), &outcome, session_ran);
        outcome
    }

    /// Clear a fault by re-issuing the stop writes.
    pub async fn reset(&mut self) -> Result<(), ResetError> {
        let state = self.machine.state();
        if state != ControllerState::Faulted {
            // Undo a claim the surface made on a state this controller left.
            self.board.set_state(state);
            return Err(ResetError::NotFaulted(state));
        }
        info!("Resetting fault: re-issuing stop");
        self.apply(ControllerEvent::ResetRequested);
        match stop_all(&mut self.port, &self.flags).await {
            Ok(()) => {
                self.apply(ControllerEvent::StopConfirmed);
                self.board.set_state(self.machine.state());
                info!("Fault cleared, controller idle");
                Ok(())
            }
            Err(err) => {
                self.apply(ControllerEvent::StopFailed);
                error!("Fault reset failed, still faulted: {}", err);
                let outcome = MovementOutcome::Faulted(FaultReport {
                    trigger: FaultTrigger::Reset,
                    error: err.clone(),
                    frame: None,
                });
                self.board.settle(self.machine.state(), &outcome, false);
                Err(ResetError::StopFailed(err))
            }
        }
    }

    // ─── Preflight ──────────────────────────────────────────────────

    /// Run the preconditions. `Err` carries the terminal outcome; the state
    /// machine is already back in Idle or Faulted.
    async fn preflight(
        &mut self,
        request: MovementRequest,
    ) -> Result<MovementSession, MovementOutcome> {
        if !self.limits.accepts_target(request.target) {
            let (min, max) = self.limits.target_bounds();
            return Err(self.reject(PreflightError::TargetOutOfRange {
                target: request.target,
                min,
                max,
            }));
        }

        let flags = match read_direction_flags(&mut self.port, &self.flags).await {
            Ok(flags) => flags,
            Err(err) => return Err(self.preflight_port_error(err, None).await),
        };
        if flags.any() {
            return Err(self.reject(PreflightError::AlreadyMoving {
                move_low: flags.move_low,
                move_high: flags.move_high,
            }));
        }

        let frame = match read_frame(&mut self.port, &self.layout).await {
            Ok(frame) => frame,
            Err(err) => return Err(self.preflight_port_error(err, None).await),
        };
        self.board.set_frame(&frame);

        if !is_within_range(&frame, &self.limits) {
            return Err(self.reject(PreflightError::FrameOutOfRange { frame }));
        }

        if !is_level(&frame, &self.limits) {
            let spread = frame.spread();
            warn!(%frame, spread, "Frame not level at rest, clearing direction flags");
            self.apply(ControllerEvent::StopRequested);
            return Err(match stop_all(&mut self.port, &self.flags).await {
                Ok(()) => {
                    self.apply(ControllerEvent::StopConfirmed);
                    MovementOutcome::Rejected(PreflightError::NotLevel { frame, spread })
                }
                Err(error) => {
                    self.apply(ControllerEvent::StopFailed);
                    MovementOutcome::Faulted(FaultReport {
                        trigger: FaultTrigger::PreflightLevelStop,
                        error,
                        frame: Some(frame),
                    })
                }
            });
        }

        let Some(position) = primary_position(&frame, &self.limits) else {
            let err = PortError::Protocol(format!(
                "snapshot has no reading for primary actuator {}",
                self.limits.primary_actuator
            ));
            return Err(self.preflight_port_error(err, Some(frame)).await);
        };

        match MovementSession::start(request, position) {
            Some(session) if !is_within_tolerance(session.initial_difference(), &self.limits) => {
                Ok(session)
            }
            _ => {
                let difference = i32::from(request.target) - position;
                self.apply(ControllerEvent::AlreadyAtTarget);
                Err(MovementOutcome::AlreadyAtTarget {
                    target: request.target,
                    difference,
                    frame,
                })
            }
        }
    }

    fn reject(&mut self, err: PreflightError) -> MovementOutcome {
        warn!(class = ?err.class(), "Preflight rejected: {}", err);
        self.apply(ControllerEvent::PreconditionFailed);
        MovementOutcome::Rejected(err)
    }

    /// Transport errors before any write end the request; anything else
    /// means the device cannot be trusted.
    async fn preflight_port_error(
        &mut self,
        err: PortError,
        frame: Option<FrameSnapshot>,
    ) -> MovementOutcome {
        if err.is_transport() {
            return self.reject(PreflightError::Transport(err));
        }
        error!("Unusable device reply during preflight: {}", err);
        self.apply(ControllerEvent::StopRequested);
        if let Err(stop_err) = stop_all(&mut self.port, &self.flags).await {
            error!("Best-effort stop failed: {}", stop_err);
        }
        self.apply(ControllerEvent::DeviceFault);
        MovementOutcome::Faulted(FaultReport {
            trigger: FaultTrigger::DeviceReply,
            error: err,
            frame,
        })
    }

    // ─── Moving ─────────────────────────────────────────────────────

    async fn drive(&mut self, mut session: MovementSession) -> MovementOutcome {
        let direction = session.direction();
        let address = self.flags.address_for(direction);
        if let Err(err) = self.port.write_flag(address, true).await {
            error!("Direction write to flag {} failed: {}", address, err);
            return self.finish_session(session, StopReason::PortFailure(err)).await;
        }
        self.apply(ControllerEvent::DirectionAsserted);
        info!(
            target = session.target(),
            %direction,
            initial_difference = session.initial_difference(),
            flag = address,
            "Movement started"
        );

        let mut pacing = self.poll.min_interval().map(|period| {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let reason = loop {
            if let Some(ticker) = pacing.as_mut() {
                ticker.tick().await;
            }
            if self.abort.take() {
                break StopReason::Aborted;
            }
            let frame = match read_frame(&mut self.port, &self.layout).await {
                Ok(frame) => frame,
                Err(err) => break StopReason::PortFailure(err),
            };
            self.board.set_frame(&frame);
            let verdict = evaluate_poll(&frame, &session, &self.limits);
            session.record_poll(frame);
            match verdict {
                PollVerdict::Stop(reason) => break reason,
                PollVerdict::Continue { difference } => {
                    debug!(poll = session.polls(), difference, "Moving")
                }
            }
            if self.poll.max_polls > 0 && session.polls() >= self.poll.max_polls {
                break StopReason::PollBudgetExhausted;
            }
        };

        self.finish_session(session, reason).await
    }

    async fn finish_session(
        &mut self,
        session: MovementSession,
        reason: StopReason,
    ) -> MovementOutcome {
        let frame = session.last_frame().cloned();
        match (&reason, &frame) {
            (StopReason::ReachedTarget | StopReason::Aborted, _) => {
                info!(polls = session.polls(), "Stopping: {}", reason)
            }
            (_, Some(frame)) => warn!(%frame, polls = session.polls(), "Stopping: {}", reason),
            (_, None) => warn!(polls = session.polls(), "Stopping: {}", reason),
        }

        self.apply(ControllerEvent::StopRequested);
        match stop_all(&mut self.port, &self.flags).await {
            Err(error) => {
                self.apply(ControllerEvent::StopFailed);
                MovementOutcome::Faulted(FaultReport {
                    trigger: FaultTrigger::SessionStop(reason),
                    error,
                    frame,
                })
            }
            Ok(()) => match reason {
                StopReason::PortFailure(error) if !error.is_transport() => {
                    self.apply(ControllerEvent::DeviceFault);
                    MovementOutcome::Faulted(FaultReport {
                        trigger: FaultTrigger::DeviceReply,
                        error,
                        frame,
                    })
                }
                reason => {
                    self.apply(ControllerEvent::StopConfirmed);
                    MovementOutcome::Stopped(session.finish(reason))
                }
            },
        }
    }

    // ─── Transitions ────────────────────────────────────────────────

    /// Busy states are published at once; Idle and Faulted are published
    /// with the outcome that settles the request.
    fn apply(&mut self, event: ControllerEvent) {
        let from = self.machine.state();
        match self.machine.handle_event(event) {
            TransitionResult::Ok(to) => {
                info!(%from, %to, ?event, "Controller transition");
                if to.is_busy() {
                    self.board.set_state(to);
                }
            }
            TransitionResult::Rejected(reason) => {
                error!(%from, ?event, "Invalid controller transition: {}", reason);
            }
        }
    }
}
