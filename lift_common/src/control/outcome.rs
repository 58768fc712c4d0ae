//! Movement outcomes and the error taxonomy.
//!
//! Every request handled by the controller ends in exactly one
//! [`MovementOutcome`]. Outcomes carry the snapshot that decided them so the
//! decision can be reconstructed from logs.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::frame::{Direction, FrameSnapshot};
use crate::port::PortError;

use super::state::ControllerState;

/// Error classes reported to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Target outside the configured window. Session never created.
    Validation,
    /// Device state does not allow a movement to start.
    Precondition,
    /// Interlock tripped while moving; resolved by a stop.
    RuntimeSafety,
    /// Device unreachable or reply unusable.
    Transport,
}

/// Reasons a request is refused before any direction flag is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightError {
    /// The controller is not idle.
    #[error("controller not ready ({state})")]
    NotReady {
        /// State at the time of the request.
        state: ControllerState,
    },

    /// Target outside the accepted window.
    #[error("target {target} outside accepted window [{min}, {max}]")]
    TargetOutOfRange {
        /// Requested target.
        target: i16,
        /// Lowest accepted target.
        min: i32,
        /// Highest accepted target.
        max: i32,
    },

    /// A direction flag is already asserted by another actor.
    #[error("device already moving (move_low={move_low}, move_high={move_high})")]
    AlreadyMoving {
        /// Move-toward-low flag state.
        move_low: bool,
        /// Move-toward-high flag state.
        move_high: bool,
    },

    /// At least one actuator is outside the travel range.
    #[error("frame out of range before movement: {frame}")]
    FrameOutOfRange {
        /// Snapshot that failed the range check.
        frame: FrameSnapshot,
    },

    /// Actuators disagree by more than the tolerance. Both flags were cleared.
    #[error("frame not level (spread {spread}): {frame}")]
    NotLevel {
        /// Snapshot that failed the level check.
        frame: FrameSnapshot,
        /// Highest minus lowest actuator position.
        spread: i32,
    },

    /// A precondition read failed.
    #[error("preflight read failed: {0}")]
    Transport(PortError),
}

impl PreflightError {
    /// Error class of this rejection.
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::TargetOutOfRange { .. } => ErrorClass::Validation,
            Self::NotReady { .. }
            | Self::AlreadyMoving { .. }
            | Self::FrameOutOfRange { .. }
            | Self::NotLevel { .. } => ErrorClass::Precondition,
            Self::Transport(_) => ErrorClass::Transport,
        }
    }
}

/// Why a moving session was stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Primary actuator within tolerance of the target.
    ReachedTarget,
    /// Primary actuator crossed the target between two polls.
    Overshot,
    /// Actuators drifted apart by more than the tolerance.
    LevelLost,
    /// An actuator left the travel range.
    RangeLost,
    /// Abort requested through the command surface.
    Aborted,
    /// Configured poll budget used up before the target was reached.
    PollBudgetExhausted,
    /// A read or the direction write failed mid-session.
    PortFailure(PortError),
}

impl StopReason {
    /// Error class, `None` for a normal completion or an operator abort.
    pub const fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::ReachedTarget | Self::Aborted => None,
            Self::Overshot | Self::LevelLost | Self::RangeLost | Self::PollBudgetExhausted => {
                Some(ErrorClass::RuntimeSafety)
            }
            Self::PortFailure(_) => Some(ErrorClass::Transport),
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReachedTarget => f.write_str("reached target"),
            Self::Overshot => f.write_str("overshot target"),
            Self::LevelLost => f.write_str("not level during movement"),
            Self::RangeLost => f.write_str("out of range during movement"),
            Self::Aborted => f.write_str("aborted"),
            Self::PollBudgetExhausted => f.write_str("poll budget exhausted"),
            Self::PortFailure(err) => write!(f, "port failure during movement: {err}"),
        }
    }
}

/// Summary of a session that ran and was stopped cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    /// Session target.
    pub target: i16,
    /// Travel direction.
    pub direction: Direction,
    /// `target - primary position` at session start.
    pub initial_difference: i32,
    /// Stop reason.
    pub reason: StopReason,
    /// Last snapshot taken, if any.
    pub frame: Option<FrameSnapshot>,
    /// Poll rounds executed.
    pub polls: u32,
}

/// What the controller was doing when it faulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultTrigger {
    /// Stopping a session for the given reason.
    SessionStop(StopReason),
    /// Clearing flags after a non-level preflight frame.
    PreflightLevelStop,
    /// Re-issuing the stop during a reset.
    Reset,
    /// Handling a device reply that could not be used.
    DeviceReply,
}

impl fmt::Display for FaultTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionStop(reason) => write!(f, "stopping after {reason}"),
            Self::PreflightLevelStop => f.write_str("clearing flags on a non-level frame"),
            Self::Reset => f.write_str("resetting a fault"),
            Self::DeviceReply => f.write_str("handling an unusable device reply"),
        }
    }
}

/// Fault details: the actuator state is unknown until a reset succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    /// Activity that failed.
    pub trigger: FaultTrigger,
    /// Port error that made the actuator state unknown.
    pub error: PortError,
    /// Last snapshot taken, if any.
    pub frame: Option<FrameSnapshot>,
}

/// Result of one handled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementOutcome {
    /// Refused during preflight; no session was created.
    Rejected(PreflightError),
    /// Already within tolerance of the target; nothing to do.
    AlreadyAtTarget {
        /// Requested target.
        target: i16,
        /// `target - primary position`.
        difference: i32,
        /// Snapshot used for the decision.
        frame: FrameSnapshot,
    },
    /// A session ran and both flags were cleared.
    Stopped(SessionReport),
    /// The stop could not be confirmed.
    Faulted(FaultReport),
}

impl MovementOutcome {
    /// Error class, `None` for completions, aborts and no-ops.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Rejected(err) => Some(err.class()),
            Self::AlreadyAtTarget { .. } => None,
            Self::Stopped(report) => report.reason.class(),
            Self::Faulted(_) => Some(ErrorClass::Transport),
        }
    }

    /// Whether the frame ended at the requested target.
    pub fn reached_target(&self) -> bool {
        matches!(
            self,
            Self::AlreadyAtTarget { .. }
                | Self::Stopped(SessionReport {
                    reason: StopReason::ReachedTarget,
                    ..
                })
        )
    }

    /// Whether the controller is faulted after this outcome.
    #[inline]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Faulted(_))
    }

    /// Snapshot that decided the outcome, if one was taken.
    pub fn frame(&self) -> Option<&FrameSnapshot> {
        match self {
            Self::Rejected(PreflightError::FrameOutOfRange { frame })
            | Self::Rejected(PreflightError::NotLevel { frame, .. })
            | Self::AlreadyAtTarget { frame, .. } => Some(frame),
            Self::Rejected(_) => None,
            Self::Stopped(report) => report.frame.as_ref(),
            Self::Faulted(report) => report.frame.as_ref(),
        }
    }
}

impl fmt::Display for MovementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(err) => write!(f, "rejected: {err}"),
            Self::AlreadyAtTarget {
                target, difference, ..
            } => write!(f, "already at target {target} (difference {difference})"),
            Self::Stopped(report) => write!(
                f,
                "{} moving {} toward {} after {} polls",
                report.reason, report.direction, report.target, report.polls
            ),
            Self::Faulted(report) => {
                write!(f, "faulted while {}: {}", report.trigger, report.error)
            }
        }
    }
}
