//! Safety invariant checks.
//!
//! Pure predicates over a [`FrameSnapshot`] and the movement limits. The
//! poll loop applies them in a fixed order through [`evaluate_poll`]: level,
//! range, overshoot, tolerance. The first check that fires decides.

use lift_common::control::outcome::StopReason;
use lift_common::frame::FrameSnapshot;
use lift_common::frame::config::MovementLimits;
use lift_common::port::PortError;

use crate::state::session::MovementSession;

/// Every actuator lies in `[min - tol, max + tol]`, bounds inclusive.
pub fn is_within_range(snapshot: &FrameSnapshot, limits: &MovementLimits) -> bool {
    let (lo, hi) = limits.range_bounds();
    snapshot.positions().all(|p| p >= lo && p <= hi)
}

/// Highest and lowest actuator differ by at most the tolerance.
pub fn is_level(snapshot: &FrameSnapshot, limits: &MovementLimits) -> bool {
    snapshot.spread() <= limits.tolerance()
}

/// The sign of `target - position` flipped between `prior` and `current`.
///
/// An exact hit of zero is not an overshoot; the tolerance check reports it.
#[inline]
pub const fn has_overshot(prior: i32, current: i32) -> bool {
    (prior > 0 && current < 0) || (prior < 0 && current > 0)
}

/// `|difference|` strictly below the tolerance.
#[inline]
pub const fn is_within_tolerance(difference: i32, limits: &MovementLimits) -> bool {
    difference.abs() < limits.tolerance()
}

/// Position of the actuator that defines the frame position.
pub fn primary_position(snapshot: &FrameSnapshot, limits: &MovementLimits) -> Option<i32> {
    snapshot.get(limits.primary_actuator).map(|r| r.position)
}

/// Decision for one poll round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollVerdict {
    /// Keep moving; `difference` is the remaining `target - position`.
    Continue {
        /// Remaining distance to the target.
        difference: i32,
    },
    /// End the session.
    Stop(StopReason),
}

/// Apply the invariant checks to one poll snapshot.
pub fn evaluate_poll(
    snapshot: &FrameSnapshot,
    session: &MovementSession,
    limits: &MovementLimits,
) -> PollVerdict {
    if !is_level(snapshot, limits) {
        return PollVerdict::Stop(StopReason::LevelLost);
    }
    if !is_within_range(snapshot, limits) {
        return PollVerdict::Stop(StopReason::RangeLost);
    }
    let Some(position) = primary_position(snapshot, limits) else {
        return PollVerdict::Stop(StopReason::PortFailure(PortError::Protocol(format!(
            "snapshot has no reading for primary actuator {}",
            limits.primary_actuator
        ))));
    };
    let difference = session.difference(position);
    if has_overshot(session.initial_difference(), difference) {
        return PollVerdict::Stop(StopReason::Overshot);
    }
    if is_within_tolerance(difference, limits) {
        return PollVerdict::Stop(StopReason::ReachedTarget);
    }
    PollVerdict::Continue { difference }
}
