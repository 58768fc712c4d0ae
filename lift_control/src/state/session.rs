//! Movement session: exists only between the direction write and the stop.

use lift_common::control::command::MovementRequest;
use lift_common::control::outcome::{SessionReport, StopReason};
use lift_common::frame::{Direction, FrameSnapshot};

/// One movement in progress. Owned exclusively by the controller.
#[derive(Debug, Clone)]
pub struct MovementSession {
    request: MovementRequest,
    direction: Direction,
    initial_difference: i32,
    polls: u32,
    last_frame: Option<FrameSnapshot>,
}

impl MovementSession {
    /// Start a session from the primary actuator's rest position.
    ///
    /// `None` when the frame already sits exactly on the target.
    pub fn start(request: MovementRequest, primary_position: i32) -> Option<Self> {
        let initial_difference = i32::from(request.target) - primary_position;
        let direction = Direction::from_difference(initial_difference)?;
        Some(Self {
            request,
            direction,
            initial_difference,
            polls: 0,
            last_frame: None,
        })
    }

    /// The request that started the session.
    #[inline]
    pub const fn request(&self) -> &MovementRequest {
        &self.request
    }

    /// Target position.
    #[inline]
    pub const fn target(&self) -> i16 {
        self.request.target
    }

    /// Travel direction, fixed for the session.
    #[inline]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// `target - position` at session start.
    #[inline]
    pub const fn initial_difference(&self) -> i32 {
        self.initial_difference
    }

    /// `target - position` for a new primary reading.
    #[inline]
    pub const fn difference(&self, primary_position: i32) -> i32 {
        self.request.target as i32 - primary_position
    }

    /// Poll rounds recorded so far.
    #[inline]
    pub const fn polls(&self) -> u32 {
        self.polls
    }

    /// Latest poll snapshot.
    pub fn last_frame(&self) -> Option<&FrameSnapshot> {
        self.last_frame.as_ref()
    }

    /// Record one poll snapshot.
    pub fn record_poll(&mut self, frame: FrameSnapshot) {
        self.polls += 1;
        self.last_frame = Some(frame);
    }

    /// Close the session into a report.
    pub fn finish(self, reason: StopReason) -> SessionReport {
        SessionReport {
            target: self.request.target,
            direction: self.direction,
            initial_difference: self.initial_difference,
            reason,
            frame: self.last_frame,
            polls: self.polls,
        }
    }
}
