//! JSON views printed by the binary.

use lift_common::control::outcome::{ErrorClass, MovementOutcome};
use lift_common::control::state::ControllerState;
use lift_common::frame::FrameSnapshot;
use lift_common::port::FlagState;
use lift_control::ControllerStatus;
use serde::Serialize;

/// Outcome of the most recent request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeView {
    pub summary: String,
    pub reached_target: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ErrorClass>,
}

impl From<&MovementOutcome> for OutcomeView {
    fn from(outcome: &MovementOutcome) -> Self {
        Self {
            summary: outcome.to_string(),
            reached_target: outcome.reached_target(),
            class: outcome.class(),
        }
    }
}

/// Controller status as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub state: ControllerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<OutcomeView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<i32>>,
    pub sessions_completed: u64,
}

impl From<&ControllerStatus> for StatusView {
    fn from(status: &ControllerStatus) -> Self {
        Self {
            state: status.state,
            last_outcome: status.last_outcome.as_ref().map(OutcomeView::from),
            positions: status.last_frame.as_ref().map(positions),
            sessions_completed: status.sessions_completed,
        }
    }
}

/// One-shot read of the device, without a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceView {
    pub move_low: bool,
    pub move_high: bool,
    pub positions: Vec<i32>,
    pub spread: i32,
}

impl DeviceView {
    pub fn new(flags: FlagState, frame: &FrameSnapshot) -> Self {
        Self {
            move_low: flags.move_low,
            move_high: flags.move_high,
            positions: positions(frame),
            spread: frame.spread(),
        }
    }
}

fn positions(frame: &FrameSnapshot) -> Vec<i32> {
    frame.positions().collect()
}
