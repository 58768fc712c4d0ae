//! Controller lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the movement controller.
///
/// `Idle → Preflight → Moving → Stopping → Idle`, plus `Faulted`, which is
/// left only through an explicit reset or a process restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerState {
    /// No session; ready for a request.
    #[default]
    Idle,
    /// Request accepted, preconditions being checked.
    Preflight,
    /// Direction flag asserted, polling positions.
    Moving,
    /// Clearing both direction flags.
    Stopping,
    /// Stop could not be confirmed; actuator state unknown.
    Faulted,
}

impl ControllerState {
    /// Whether a session is in progress (preflight through stopping).
    #[inline]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Preflight | Self::Moving | Self::Stopping)
    }

    /// Lowercase name used in logs and status replies.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preflight => "preflight",
            Self::Moving => "moving",
            Self::Stopping => "stopping",
            Self::Faulted => "faulted",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
