//! Presets, movement requests and the relay wire shape.
//!
//! The relay layer forwards client messages of the form
//! `{ "requestedMotion": 1 | 2 | 3 }`: `1` moves to the low preset, `2` to
//! the high preset and `3` aborts the active movement.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::frame::config::PresetTable;

/// Named target position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// The `low` preset.
    Low,
    /// The `high` preset.
    High,
}

impl Preset {
    /// Target position configured for this preset.
    #[inline]
    pub const fn target(self, table: &PresetTable) -> i16 {
        match self {
            Self::Low => table.low,
            Self::High => table.high,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::High => f.write_str("high"),
        }
    }
}

/// Unknown preset name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown preset '{0}'")]
pub struct UnknownPreset(pub String);

impl FromStr for Preset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "high" => Ok(Self::High),
            other => Err(UnknownPreset(other.to_string())),
        }
    }
}

/// Where a movement request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestOrigin {
    /// Resolved from a named preset.
    Preset(Preset),
    /// Explicit position from the operator command line.
    Direct,
}

/// One movement request, consumed once by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRequest {
    /// Target position of the primary actuator.
    pub target: i16,
    /// Request origin, for reporting.
    pub origin: RequestOrigin,
}

impl MovementRequest {
    /// Request the configured position of a preset.
    pub const fn preset(preset: Preset, table: &PresetTable) -> Self {
        Self {
            target: preset.target(table),
            origin: RequestOrigin::Preset(preset),
        }
    }

    /// Request an explicit position.
    pub const fn direct(target: i16) -> Self {
        Self {
            target,
            origin: RequestOrigin::Direct,
        }
    }
}

impl fmt::Display for MovementRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            RequestOrigin::Preset(preset) => write!(f, "preset {preset} (target {})", self.target),
            RequestOrigin::Direct => write!(f, "target {}", self.target),
        }
    }
}

/// Relay message as received on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionMessage {
    /// `1` = low preset, `2` = high preset, `3` = abort.
    #[serde(rename = "requestedMotion")]
    pub requested_motion: u8,
}

/// Decoded relay command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionCommand {
    /// Move to a preset.
    Move(Preset),
    /// Abort the active movement.
    Abort,
}

/// Relay message carried an unsupported `requestedMotion` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported requestedMotion value {0}")]
pub struct UnknownMotion(pub u8);

impl TryFrom<MotionMessage> for MotionCommand {
    type Error = UnknownMotion;

    fn try_from(msg: MotionMessage) -> Result<Self, Self::Error> {
        match msg.requested_motion {
            1 => Ok(Self::Move(Preset::Low)),
            2 => Ok(Self::Move(Preset::High)),
            3 => Ok(Self::Abort),
            other => Err(UnknownMotion(other)),
        }
    }
}
