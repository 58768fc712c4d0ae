//! Prelude module for common re-exports.
//!
//! `use lift_common::prelude::*;` brings in the types every lift crate
//! touches without listing individual paths.

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig, Validate};
pub use crate::frame::config::{
    DeviceConfig, FrameConfig, LiftConfig, MovementLimits, PollConfig, PresetTable,
    ReconnectConfig, SimulationConfig, TargetWindow,
};

// ─── Frame ──────────────────────────────────────────────────────────
pub use crate::frame::{
    ActuatorReading, Direction, DirectionFlags, FrameError, FrameLayout, FrameSnapshot,
    PositionCodec,
};

// ─── Device Port ────────────────────────────────────────────────────
pub use crate::port::{DevicePort, FlagState, PortError, read_direction_flags, read_frame};

// ─── Control ────────────────────────────────────────────────────────
pub use crate::control::command::{
    MotionCommand, MotionMessage, MovementRequest, Preset, RequestOrigin, UnknownMotion,
    UnknownPreset,
};
pub use crate::control::outcome::{
    ErrorClass, FaultReport, FaultTrigger, MovementOutcome, PreflightError, SessionReport,
    StopReason,
};
pub use crate::control::state::ControllerState;
