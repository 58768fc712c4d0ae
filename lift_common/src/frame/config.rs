//! Deployment configuration for one lift frame.
//!
//! Everything that differs between installations lives here: device
//! address, register layout, sign threshold, travel limits, presets and
//! poll pacing. Loaded once at startup, immutable afterwards.
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "lift-stage-left"
//!
//! [device]
//! host = "10.36.112.92"
//! port = 502
//!
//! [frame]
//! sign_threshold = 0xB000
//!
//! [limits]
//! min_position = 0
//! max_position = 1000
//! tolerance = 50
//! target_window = "extended"
//!
//! [presets]
//! low = 0
//! high = 1000
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{ConfigError, SharedConfig, Validate};
use crate::consts::{
    ACTUATOR_COUNT, DEVICE_TIMEOUT_MS, MAX_ACTUATORS, MODBUS_TCP_PORT, MOVE_HIGH_FLAG,
    MOVE_LOW_FLAG, POLL_MIN_INTERVAL_MS, POSITION_REGISTER_BASE, POSITION_REGISTER_STRIDE,
    SIGN_THRESHOLD_TWOS_COMPLEMENT,
};

use super::codec::PositionCodec;
use super::layout::FrameLayout;
use super::types::DirectionFlags;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete deployment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LiftConfig {
    /// Service name and log level.
    pub shared: SharedConfig,
    /// Field device connection.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Register layout of the frame.
    #[serde(default)]
    pub frame: FrameConfig,
    /// Travel limits and tolerance.
    pub limits: MovementLimits,
    /// Named target positions.
    pub presets: PresetTable,
    /// Poll loop pacing.
    #[serde(default)]
    pub poll: PollConfig,
    /// In-process simulated frame (used by the `simulation` driver).
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl LiftConfig {
    /// Register layout derived from the `[frame]` section.
    pub fn layout(&self) -> FrameLayout {
        self.frame.layout()
    }

    /// Direction flag addresses derived from the `[frame]` section.
    pub fn direction_flags(&self) -> DirectionFlags {
        self.frame.direction_flags()
    }
}

impl Validate for LiftConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.device.validate()?;
        self.frame.validate()?;
        self.limits.validate(self.frame.actuator_count)?;
        self.presets.validate(&self.limits)?;
        self.simulation.validate(self.frame.actuator_count)?;
        Ok(())
    }
}

fn invalid(msg: String) -> ConfigError {
    ConfigError::ValidationError(msg)
}

// ─── Device ─────────────────────────────────────────────────────────

/// Field device connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Driver name (`modbus` or `simulation`).
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Device host name or IP address.
    #[serde(default)]
    pub host: String,
    /// Device TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Modbus unit identifier.
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    /// Per-request timeout [ms].
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Reconnect policy for failed reads.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_driver() -> String {
    "modbus".to_string()
}
fn default_port() -> u16 {
    MODBUS_TCP_PORT
}
fn default_unit_id() -> u8 {
    1
}
fn default_timeout_ms() -> u64 {
    DEVICE_TIMEOUT_MS
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            host: String::new(),
            port: default_port(),
            unit_id: default_unit_id(),
            timeout_ms: default_timeout_ms(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Per-request timeout.
    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.driver == "modbus" && self.host.trim().is_empty() {
            return Err(invalid("device.host is required for the modbus driver".into()));
        }
        if self.timeout_ms == 0 {
            return Err(invalid("device.timeout_ms must be > 0".into()));
        }
        self.reconnect.validate()
    }
}

/// Reconnect-with-backoff policy applied by the port to read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconnectConfig {
    /// Retries after the first failed attempt (0 disables retrying).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay before the first retry [ms]; doubles per retry.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Cap on the retry delay [ms].
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    100
}
fn default_max_backoff_ms() -> u64 {
    2000
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl ReconnectConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(invalid(format!(
                "device.reconnect.initial_backoff_ms {} exceeds max_backoff_ms {}",
                self.initial_backoff_ms, self.max_backoff_ms
            )));
        }
        Ok(())
    }
}

// ─── Frame ──────────────────────────────────────────────────────────

/// Register map of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameConfig {
    /// Number of actuators.
    #[serde(default = "default_actuator_count")]
    pub actuator_count: usize,
    /// First position register.
    #[serde(default = "default_register_base")]
    pub register_base: u16,
    /// Distance between position registers.
    #[serde(default = "default_register_stride")]
    pub register_stride: u16,
    /// Flag driving toward the low bound.
    #[serde(default = "default_move_low_flag")]
    pub move_low_flag: u16,
    /// Flag driving toward the high bound.
    #[serde(default = "default_move_high_flag")]
    pub move_high_flag: u16,
    /// Words at or above this value decode as negative positions.
    #[serde(default = "default_sign_threshold")]
    pub sign_threshold: u16,
}

fn default_actuator_count() -> usize {
    ACTUATOR_COUNT
}
fn default_register_base() -> u16 {
    POSITION_REGISTER_BASE
}
fn default_register_stride() -> u16 {
    POSITION_REGISTER_STRIDE
}
fn default_move_low_flag() -> u16 {
    MOVE_LOW_FLAG
}
fn default_move_high_flag() -> u16 {
    MOVE_HIGH_FLAG
}
fn default_sign_threshold() -> u16 {
    SIGN_THRESHOLD_TWOS_COMPLEMENT
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            actuator_count: default_actuator_count(),
            register_base: default_register_base(),
            register_stride: default_register_stride(),
            move_low_flag: default_move_low_flag(),
            move_high_flag: default_move_high_flag(),
            sign_threshold: default_sign_threshold(),
        }
    }
}

impl FrameConfig {
    /// Register layout for batch position reads.
    pub fn layout(&self) -> FrameLayout {
        FrameLayout {
            register_base: self.register_base,
            register_stride: self.register_stride,
            actuator_count: self.actuator_count,
            codec: PositionCodec::new(self.sign_threshold),
        }
    }

    /// Direction flag addresses.
    pub fn direction_flags(&self) -> DirectionFlags {
        DirectionFlags {
            move_low: self.move_low_flag,
            move_high: self.move_high_flag,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.actuator_count == 0 || self.actuator_count > MAX_ACTUATORS {
            return Err(invalid(format!(
                "frame.actuator_count {} out of range [1, {}]",
                self.actuator_count, MAX_ACTUATORS
            )));
        }
        if self.register_stride == 0 {
            return Err(invalid("frame.register_stride must be >= 1".into()));
        }
        if self.move_low_flag == self.move_high_flag {
            return Err(invalid(format!(
                "frame.move_low_flag and frame.move_high_flag share address {}",
                self.move_low_flag
            )));
        }
        if self.sign_threshold == 0 {
            return Err(invalid(
                "frame.sign_threshold 0 would decode every position as negative".into(),
            ));
        }
        Ok(())
    }
}

// ─── Limits ─────────────────────────────────────────────────────────

/// Acceptance window applied to a requested target during preflight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetWindow {
    /// Target must lie in `[min_position, max_position]`.
    #[default]
    Strict,
    /// Target may lie in `[min_position - tolerance, max_position + tolerance]`.
    Extended,
}

/// Travel limits of the frame.
///
/// `tolerance` is the single margin used for target-reached, levelness and
/// range slack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MovementLimits {
    /// Lowest allowed position.
    pub min_position: i16,
    /// Highest allowed position.
    pub max_position: i16,
    /// Margin for target, levelness and range checks.
    pub tolerance: u16,
    /// Actuator whose position defines the frame position.
    #[serde(default)]
    pub primary_actuator: usize,
    /// Preflight acceptance window for targets.
    #[serde(default)]
    pub target_window: TargetWindow,
}

impl MovementLimits {
    /// Tolerance as a signed value for position arithmetic.
    #[inline]
    pub const fn tolerance(&self) -> i32 {
        self.tolerance as i32
    }

    /// Positions every actuator must stay within, inclusive.
    #[inline]
    pub const fn range_bounds(&self) -> (i32, i32) {
        (
            self.min_position as i32 - self.tolerance(),
            self.max_position as i32 + self.tolerance(),
        )
    }

    /// Targets accepted by preflight, inclusive.
    #[inline]
    pub const fn target_bounds(&self) -> (i32, i32) {
        match self.target_window {
            TargetWindow::Strict => (self.min_position as i32, self.max_position as i32),
            TargetWindow::Extended => self.range_bounds(),
        }
    }

    /// Whether preflight accepts `target`.
    #[inline]
    pub const fn accepts_target(&self, target: i16) -> bool {
        let (lo, hi) = self.target_bounds();
        let target = target as i32;
        target >= lo && target <= hi
    }

    fn validate(&self, actuator_count: usize) -> Result<(), ConfigError> {
        if self.min_position >= self.max_position {
            return Err(invalid(format!(
                "limits.min_position {} must be below limits.max_position {}",
                self.min_position, self.max_position
            )));
        }
        if self.tolerance == 0 {
            return Err(invalid("limits.tolerance must be > 0".into()));
        }
        if self.primary_actuator >= actuator_count {
            return Err(invalid(format!(
                "limits.primary_actuator {} out of range [0, {})",
                self.primary_actuator, actuator_count
            )));
        }
        Ok(())
    }
}

// ─── Presets ────────────────────────────────────────────────────────

/// Named target positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetTable {
    /// Target of the `low` preset.
    pub low: i16,
    /// Target of the `high` preset.
    pub high: i16,
}

impl PresetTable {
    fn validate(&self, limits: &MovementLimits) -> Result<(), ConfigError> {
        for (name, target) in [("low", self.low), ("high", self.high)] {
            if !limits.accepts_target(target) {
                let (lo, hi) = limits.target_bounds();
                return Err(invalid(format!(
                    "presets.{name} = {target} outside target window [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }
}

// ─── Poll ───────────────────────────────────────────────────────────

/// Poll loop pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Minimum delay between poll rounds [ms]; 0 polls back-to-back.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    /// Poll rounds after which a session is stopped; 0 disables the bound.
    #[serde(default)]
    pub max_polls: u32,
}

fn default_min_interval_ms() -> u64 {
    POLL_MIN_INTERVAL_MS
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
            max_polls: 0,
        }
    }
}

impl PollConfig {
    /// Minimum delay between poll rounds, `None` when disabled.
    pub fn min_interval(&self) -> Option<Duration> {
        (self.min_interval_ms > 0).then(|| Duration::from_millis(self.min_interval_ms))
    }
}

// ─── Simulation ─────────────────────────────────────────────────────

/// Parameters of the in-process simulated frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Initial actuator positions; empty starts every actuator at 0.
    #[serde(default)]
    pub start_positions: Vec<i32>,
    /// Travel per poll round while a direction flag is set.
    #[serde(default = "default_step_per_poll")]
    pub step_per_poll: i32,
    /// Extra per-actuator travel per poll (models a lagging servo).
    #[serde(default)]
    pub drift: Vec<i32>,
}

fn default_step_per_poll() -> i32 {
    25
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_positions: Vec::new(),
            step_per_poll: default_step_per_poll(),
            drift: Vec::new(),
        }
    }
}

impl SimulationConfig {
    fn validate(&self, actuator_count: usize) -> Result<(), ConfigError> {
        for (field, len) in [
            ("start_positions", self.start_positions.len()),
            ("drift", self.drift.len()),
        ] {
            if len != 0 && len != actuator_count {
                return Err(invalid(format!(
                    "simulation.{field} has {len} entries, expected 0 or {actuator_count}"
                )));
            }
        }
        if self.step_per_poll <= 0 {
            return Err(invalid("simulation.step_per_poll must be > 0".into()));
        }
        Ok(())
    }
}
