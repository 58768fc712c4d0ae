//! Protocol defaults and numeric limits for the lift workspace.
//!
//! Single source of truth for register addresses and default timings.
//! Every value here can be overridden by deployment configuration.

use static_assertions::const_assert;

/// Default flag (coil) address commanding motion toward the low bound.
pub const MOVE_LOW_FLAG: u16 = 1;

/// Default flag (coil) address commanding motion toward the high bound.
pub const MOVE_HIGH_FLAG: u16 = 2;

/// Default first holding register of the position block.
pub const POSITION_REGISTER_BASE: u16 = 0;

/// Default distance between consecutive position registers.
///
/// Odd registers carry sign words on some deployments and are skipped.
pub const POSITION_REGISTER_STRIDE: u16 = 2;

/// Default number of actuators on the frame.
pub const ACTUATOR_COUNT: usize = 4;

/// Upper bound on configured actuators (one batch read must stay under the
/// 125-register limit of a single holding-register request).
pub const MAX_ACTUATORS: usize = 32;

/// Sign threshold for plain two's-complement position words.
pub const SIGN_THRESHOLD_TWOS_COMPLEMENT: u16 = 0x8000;

/// Sign threshold used by deployments with extra positive headroom.
pub const SIGN_THRESHOLD_EXTENDED: u16 = 0xB000;

/// Default Modbus TCP port.
pub const MODBUS_TCP_PORT: u16 = 502;

/// Default per-request timeout in milliseconds.
pub const DEVICE_TIMEOUT_MS: u64 = 1000;

/// Default minimum interval between two poll rounds in milliseconds.
pub const POLL_MIN_INTERVAL_MS: u64 = 50;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lift/lift.toml";

const_assert!(MOVE_LOW_FLAG != MOVE_HIGH_FLAG);
const_assert!(ACTUATOR_COUNT <= MAX_ACTUATORS);
const_assert!(SIGN_THRESHOLD_TWOS_COMPLEMENT < SIGN_THRESHOLD_EXTENDED);
