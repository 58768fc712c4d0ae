//! Lift Common Library
//!
//! Shared types, configuration loading and the device port contract used by
//! every crate of the lift frame controller workspace.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Protocol defaults and numeric limits
//! - [`frame`] - Actuator readings, snapshots, position codec, deployment config
//! - [`port`] - `DevicePort` trait and transport errors
//! - [`control`] - Controller state, requests and movement outcomes
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use lift_common::prelude::*;
//!
//! let codec = PositionCodec::new(0x8000);
//! assert_eq!(codec.decode(0xFFFF), -1);
//! ```

pub mod config;
pub mod consts;
pub mod control;
pub mod frame;
pub mod port;
pub mod prelude;
