//! Controller-facing shared types.
//!
//! - [`state`] - Controller lifecycle state
//! - [`command`] - Presets, movement requests and the relay wire shape
//! - [`outcome`] - Session results and the error taxonomy

pub mod command;
pub mod outcome;
pub mod state;
