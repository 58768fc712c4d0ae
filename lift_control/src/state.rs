//! State machine module root.
//!
//! - [`machine`] - Controller lifecycle transitions
//! - [`session`] - The record of one movement in progress

pub mod machine;
pub mod session;
