//! Command processing root.
//!
//! Abort signalling, the shared status board, and the command surface used
//! by the process glue.

pub mod abort;
pub mod status;
pub mod surface;

pub use abort::AbortSignal;
pub use status::{ControllerStatus, StatusBoard};
pub use surface::{AbortAck, ControllerHandle, ControllerRequest, Rejection, spawn_controller};
