//! # Lift Control Library
//!
//! Movement controller for a multi-actuator lift frame. One task owns the
//! device port and drives every request through an explicit state machine:
//! preflight checks, a single direction command, a polling loop guarded by
//! safety invariants, and a stop sequence that always clears both direction
//! flags.
//!
//! ## Layers
//!
//! 1. **safety** - Pure invariant checks and the stop write sequence
//! 2. **state** - Controller state machine and the per-session record
//! 3. **controller** - `MovementController`, the only owner of the port
//! 4. **command** - Abort signal, status board and the command surface
//!
//! ## Concurrency
//!
//! Requests are never queued: the command surface claims the idle slot
//! before handing a request to the controller task and rejects everything
//! else. Abort is cooperative and takes effect at the next poll boundary.

pub mod command;
pub mod controller;
pub mod safety;
pub mod state;

pub use command::{AbortAck, AbortSignal, ControllerHandle, ControllerStatus, Rejection, spawn_controller};
pub use controller::MovementController;
