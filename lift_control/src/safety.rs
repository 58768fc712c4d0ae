//! Safety module root.
//!
//! Invariant checks over frame snapshots and the stop write sequence.

pub mod checks;
pub mod stop;
