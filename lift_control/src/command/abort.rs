//! Abort signal shared between the command surface and the controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single cooperative abort flag.
///
/// Raised from outside the controller, consumed by the poll loop. Consuming
/// clears it, so an abort can never carry over into a later session.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    raised: Arc<AtomicBool>,
}

impl AbortSignal {
    /// Create a cleared signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the active session to stop at the next poll boundary.
    #[inline]
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Consume the signal. Returns whether it was raised.
    #[inline]
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Drop a pending abort without acting on it.
    #[inline]
    pub fn clear(&self) {
        self.raised.store(false, Ordering::Release);
    }

    /// Whether an abort is pending.
    #[inline]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}
