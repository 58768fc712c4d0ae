//! Raw register word → signed position conversion.
//!
//! The field device reports positions as unsigned 16-bit words. Words at or
//! above the sign threshold represent negative positions (`raw - 0x10000`).
//! The threshold is a deployment parameter: `0x8000` is plain two's
//! complement, `0xB000` leaves extra positive headroom above the travel range.
//!
//! Decoded positions are `i32`: with a threshold above `0x8000` the words
//! between `0x8000` and the threshold are positive and do not fit an `i16`.

use serde::{Deserialize, Serialize};

use crate::consts::SIGN_THRESHOLD_TWOS_COMPLEMENT;

/// Decodes position registers using a configurable sign threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCodec {
    sign_threshold: u16,
}

impl PositionCodec {
    /// Create a codec with the given sign threshold.
    pub const fn new(sign_threshold: u16) -> Self {
        Self { sign_threshold }
    }

    /// Configured sign threshold.
    #[inline]
    pub const fn sign_threshold(&self) -> u16 {
        self.sign_threshold
    }

    /// Decode one register word. Total over all `u16` inputs.
    #[inline]
    pub const fn decode(&self, raw: u16) -> i32 {
        if raw >= self.sign_threshold {
            raw as i32 - 0x10000
        } else {
            raw as i32
        }
    }
}

impl Default for PositionCodec {
    fn default() -> Self {
        Self::new(SIGN_THRESHOLD_TWOS_COMPLEMENT)
    }
}
