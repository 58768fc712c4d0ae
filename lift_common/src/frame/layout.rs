//! Position register layout.
//!
//! Positions live in one contiguous holding-register block. Actuator `i`
//! sits at `register_base + i * register_stride`; the words in between are
//! reserved (sign words on some deployments) and are never decoded.

use crate::consts::{ACTUATOR_COUNT, POSITION_REGISTER_BASE, POSITION_REGISTER_STRIDE};

use super::codec::PositionCodec;
use super::types::{ActuatorReading, FrameError, FrameSnapshot};

/// Where the position words are and how to decode them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// First register of the block.
    pub register_base: u16,
    /// Distance between two position registers.
    pub register_stride: u16,
    /// Number of actuators on the frame.
    pub actuator_count: usize,
    /// Word decoder.
    pub codec: PositionCodec,
}

impl FrameLayout {
    /// Number of words fetched by one batch read.
    #[inline]
    pub fn block_len(&self) -> u16 {
        (self.actuator_count as u16).saturating_mul(self.register_stride)
    }

    /// Decode a register block into a snapshot.
    ///
    /// # Errors
    /// `FrameError::ShortBlock` when the block misses a position word,
    /// `FrameError::Empty` when the layout has no actuators.
    pub fn decode(&self, words: &[u16]) -> Result<FrameSnapshot, FrameError> {
        let stride = self.register_stride as usize;
        let needed = self.actuator_count.saturating_sub(1) * stride + 1;
        if self.actuator_count > 0 && words.len() < needed {
            return Err(FrameError::ShortBlock {
                expected: self.block_len() as usize,
                got: words.len(),
            });
        }

        let readings = (0..self.actuator_count)
            .map(|index| {
                let raw = words[index * stride];
                ActuatorReading {
                    index,
                    raw,
                    position: self.codec.decode(raw),
                }
            })
            .collect();

        FrameSnapshot::new(readings)
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            register_base: POSITION_REGISTER_BASE,
            register_stride: POSITION_REGISTER_STRIDE,
            actuator_count: ACTUATOR_COUNT,
            codec: PositionCodec::default(),
        }
    }
}
