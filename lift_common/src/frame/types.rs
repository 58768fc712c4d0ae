//! Per-poll value types: readings, snapshots and travel direction.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::consts::{MOVE_HIGH_FLAG, MOVE_LOW_FLAG};

/// Errors raised while building a snapshot from a register block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// A snapshot must contain at least one reading.
    #[error("frame snapshot has no readings")]
    Empty,

    /// The device returned fewer words than the layout requires.
    #[error("register block too short: expected {expected} words, got {got}")]
    ShortBlock {
        /// Words required by the layout.
        expected: usize,
        /// Words actually returned.
        got: usize,
    },
}

/// One actuator position taken during a poll round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorReading {
    /// Actuator index within the frame (0-based).
    pub index: usize,
    /// Register word as read from the device.
    pub raw: u16,
    /// Decoded signed position.
    pub position: i32,
}

/// All actuator readings from a single batch read. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameSnapshot {
    readings: Vec<ActuatorReading>,
}

impl FrameSnapshot {
    /// Build a snapshot, rejecting an empty reading set.
    pub fn new(readings: Vec<ActuatorReading>) -> Result<Self, FrameError> {
        if readings.is_empty() {
            return Err(FrameError::Empty);
        }
        Ok(Self { readings })
    }

    /// Build a snapshot from already-decoded positions.
    ///
    /// Raw words are the two's-complement image of each position.
    pub fn from_positions(positions: &[i32]) -> Result<Self, FrameError> {
        Self::new(
            positions
                .iter()
                .enumerate()
                .map(|(index, &position)| ActuatorReading {
                    index,
                    raw: position as u16,
                    position,
                })
                .collect(),
        )
    }

    /// Readings in actuator order.
    #[inline]
    pub fn readings(&self) -> &[ActuatorReading] {
        &self.readings
    }

    /// Number of readings (always ≥ 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Reading for the given actuator index, if present.
    pub fn get(&self, index: usize) -> Option<&ActuatorReading> {
        self.readings.get(index)
    }

    /// Decoded positions in actuator order.
    pub fn positions(&self) -> impl Iterator<Item = i32> + '_ {
        self.readings.iter().map(|r| r.position)
    }

    /// Lowest position in the snapshot.
    pub fn min_position(&self) -> i32 {
        self.positions().fold(i32::MAX, i32::min)
    }

    /// Highest position in the snapshot.
    pub fn max_position(&self) -> i32 {
        self.positions().fold(i32::MIN, i32::max)
    }

    /// Distance between the highest and lowest actuator.
    pub fn spread(&self) -> i32 {
        self.max_position() - self.min_position()
    }
}

impl fmt::Display for FrameSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, reading) in self.readings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", reading.position)?;
        }
        write!(f, "]")
    }
}

/// Travel direction of a movement session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward the high bound (increasing position).
    Up,
    /// Toward the low bound (decreasing position).
    Down,
}

impl Direction {
    /// Direction needed to close `target - position`. `None` at zero.
    pub const fn from_difference(difference: i32) -> Option<Self> {
        if difference > 0 {
            Some(Self::Up)
        } else if difference < 0 {
            Some(Self::Down)
        } else {
            None
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Addresses of the two reserved direction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionFlags {
    /// Flag driving the frame toward the low bound.
    pub move_low: u16,
    /// Flag driving the frame toward the high bound.
    pub move_high: u16,
}

impl DirectionFlags {
    /// Flag address that drives the given direction.
    #[inline]
    pub const fn address_for(&self, direction: Direction) -> u16 {
        match direction {
            Direction::Up => self.move_high,
            Direction::Down => self.move_low,
        }
    }

    /// Both addresses, low first.
    #[inline]
    pub const fn both(&self) -> [u16; 2] {
        [self.move_low, self.move_high]
    }
}

impl Default for DirectionFlags {
    fn default() -> Self {
        Self {
            move_low: MOVE_LOW_FLAG,
            move_high: MOVE_HIGH_FLAG,
        }
    }
}
