//! Frame kinematics for the simulation driver.
//!
//! Time advances one tick per position block read: while a direction flag is
//! set every actuator travels `step_per_poll` plus its own drift. With both
//! flags set the frame holds still.

use lift_common::frame::DirectionFlags;
use lift_common::frame::config::SimulationConfig;
use tracing::trace;

/// Simulated actuator positions and direction coils.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameModel {
    positions: Vec<i32>,
    drift: Vec<i32>,
    step: i32,
    flags: DirectionFlags,
    move_low: bool,
    move_high: bool,
    ticks: u64,
}

impl FrameModel {
    /// Build a model for `actuator_count` actuators.
    pub fn new(actuator_count: usize, flags: DirectionFlags, config: &SimulationConfig) -> Self {
        let positions = if config.start_positions.is_empty() {
            vec![0; actuator_count]
        } else {
            config.start_positions.clone()
        };
        let drift = if config.drift.is_empty() {
            vec![0; actuator_count]
        } else {
            config.drift.clone()
        };
        Self {
            positions,
            drift,
            step: config.step_per_poll,
            flags,
            move_low: false,
            move_high: false,
            ticks: 0,
        }
    }

    /// Current actuator positions.
    #[inline]
    pub fn positions(&self) -> &[i32] {
        &self.positions
    }

    /// Overwrite actuator positions.
    pub fn set_positions(&mut self, positions: &[i32]) {
        self.positions.clear();
        self.positions.extend_from_slice(positions);
        self.drift.resize(self.positions.len(), 0);
    }

    /// Ticks elapsed since creation.
    #[inline]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Coil value at `address`; unknown addresses read as cleared.
    pub fn flag(&self, address: u16) -> bool {
        if address == self.flags.move_low {
            self.move_low
        } else if address == self.flags.move_high {
            self.move_high
        } else {
            false
        }
    }

    /// Write a coil. Returns `false` for an address the device does not have.
    pub fn set_flag(&mut self, address: u16, value: bool) -> bool {
        if address == self.flags.move_low {
            self.move_low = value;
        } else if address == self.flags.move_high {
            self.move_high = value;
        } else {
            return false;
        }
        true
    }

    /// Whether the frame is currently being driven.
    #[inline]
    pub fn is_moving(&self) -> bool {
        self.move_low != self.move_high
    }

    /// Advance one tick.
    pub fn tick(&mut self) {
        self.ticks += 1;
        let sign = match (self.move_low, self.move_high) {
            (false, true) => 1,
            (true, false) => -1,
            _ => return,
        };
        for (position, drift) in self.positions.iter_mut().zip(&self.drift) {
            *position += sign * (self.step + drift);
        }
        trace!("sim tick {}: {:?}", self.ticks, self.positions);
    }
}
