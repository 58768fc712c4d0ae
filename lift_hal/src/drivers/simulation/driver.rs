//! Simulation driver implementation.
//!
//! `SimulatedFrame` implements `DevicePort` over a shared [`FrameModel`],
//! so the frame can be driven end to end without a field device. A
//! [`SimulationProbe`] gives tests and the operator CLI a view of the model.

use async_trait::async_trait;
use lift_common::frame::FrameLayout;
use lift_common::frame::config::LiftConfig;
use lift_common::port::{DevicePort, PortError};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use super::physics::FrameModel;

/// Shared view of a running simulation.
#[derive(Debug, Clone)]
pub struct SimulationProbe {
    model: Arc<Mutex<FrameModel>>,
}

impl SimulationProbe {
    /// Current actuator positions.
    pub fn positions(&self) -> Vec<i32> {
        self.model.lock().positions().to_vec()
    }

    /// Move the actuators, e.g. to stage a fault.
    pub fn set_positions(&self, positions: &[i32]) {
        self.model.lock().set_positions(positions);
    }

    /// Current coil value.
    pub fn flag(&self, address: u16) -> bool {
        self.model.lock().flag(address)
    }

    /// Whether a direction is being driven.
    pub fn is_moving(&self) -> bool {
        self.model.lock().is_moving()
    }

    /// Ticks (block reads) since creation.
    pub fn ticks(&self) -> u64 {
        self.model.lock().ticks()
    }
}

/// Simulated field device.
pub struct SimulatedFrame {
    layout: FrameLayout,
    model: Arc<Mutex<FrameModel>>,
}

impl SimulatedFrame {
    /// Build from the `[frame]` and `[simulation]` sections.
    pub fn from_config(config: &LiftConfig) -> Self {
        let layout = config.layout();
        let model = FrameModel::new(
            layout.actuator_count,
            config.direction_flags(),
            &config.simulation,
        );
        info!(
            "Simulated frame with {} actuators at {:?}",
            layout.actuator_count,
            model.positions()
        );
        Self {
            layout,
            model: Arc::new(Mutex::new(model)),
        }
    }

    /// Handle onto the model that outlives moving the port.
    pub fn probe(&self) -> SimulationProbe {
        SimulationProbe {
            model: Arc::clone(&self.model),
        }
    }

    fn encode(&self, positions: &[i32]) -> Vec<u16> {
        let stride = self.layout.register_stride as usize;
        let mut words = vec![0u16; self.layout.block_len() as usize];
        for (index, &position) in positions.iter().enumerate() {
            if let Some(word) = words.get_mut(index * stride) {
                *word = position as u16;
            }
        }
        words
    }
}

#[async_trait]
impl DevicePort for SimulatedFrame {
    fn name(&self) -> &'static str {
        "simulation"
    }

    async fn read_flags(&mut self, address: u16, count: u16) -> Result<Vec<bool>, PortError> {
        let model = self.model.lock();
        Ok((address..address.saturating_add(count))
            .map(|a| model.flag(a))
            .collect())
    }

    async fn read_words(&mut self, address: u16, count: u16) -> Result<Vec<u16>, PortError> {
        let first = self.layout.register_base;
        let last = first.saturating_add(self.layout.block_len());
        if address < first || address.saturating_add(count) > last {
            return Err(PortError::Protocol(format!(
                "illegal data address {address} x {count}"
            )));
        }
        let positions = {
            let mut model = self.model.lock();
            model.tick();
            model.positions().to_vec()
        };
        let words = self.encode(&positions);
        let offset = (address - first) as usize;
        Ok(words[offset..offset + count as usize].to_vec())
    }

    async fn write_flag(&mut self, address: u16, value: bool) -> Result<(), PortError> {
        if !self.model.lock().set_flag(address, value) {
            return Err(PortError::Protocol(format!("illegal coil address {address}")));
        }
        debug!("sim coil {} <- {}", address, value);
        Ok(())
    }
}
