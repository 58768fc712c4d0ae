//! Simulation driver module.
//!
//! Software frame model for development and demos without a field device.

mod driver;
mod physics;

pub use driver::{SimulatedFrame, SimulationProbe};
pub use physics::FrameModel;

use lift_common::frame::config::LiftConfig;
use lift_common::port::{DevicePort, PortError};

/// Factory function to create a simulation driver instance.
pub fn create_driver(config: &LiftConfig) -> Result<Box<dyn DevicePort>, PortError> {
    Ok(Box::new(SimulatedFrame::from_config(config)))
}
