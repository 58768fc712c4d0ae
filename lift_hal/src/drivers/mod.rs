//! Device port driver implementations.
//!
//! - [`modbus`] - Modbus TCP field device
//! - [`simulation`] - In-process frame model for development without hardware
//! - [`mock`] - Scripted port for deterministic tests
//! - [`retry`] - Reconnect-with-backoff policy shared by network drivers
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `DevicePort` from `lift_common::port`
//! 3. Register the factory in [`register_all_drivers`]

pub mod mock;
pub mod modbus;
pub mod retry;
pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register every built-in driver selectable from configuration.
///
/// The scripted port is test-only and is not registered.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("modbus", modbus::create_driver);
    registry.register("simulation", simulation::create_driver);
}

/// Registry with every built-in driver.
pub fn default_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    register_all_drivers(&mut registry);
    registry
}
