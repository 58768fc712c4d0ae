//! # Lift HAL Library
//!
//! Device port drivers behind the [`DevicePort`](lift_common::port::DevicePort)
//! trait, selected by name at startup.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations (Modbus TCP, simulation, scripted)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          lift_hal                            │
//! │  ┌──────────────────┐         ┌───────────────────────────┐  │
//! │  │ DriverRegistry   │────────►│ Box<dyn DevicePort>       │  │
//! │  │ name → factory   │         │  ├── ModbusPort (TCP)     │  │
//! │  └──────────────────┘         │  ├── SimulatedFrame       │  │
//! │                               │  └── ScriptedPort (tests) │  │
//! │                               └───────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::{DriverError, DriverRegistry, PortFactory};
pub use crate::drivers::{default_registry, register_all_drivers};
