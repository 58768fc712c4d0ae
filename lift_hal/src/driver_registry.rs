//! Driver registry for device ports.
//!
//! Provides a `DriverRegistry` struct for registering port factories and
//! building a port from the deployment configuration. Constructor injection,
//! no global state.

use lift_common::frame::config::LiftConfig;
use lift_common::port::{DevicePort, PortError};
use std::collections::HashMap;
use thiserror::Error;

/// Builds a port for the given configuration.
///
/// Factories never touch the network; connections are opened on first use.
pub type PortFactory = fn(&LiftConfig) -> Result<Box<dyn DevicePort>, PortError>;

/// Errors raised while creating a port.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No driver registered under this name.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// The factory rejected the configuration.
    #[error("Driver '{driver}' failed to initialize: {source}")]
    Init {
        /// Driver name.
        driver: String,
        /// Underlying port error.
        source: PortError,
    },
}

/// Registry of available port drivers.
///
/// Constructed at startup, populated via `register()`, then queried with
/// `create_port()`.
pub struct DriverRegistry {
    factories: HashMap<&'static str, PortFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: PortFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<PortFactory> {
        self.factories.get(name).copied()
    }

    /// Create a port with the named driver.
    ///
    /// # Errors
    /// `DriverError::DriverNotFound` if no driver with the given name is
    /// registered, `DriverError::Init` if the factory rejects the config.
    pub fn create_port(
        &self,
        name: &str,
        config: &LiftConfig,
    ) -> Result<Box<dyn DevicePort>, DriverError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| DriverError::DriverNotFound(name.to_string()))?;
        factory(config).map_err(|source| DriverError::Init {
            driver: name.to_string(),
            source,
        })
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
