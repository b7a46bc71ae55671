//! Driver registry for HAL drivers.
//!
//! Maps driver names from `[hal] driver = "..."` to factories. Built by the
//! binaries at startup and passed by value; no global state.

use crate::drivers::register_all_drivers;
use std::collections::HashMap;
use xray_common::hal::driver::{DriverFactory, HalDriver, HalError};

/// Registry of available HAL drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with every built-in driver.
    pub fn with_builtin() -> Self {
        let mut reg = Self::new();
        register_all_drivers(&mut reg);
        reg
    }

    /// Register a driver factory. A later registration under the same name
    /// replaces the earlier one.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.insert(name, factory).is_some() {
            tracing::warn!("Driver '{name}' re-registered, previous factory replaced");
        }
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn HalDriver>, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory())
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
        Self::with_builtin()
    }
}
