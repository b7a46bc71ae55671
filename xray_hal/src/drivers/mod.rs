//! HAL driver implementations.
//!
//! - [`simulation`] - Software rig for development and testing
//! - [`sysfs`] - Linux GPIO/IIO driver for the real rig
//! - [`serial`] - Serial motion link used by the sysfs driver
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `HalDriver` trait from `xray_common::hal::driver`
//! 3. Register the factory in [`register_all_drivers`]

pub mod serial;
pub mod simulation;
pub mod sysfs;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_driver);
    registry.register("sysfs", sysfs::create_driver);
}
