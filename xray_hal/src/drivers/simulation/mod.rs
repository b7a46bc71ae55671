//! Simulation driver module.
//!
//! This module provides a software simulation driver for development and testing
//! without physical hardware.

mod driver;
mod io;
mod rig;
mod tray;

pub use driver::{SimHandle, SimulationDriver};
pub use rig::{SimRig, WriteEvent};
pub use tray::TrayCarriage;

use xray_common::hal::driver::HalDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn HalDriver> {
    Box::new(SimulationDriver::new())
}
