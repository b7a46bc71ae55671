//! # X-ray Rig HAL Library
//!
//! Hardware context and pluggable drivers for the X-ray rig.
//! Drivers implement the `HalDriver` trait defined in `xray_common::hal::driver`.
//!
//! # Module Structure
//!
//! - [`context`] - `HardwareContext`, the single owner of all pin handles
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - HAL driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          xray_hal                                │
//! │  ┌─────────────────┐    ┌──────────────┐    ┌─────────────────┐  │
//! │  │ HardwareContext │◄───│  HalDriver   │◄───│ Driver Registry │  │
//! │  │ (Arc handles)   │    │  (trait obj) │    │                 │  │
//! │  └─────────────────┘    └──────┬───────┘    └─────────────────┘  │
//! │                                │                                 │
//! │                 ┌──────────────┼───────────────┐                 │
//! │                 ▼              ▼               ▼                 │
//! │            simulation        sysfs          serial               │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod context;
pub mod driver_registry;
pub mod drivers;

// Re-export key types for convenience
pub use crate::context::{CoilSet, HardwareContext, InterlockInputs, LedOutputs, LimitInputs};
pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::{SimHandle, SimulationDriver};
