//! # X-ray Rig Control Unit
//!
//! Safety controller for an X-ray imaging rig. Gates the HV source and the
//! camera trigger behind debounced interlocks and drives the three sample
//! axes.
//!
//! ## Layers
//!
//! 1. **State**: `Idle / Armed / Preview / Expose / Fault` transition table
//! 2. **Safety**: interlock sampling, E-Stop latch, HV monitor, relays, LEDs
//! 3. **Actuators**: tray (serial), alignment and rotation (steppers)
//! 4. **Controller**: composes the above, owns the hazardous outputs,
//!    runs the monitor loops and emits notifications
//!
//! Hardware comes from an `xray_hal::HardwareContext`; the `simulation`
//! driver runs the whole controller without a rig attached.

pub mod actuator;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod periodic;
pub mod safety;
pub mod state;

pub use config::ControllerConfig;
pub use controller::{ExposureOutcome, Notification, SafetyController};
pub use error::{ControllerError, FaultReason};
pub use state::ControllerState;
