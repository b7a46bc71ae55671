//! Safety layer.
//!
//! Interlock sampling, the E-Stop latch, HV monitoring, fail-safe relay
//! outputs and LED annunciation. None of these own state-machine policy;
//! the controller composes them.

pub mod hv_monitor;
pub mod interlock;
pub mod latch;
pub mod leds;
pub mod relay;
