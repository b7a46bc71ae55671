//! Hardware abstraction layer contracts.
//!
//! The controller and the watchdog never touch a pin number directly.
//! They receive handles implementing the traits in [`driver`], produced by
//! a pluggable [`driver::HalDriver`] and wired according to a
//! [`config::PinMap`].

pub mod config;
pub mod driver;
pub mod types;
