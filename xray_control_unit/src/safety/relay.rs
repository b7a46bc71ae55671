//! Fail-safe output wrapper for the HV enable, trigger and preview lines.
//!
//! The line is driven LOW on construction and again on drop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error};
use xray_common::hal::driver::{DigitalOutput, HalError};

/// A named output that defaults to LOW.
pub struct RelayDriver {
    name: &'static str,
    line: Arc<dyn DigitalOutput>,
    commanded: AtomicBool,
}

impl RelayDriver {
    /// Take over `line` and drive it LOW.
    pub fn new(name: &'static str, line: Arc<dyn DigitalOutput>) -> Result<Self, HalError> {
        line.write(false)?;
        Ok(Self {
            name,
            line,
            commanded: AtomicBool::new(false),
        })
    }

    /// Drive HIGH.
    pub fn on(&self) -> Result<(), HalError> {
        self.set(true)
    }

    /// Drive LOW.
    pub fn off(&self) -> Result<(), HalError> {
        self.set(false)
    }

    fn set(&self, high: bool) -> Result<(), HalError> {
        debug!("{} -> {}", self.name, if high { "ON" } else { "OFF" });
        // Record LOW even if the write fails: the intent is off.
        self.commanded.store(high, Ordering::Release);
        self.line.write(high)
    }

    /// Last commanded level.
    pub fn is_on(&self) -> bool {
        self.commanded.load(Ordering::Acquire)
    }

    /// Relay name used in logs.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for RelayDriver {
    fn drop(&mut self) {
        if let Err(e) = self.line.write(false) {
            error!("{}: failed to drive LOW on drop: {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xray_common::hal::config::{HalConfig, PinMap};
    use xray_hal::{HardwareContext, SimulationDriver};

    #[test]
    fn on_off_and_drop() {
        let driver = SimulationDriver::new();
        let sim = driver.handle();
        let pins = PinMap::default();
        let hw = HardwareContext::open(Box::new(driver), &HalConfig::default(), &pins).unwrap();

        let relay = RelayDriver::new("hv_enable", hw.hv_enable.clone()).unwrap();
        assert!(!sim.output(pins.hv_enable));
        relay.on().unwrap();
        assert!(relay.is_on());
        assert!(sim.output(pins.hv_enable));
        drop(relay);
        assert!(!sim.output(pins.hv_enable));
    }

    #[test]
    fn failed_write_surfaces() {
        let driver = SimulationDriver::new();
        let sim = driver.handle();
        let pins = PinMap::default();
        let hw = HardwareContext::open(Box::new(driver), &HalConfig::default(), &pins).unwrap();
        let relay = RelayDriver::new("cam_trigger", hw.cam_trigger.clone()).unwrap();
        sim.fail_line(pins.cam_trigger, true);
        assert!(relay.on().is_err());
    }
}
