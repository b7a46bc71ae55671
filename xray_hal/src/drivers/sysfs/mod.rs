//! Linux sysfs driver.
//!
//! Digital lines through `/sys/class/gpio`, the HV monitor ADC through an
//! IIO device, and the tray motion controller through a serial port.

mod adc;
mod gpio;

pub use adc::IioChannel;
pub use gpio::{SysfsInput, SysfsOutput};

use crate::drivers::serial::SerialMotionLink;
use std::sync::Arc;
use tracing::info;
use xray_common::hal::config::{HalConfig, SerialConfig, SysfsConfig};
use xray_common::hal::driver::{
    AnalogInput, DigitalInput, DigitalOutput, HalDriver, HalError, MotionLink,
};

/// sysfs-backed driver.
pub struct SysfsDriver {
    sysfs: Option<SysfsConfig>,
    serial: SerialConfig,
}

impl SysfsDriver {
    /// Create an uninitialized driver.
    pub fn new() -> Self {
        Self {
            sysfs: None,
            serial: SerialConfig::default(),
        }
    }

    fn paths(&self) -> Result<&SysfsConfig, HalError> {
        self.sysfs
            .as_ref()
            .ok_or_else(|| HalError::InitFailed("sysfs driver used before init".to_string()))
    }
}

impl Default for SysfsDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HalDriver for SysfsDriver {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn init(&mut self, config: &HalConfig) -> Result<(), HalError> {
        if !config.sysfs.gpio_root.is_dir() {
            return Err(HalError::InitFailed(format!(
                "GPIO root {} not found",
                config.sysfs.gpio_root.display()
            )));
        }
        info!(
            "Initializing sysfs driver: gpio={}, iio={}, serial={}",
            config.sysfs.gpio_root.display(),
            config.sysfs.iio_device.display(),
            config.serial.port
        );
        self.sysfs = Some(config.sysfs.clone());
        self.serial = config.serial.clone();
        Ok(())
    }

    fn digital_input(&mut self, line: u32) -> Result<Arc<dyn DigitalInput>, HalError> {
        let root = &self.paths()?.gpio_root;
        Ok(Arc::new(SysfsInput::open(root, line)?))
    }

    fn digital_output(&mut self, line: u32) -> Result<Arc<dyn DigitalOutput>, HalError> {
        let root = &self.paths()?.gpio_root;
        Ok(Arc::new(SysfsOutput::open(root, line)?))
    }

    fn analog_input(&mut self, channel: u32) -> Result<Arc<dyn AnalogInput>, HalError> {
        let device = &self.paths()?.iio_device;
        Ok(Arc::new(IioChannel::open(device, channel)?))
    }

    fn motion_link(&mut self) -> Result<Arc<dyn MotionLink>, HalError> {
        self.paths()?;
        Ok(Arc::new(SerialMotionLink::open(&self.serial)?))
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutting down sysfs driver");
        self.sysfs = None;
        Ok(())
    }
}

/// Factory function to create a sysfs driver instance.
pub fn create_driver() -> Box<dyn HalDriver> {
    Box::new(SysfsDriver::new())
}
