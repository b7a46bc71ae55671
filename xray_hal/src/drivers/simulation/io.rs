//! Line handles backed by the shared [`SimRig`].

use super::rig::SimRig;
use parking_lot::Mutex;
use std::sync::Arc;
use xray_common::hal::driver::{AnalogInput, DigitalInput, DigitalOutput, HalError, MotionLink};
use xray_common::hal::types::MotionCommand;

pub(crate) type SharedRig = Arc<Mutex<SimRig>>;

/// Simulated digital input.
pub struct SimInput {
    pub(crate) line: u32,
    pub(crate) rig: SharedRig,
}

impl DigitalInput for SimInput {
    fn line(&self) -> u32 {
        self.line
    }

    fn read(&self) -> Result<bool, HalError> {
        self.rig
            .lock()
            .input(self.line)
            .ok_or_else(|| HalError::line(self.line, "simulated read failure"))
    }
}

/// Simulated digital output.
pub struct SimOutput {
    pub(crate) line: u32,
    pub(crate) rig: SharedRig,
}

impl DigitalOutput for SimOutput {
    fn line(&self) -> u32 {
        self.line
    }

    fn write(&self, high: bool) -> Result<(), HalError> {
        if self.rig.lock().write_output(self.line, high) {
            Ok(())
        } else {
            Err(HalError::line(self.line, "simulated write failure"))
        }
    }

    fn read_back(&self) -> Result<bool, HalError> {
        Ok(self.rig.lock().output(self.line))
    }
}

/// Simulated ADC channel.
pub struct SimAnalog {
    pub(crate) channel: u32,
    pub(crate) rig: SharedRig,
}

impl AnalogInput for SimAnalog {
    fn channel(&self) -> u32 {
        self.channel
    }

    fn read_raw(&self) -> Result<i32, HalError> {
        self.rig
            .lock()
            .analog(self.channel)
            .ok_or_else(|| HalError::CommunicationError {
                target: format!("adc channel {}", self.channel),
                reason: "simulated conversion failure".to_string(),
            })
    }
}

/// Simulated serial link to the tray motion controller.
pub struct SimMotionLink {
    pub(crate) rig: SharedRig,
}

impl MotionLink for SimMotionLink {
    fn send(&self, command: MotionCommand) -> Result<(), HalError> {
        if self.rig.lock().motion(command) {
            Ok(())
        } else {
            Err(HalError::CommunicationError {
                target: "motion link".to_string(),
                reason: "simulated serial failure".to_string(),
            })
        }
    }
}
