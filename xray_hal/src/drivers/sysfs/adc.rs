//! ADC channels through the Linux IIO interface (`in_voltageN_raw`).

use std::fs;
use std::path::{Path, PathBuf};
use xray_common::hal::driver::{AnalogInput, HalError};

/// IIO voltage channel.
pub struct IioChannel {
    channel: u32,
    raw_path: PathBuf,
}

impl IioChannel {
    /// Bind to channel `channel` of the IIO device at `device`.
    pub fn open(device: &Path, channel: u32) -> Result<Self, HalError> {
        let raw_path = device.join(format!("in_voltage{channel}_raw"));
        if !raw_path.exists() {
            return Err(HalError::InitFailed(format!(
                "{} not present",
                raw_path.display()
            )));
        }
        Ok(Self { channel, raw_path })
    }

    fn comm_error(&self, reason: impl ToString) -> HalError {
        HalError::CommunicationError {
            target: format!("adc channel {}", self.channel),
            reason: reason.to_string(),
        }
    }
}

impl AnalogInput for IioChannel {
    fn channel(&self) -> u32 {
        self.channel
    }

    fn read_raw(&self) -> Result<i32, HalError> {
        let text = fs::read_to_string(&self.raw_path).map_err(|e| self.comm_error(e))?;
        text.trim()
            .parse::<i32>()
            .map_err(|e| self.comm_error(format!("{e}: {:?}", text.trim())))
    }
}
