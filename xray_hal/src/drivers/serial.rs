//! Serial command link to the tray motion controller.

use parking_lot::Mutex;
use serialport::SerialPort;
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};
use xray_common::hal::config::SerialConfig;
use xray_common::hal::driver::{HalError, MotionLink};
use xray_common::hal::types::MotionCommand;

/// `MotionLink` over a `serialport` device.
pub struct SerialMotionLink {
    port_name: String,
    port: Mutex<Box<dyn SerialPort>>,
}

impl SerialMotionLink {
    /// Open the configured port.
    pub fn open(config: &SerialConfig) -> Result<Self, HalError> {
        let port = serialport::new(&config.port, config.baud)
            .timeout(Duration::from_millis(config.timeout_ms))
            .open()
            .map_err(|e| {
                HalError::InitFailed(format!("failed to open serial port '{}': {e}", config.port))
            })?;
        info!("Motion link open on {} @ {} baud", config.port, config.baud);
        Ok(Self {
            port_name: config.port.clone(),
            port: Mutex::new(port),
        })
    }
}

impl MotionLink for SerialMotionLink {
    fn send(&self, command: MotionCommand) -> Result<(), HalError> {
        debug!("motion link <- {command:?}");
        let mut port = self.port.lock();
        port.write_all(command.as_bytes())
            .and_then(|()| port.flush())
            .map_err(|e| HalError::CommunicationError {
                target: self.port_name.clone(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_port_is_init_failure() {
        let cfg = SerialConfig {
            port: "/dev/xray-no-such-port".to_string(),
            ..SerialConfig::default()
        };
        assert!(matches!(
            SerialMotionLink::open(&cfg),
            Err(HalError::InitFailed(_))
        ));
    }
}
