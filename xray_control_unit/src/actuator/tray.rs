//! Axis 1: sample tray, driven over the serial motion link.
//!
//! Every command is preceded by a limit check, so the carriage stops within
//! one command interval of its limit switch asserting (LOW).

use crate::error::ControllerError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};
use xray_common::hal::driver::{DigitalInput, MotionLink};
use xray_common::hal::types::MotionCommand;

const AXIS: &str = "tray";

/// Tray axis.
pub struct TrayAxis {
    link: Arc<dyn MotionLink>,
    open_limit: Arc<dyn DigitalInput>,
    close_limit: Arc<dyn DigitalInput>,
    interval: Duration,
    max_commands: u64,
}

impl TrayAxis {
    /// New tray axis.
    pub fn new(
        link: Arc<dyn MotionLink>,
        open_limit: Arc<dyn DigitalInput>,
        close_limit: Arc<dyn DigitalInput>,
        interval: Duration,
        max_commands: u64,
    ) -> Self {
        Self {
            link,
            open_limit,
            close_limit,
            interval,
            max_commands,
        }
    }

    /// Drive towards closed until the close limit asserts. Returns commands sent.
    pub fn close(&self, halt: &AtomicBool) -> Result<u64, ControllerError> {
        self.drive(MotionCommand::StepForward, self.close_limit.as_ref(), halt)
    }

    /// Drive towards open until the open limit asserts. Returns commands sent.
    pub fn open(&self, halt: &AtomicBool) -> Result<u64, ControllerError> {
        self.drive(MotionCommand::StepBackward, self.open_limit.as_ref(), halt)
    }

    /// Tray sits on its close limit.
    pub fn is_closed(&self) -> Result<bool, ControllerError> {
        Ok(!self.close_limit.read()?)
    }

    fn drive(
        &self,
        command: MotionCommand,
        limit: &dyn DigitalInput,
        halt: &AtomicBool,
    ) -> Result<u64, ControllerError> {
        let mut sent = 0u64;
        loop {
            if !limit.read()? {
                info!("Tray reached limit {} after {} commands", limit.line(), sent);
                return Ok(sent);
            }
            if halt.load(Ordering::Acquire) {
                return Err(ControllerError::MotionIncomplete {
                    axis: AXIS,
                    reason: format!("halted after {sent} commands"),
                });
            }
            if sent >= self.max_commands {
                return Err(ControllerError::MotionIncomplete {
                    axis: AXIS,
                    reason: format!("limit {} not reached in {} commands", limit.line(), sent),
                });
            }
            self.link.send(command)?;
            sent += 1;
            debug!("Tray {:?} #{}", command, sent);
            thread::sleep(self.interval);
        }
    }
}
