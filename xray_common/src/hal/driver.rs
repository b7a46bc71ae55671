//! HAL driver trait, I/O handle traits and error types.
//!
//! This module defines:
//! - `DigitalInput` / `DigitalOutput` / `AnalogInput` / `MotionLink` - handle traits
//! - `HalDriver` trait - Factory of handles for one hardware backend
//! - `HalError` enum - Error types for HAL operations
//! - `DriverFactory` type alias - Factory function type
//! - `DriverDiagnostics` struct - Optional driver diagnostics

use crate::hal::config::HalConfig;
use crate::hal::types::MotionCommand;
use std::sync::Arc;
use thiserror::Error;

/// Error types for HAL operations.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error
    #[error("Hardware communication error on {target}: {reason}")]
    CommunicationError {
        /// Pin, channel or port that failed.
        target: String,
        /// Underlying failure.
        reason: String,
    },

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Requested line or channel is not available from this driver
    #[error("Line {0} unavailable")]
    LineUnavailable(u32),
}

impl HalError {
    /// Shorthand for a communication failure on a numbered GPIO line.
    pub fn line(line: u32, reason: impl ToString) -> Self {
        Self::CommunicationError {
            target: format!("line {line}"),
            reason: reason.to_string(),
        }
    }
}

/// A digital input line (switch, limit, heartbeat return).
///
/// `read` returns the electrical level: `true` = HIGH.
pub trait DigitalInput: Send + Sync {
    /// Hardware line number.
    fn line(&self) -> u32;

    /// Sample the current level.
    fn read(&self) -> Result<bool, HalError>;
}

/// A digital output line (relay, trigger, LED, stepper coil).
pub trait DigitalOutput: Send + Sync {
    /// Hardware line number.
    fn line(&self) -> u32;

    /// Drive the line HIGH (`true`) or LOW (`false`).
    fn write(&self, high: bool) -> Result<(), HalError>;

    /// Read back the level currently driven on the line.
    fn read_back(&self) -> Result<bool, HalError>;
}

/// A single-ended ADC channel.
pub trait AnalogInput: Send + Sync {
    /// ADC channel index.
    fn channel(&self) -> u32;

    /// Signed raw conversion result in ADC counts.
    fn read_raw(&self) -> Result<i32, HalError>;
}

/// Command channel to the remote motion controller that drives the tray.
pub trait MotionLink: Send + Sync {
    /// Send one step command. Must not block for longer than the link timeout.
    fn send(&self, command: MotionCommand) -> Result<(), HalError>;
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn HalDriver>;

/// Optional driver diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DriverDiagnostics {
    /// Number of output writes performed
    pub output_writes: u64,
    /// Number of input reads performed
    pub input_reads: u64,
    /// Number of motion commands sent
    pub motion_commands: u64,
    /// Driver-specific diagnostics
    pub custom: Option<String>,
}

/// Trait defining the interface for HAL drivers.
///
/// A driver hands out shareable handles for individual lines. The
/// `HardwareContext` in `xray_hal` asks for every handle exactly once at
/// startup and owns them for the life of the process.
///
/// # Lifecycle
///
/// 1. `init()` - Called once before any handle is requested
/// 2. `digital_input()` / `digital_output()` / `analog_input()` / `motion_link()`
/// 3. `shutdown()` - Called when the owning process is stopping
///
/// # Contract
///
/// `digital_output()` must return a line already driven LOW.
pub trait HalDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation", "sysfs").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the driver from the `[hal]` configuration section.
    ///
    /// # Errors
    /// Return `HalError::InitFailed` if initialization cannot complete.
    fn init(&mut self, config: &HalConfig) -> Result<(), HalError>;

    /// Claim a digital input line.
    fn digital_input(&mut self, line: u32) -> Result<Arc<dyn DigitalInput>, HalError>;

    /// Claim a digital output line, driven LOW before it is returned.
    fn digital_output(&mut self, line: u32) -> Result<Arc<dyn DigitalOutput>, HalError>;

    /// Claim an ADC channel.
    fn analog_input(&mut self, channel: u32) -> Result<Arc<dyn AnalogInput>, HalError>;

    /// Open the command link to the remote motion controller.
    fn motion_link(&mut self) -> Result<Arc<dyn MotionLink>, HalError>;

    /// Release hardware resources.
    fn shutdown(&mut self) -> Result<(), HalError>;

    /// Get driver-specific diagnostics.
    /// Default: None
    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        None
    }
}
