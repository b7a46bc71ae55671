//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `HalDriver` trait on top of an
//! in-memory [`SimRig`]. Tests keep a [`SimHandle`] to the same rig to
//! flip switches, set ADC counts, inject I/O failures and inspect the
//! recorded output history.

use super::io::{SharedRig, SimAnalog, SimInput, SimMotionLink, SimOutput};
use super::rig::{SimRig, WriteEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use xray_common::hal::config::{HalConfig, SimulationConfig};
use xray_common::hal::driver::{
    AnalogInput, DigitalInput, DigitalOutput, DriverDiagnostics, HalDriver, HalError, MotionLink,
};
use xray_common::hal::types::MotionCommand;

/// Simulation driver implementing the HalDriver trait.
pub struct SimulationDriver {
    version: &'static str,
    initialized: bool,
    rig: SharedRig,
}

impl SimulationDriver {
    /// Create a new simulation driver instance.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            initialized: false,
            rig: Arc::new(Mutex::new(SimRig::new(&SimulationConfig::default()))),
        }
    }

    /// Test/bench handle onto the rig this driver serves.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            rig: Arc::clone(&self.rig),
        }
    }

    fn ensure_init(&self) -> Result<(), HalError> {
        if self.initialized {
            Ok(())
        } else {
            Err(HalError::InitFailed(
                "simulation driver used before init".to_string(),
            ))
        }
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HalDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &HalConfig) -> Result<(), HalError> {
        let sim = &config.simulation;
        info!(
            "Initializing simulation driver: {} preset inputs, {} loopbacks, {} triggers, tray={}",
            sim.input_levels.len(),
            sim.loopbacks.len(),
            sim.write_triggers.len(),
            sim.tray.is_some()
        );
        *self.rig.lock() = SimRig::new(sim);
        self.initialized = true;
        Ok(())
    }

    fn digital_input(&mut self, line: u32) -> Result<Arc<dyn DigitalInput>, HalError> {
        self.ensure_init()?;
        Ok(Arc::new(SimInput {
            line,
            rig: Arc::clone(&self.rig),
        }))
    }

    fn digital_output(&mut self, line: u32) -> Result<Arc<dyn DigitalOutput>, HalError> {
        self.ensure_init()?;
        let out = SimOutput {
            line,
            rig: Arc::clone(&self.rig),
        };
        out.write(false)?;
        Ok(Arc::new(out))
    }

    fn analog_input(&mut self, channel: u32) -> Result<Arc<dyn AnalogInput>, HalError> {
        self.ensure_init()?;
        Ok(Arc::new(SimAnalog {
            channel,
            rig: Arc::clone(&self.rig),
        }))
    }

    fn motion_link(&mut self) -> Result<Arc<dyn MotionLink>, HalError> {
        self.ensure_init()?;
        Ok(Arc::new(SimMotionLink {
            rig: Arc::clone(&self.rig),
        }))
    }

    fn shutdown(&mut self) -> Result<(), HalError> {
        info!("Shutting down simulation driver");
        self.initialized = false;
        Ok(())
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        let rig = self.rig.lock();
        Some(DriverDiagnostics {
            output_writes: rig.output_writes,
            input_reads: rig.input_reads,
            motion_commands: rig.motion_log().len() as u64,
            custom: rig.tray_position().map(|p| format!("tray_position={p}")),
        })
    }
}

/// Cloneable handle onto a simulated rig.
#[derive(Clone)]
pub struct SimHandle {
    rig: SharedRig,
}

impl SimHandle {
    /// Force an input level (e.g. press the E-Stop: `set_input(estop, false)`).
    pub fn set_input(&self, line: u32, high: bool) {
        self.rig.lock().set_input(line, high);
    }

    /// Current input level as the hardware would read it.
    pub fn input(&self, line: u32) -> Option<bool> {
        self.rig.lock().input(line)
    }

    /// Current output level.
    pub fn output(&self, line: u32) -> bool {
        self.rig.lock().output(line)
    }

    /// Set ADC raw counts.
    pub fn set_analog(&self, channel: u32, raw: i32) {
        self.rig.lock().set_analog(channel, raw);
    }

    /// Fail or restore a digital line.
    pub fn fail_line(&self, line: u32, failed: bool) {
        self.rig.lock().set_line_failed(line, failed);
    }

    /// Fail or restore an ADC channel.
    pub fn fail_channel(&self, channel: u32, failed: bool) {
        self.rig.lock().set_channel_failed(channel, failed);
    }

    /// Fail or restore the motion link.
    pub fn fail_motion(&self, failed: bool) {
        self.rig.lock().set_motion_failed(failed);
    }

    /// Every output write so far.
    pub fn history(&self) -> Vec<WriteEvent> {
        self.rig.lock().history().to_vec()
    }

    /// Writes recorded on one line.
    pub fn line_history(&self, line: u32) -> Vec<WriteEvent> {
        self.rig
            .lock()
            .history()
            .iter()
            .filter(|e| e.line == line)
            .copied()
            .collect()
    }

    /// Number of writes on `line`.
    pub fn write_count(&self, line: u32) -> u64 {
        self.rig.lock().write_count(line)
    }

    /// Every motion command sent so far.
    pub fn motion_log(&self) -> Vec<MotionCommand> {
        self.rig.lock().motion_log().to_vec()
    }

    /// Simulated tray position, if configured.
    pub fn tray_position(&self) -> Option<i64> {
        self.rig.lock().tray_position()
    }

    /// Forget recorded history and motion log.
    pub fn clear_records(&self) {
        self.rig.lock().clear_records();
    }
}
