//! Integration scenarios for the X-ray controller running on the
//! simulation driver, with every monitor loop live.

mod actuators;
mod commands;
mod estop;
mod exposure;
mod faults;
mod lifecycle;
mod preview;

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use xray_common::config::ConfigLoader;
use xray_common::hal::config::PinMap;
use xray_control_unit::{ControllerConfig, ControllerState, Notification, SafetyController};
use xray_hal::{HardwareContext, SimHandle, SimulationDriver};

// ── Rig ─────────────────────────────────────────────────────────────

/// Controller on a simulated rig, with every notification recorded.
pub(crate) struct Rig {
    pub ctl: SafetyController,
    pub sim: SimHandle,
    pub pins: PinMap,
    pub cfg: ControllerConfig,
    pub notes: Arc<Mutex<Vec<Notification>>>,
    _dir: TempDir,
}

impl Rig {
    /// Build from extra TOML layered over the defaults. The loops are not
    /// started.
    pub fn build(toml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = ControllerConfig::from_toml(toml).unwrap();
        cfg.heartbeat.file = dir.path().join("heartbeat");
        cfg.heartbeat.shutdown_flag = dir.path().join("shutdown_flag");

        let driver = SimulationDriver::new();
        let sim = driver.handle();
        let hw = HardwareContext::open(Box::new(driver), &cfg.hal, &cfg.pins).unwrap();
        let ctl = SafetyController::new(Arc::new(hw), &cfg).unwrap();

        let notes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notes);
        ctl.set_notifier(move |n| sink.lock().push(n.clone()));

        Self {
            ctl,
            sim,
            pins: cfg.pins.clone(),
            cfg,
            notes,
            _dir: dir,
        }
    }

    /// Default configuration, loops running.
    pub fn started() -> Self {
        Self::started_with("")
    }

    /// Extra TOML, loops running.
    pub fn started_with(toml: &str) -> Self {
        let rig = Self::build(toml);
        rig.ctl.start().unwrap();
        rig
    }

    /// Block until the controller reaches `state`, or panic after `limit`.
    pub fn wait_for(&self, state: ControllerState, limit: Duration) {
        let deadline = Instant::now() + limit;
        while self.ctl.state() != state {
            assert!(
                Instant::now() < deadline,
                "still {} after {:?}, wanted {}",
                self.ctl.state(),
                limit,
                state
            );
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Messages of every notification so far.
    pub fn messages(&self) -> Vec<String> {
        self.notes.lock().iter().map(|n| n.message.clone()).collect()
    }

    /// First write of `high` on `line` at or after `since`.
    pub fn first_write(&self, line: u32, high: bool, since: Instant) -> Option<Instant> {
        self.sim
            .line_history(line)
            .into_iter()
            .find(|e| e.high == high && e.at >= since)
            .map(|e| e.at)
    }

    /// HV, trigger and preview all LOW.
    pub fn hazards_off(&self) -> bool {
        !self.sim.output(self.pins.hv_enable)
            && !self.sim.output(self.pins.cam_trigger)
            && !self.sim.output(self.pins.cam_preview)
    }
}

/// ADC counts that read well above the default alarm threshold.
pub(crate) const ALARM_COUNTS: i32 = 12_000;

/// Fast axes and a four-step simulated tray starting open.
pub(crate) const FAST_AXES: &str = r#"
[actuators]
tray_command_interval_s = 0.0
align_step_delay_s = 0.0
rotation_step_delay_s = 0.0
align_traverse_steps = 6
rotation_steps_per_increment = 8

[hal.simulation.tray]
open_limit = 17
close_limit = 18
travel_steps = 4
start_position = 0

[[hal.simulation.write_triggers]]
output = 19
writes = 3
input = 22
high = false
"#;
