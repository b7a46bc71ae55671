//! HAL configuration types.
//!
//! This module contains configuration types for the hardware abstraction layer:
//! - `HalConfig` - the `[hal]` section (driver choice and per-driver settings)
//! - `PinMap` - the `[pins]` section (every line the rig uses)
//! - `SimulationConfig` - behaviour of the software rig used for bench runs and tests
//!
//! Default line numbers follow the BCM numbering of the reference wiring.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

fn default_driver() -> String {
    "simulation".to_string()
}

/// `[hal]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HalConfig {
    /// Driver to load ("simulation" or "sysfs").
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Settings for the Linux sysfs driver.
    #[serde(default)]
    pub sysfs: SysfsConfig,

    /// Serial link to the tray motion controller.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Settings for the simulation driver.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            sysfs: SysfsConfig::default(),
            serial: SerialConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Linux sysfs driver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SysfsConfig {
    /// GPIO class directory.
    pub gpio_root: PathBuf,
    /// IIO device directory exposing `in_voltageN_raw`.
    pub iio_device: PathBuf,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            iio_device: PathBuf::from("/sys/bus/iio/devices/iio:device0"),
        }
    }
}

/// Serial port settings for the tray motion controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path.
    pub port: String,
    /// Baud rate.
    pub baud: u32,
    /// Write timeout [ms].
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud: 115_200,
            timeout_ms: 10,
        }
    }
}

// ─── Simulation ─────────────────────────────────────────────────────

/// Initial level of a simulated input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimInputLevel {
    /// Input line.
    pub line: u32,
    /// Level (`true` = HIGH).
    pub high: bool,
}

/// Output whose level is mirrored onto an input (e.g. heartbeat out → in).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimLoopback {
    /// Driving output line.
    pub output: u32,
    /// Mirrored input line.
    pub input: u32,
}

/// After `writes` writes to `output`, force `input` to `high`.
///
/// Models a switch reached by a stepper after a fixed number of steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimWriteTrigger {
    /// Output line being counted.
    pub output: u32,
    /// Number of writes before the trigger fires.
    pub writes: u64,
    /// Input line to force.
    pub input: u32,
    /// Level forced on the input.
    pub high: bool,
}

/// Simulated tray carriage driven by motion commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimTrayConfig {
    /// Open limit switch input (pulled LOW at position 0).
    pub open_limit: u32,
    /// Close limit switch input (pulled LOW at full travel).
    pub close_limit: u32,
    /// Steps between the two limits.
    pub travel_steps: i64,
    /// Starting carriage position.
    #[serde(default)]
    pub start_position: i64,
}

/// Initial raw count of a simulated ADC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimAnalogLevel {
    /// ADC channel.
    pub channel: u32,
    /// Raw counts.
    pub raw: i32,
}

/// `[hal.simulation]` section.
///
/// Unlisted inputs read HIGH, matching pulled-up switches at rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Initial input levels.
    pub input_levels: Vec<SimInputLevel>,
    /// Output→input mirrors.
    pub loopbacks: Vec<SimLoopback>,
    /// Write-count triggers.
    pub write_triggers: Vec<SimWriteTrigger>,
    /// Simulated tray carriage.
    pub tray: Option<SimTrayConfig>,
    /// Initial ADC readings.
    pub analog: Vec<SimAnalogLevel>,
}

// ─── Pin Map ────────────────────────────────────────────────────────

/// `[pins]` section: every line and channel the rig uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinMap {
    /// E-Stop input (HIGH = released / safe).
    pub estop: u32,
    /// Door / tray interlock input (HIGH = closed / safe).
    pub door: u32,
    /// Heartbeat return input (HIGH = hardware heartbeat present).
    pub heartbeat_in: u32,
    /// Heartbeat drive output, held HIGH while the controller runs.
    pub heartbeat_out: u32,
    /// HV enable relay output.
    pub hv_enable: u32,
    /// Camera trigger output.
    pub cam_trigger: u32,
    /// Camera preview-enable output.
    pub cam_preview: u32,
    /// Red status LED.
    pub led_red: u32,
    /// Amber status LED.
    pub led_amber: u32,
    /// Green status LED.
    pub led_green: u32,
    /// Blue status LED.
    pub led_blue: u32,
    /// Tray open limit switch (LOW = reached).
    pub tray_open_limit: u32,
    /// Tray close limit switch (LOW = reached).
    pub tray_close_limit: u32,
    /// Alignment origin limit switch (LOW = reached).
    pub align_origin_limit: u32,
    /// Alignment stepper coils IN1..IN4.
    pub align_coils: [u32; 4],
    /// Rotation stepper coils IN1..IN4.
    pub rotation_coils: [u32; 4],
    /// HV monitor ADC channel.
    pub hv_adc_channel: u32,
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            estop: 26,
            door: 27,
            heartbeat_in: 4,
            heartbeat_out: 21,
            hv_enable: 23,
            cam_trigger: 13,
            cam_preview: 7,
            led_red: 8,
            led_amber: 9,
            led_green: 10,
            led_blue: 11,
            tray_open_limit: 17,
            tray_close_limit: 18,
            align_origin_limit: 22,
            align_coils: [19, 20, 12, 24],
            rotation_coils: [16, 6, 5, 25],
            hv_adc_channel: 0,
        }
    }
}

impl PinMap {
    /// All digital lines with their role names.
    pub fn digital_lines(&self) -> Vec<(&'static str, u32)> {
        let mut lines = vec![
            ("estop", self.estop),
            ("door", self.door),
            ("heartbeat_in", self.heartbeat_in),
            ("heartbeat_out", self.heartbeat_out),
            ("hv_enable", self.hv_enable),
            ("cam_trigger", self.cam_trigger),
            ("cam_preview", self.cam_preview),
            ("led_red", self.led_red),
            ("led_amber", self.led_amber),
            ("led_green", self.led_green),
            ("led_blue", self.led_blue),
            ("tray_open_limit", self.tray_open_limit),
            ("tray_close_limit", self.tray_close_limit),
            ("align_origin_limit", self.align_origin_limit),
        ];
        lines.extend(self.align_coils.iter().map(|&l| ("align_coil", l)));
        lines.extend(self.rotation_coils.iter().map(|&l| ("rotation_coil", l)));
        lines
    }

    /// Validate that no line is assigned to two roles.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (role, line) in self.digital_lines() {
            if !seen.insert(line) {
                return Err(ConfigError::ValidationError(format!(
                    "pin {line} ({role}) assigned more than once"
                )));
            }
        }
        Ok(())
    }
}
