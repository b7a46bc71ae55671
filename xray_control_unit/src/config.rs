//! Controller configuration (TOML) with validation.
//!
//! One file configures the whole controller process. Every section has
//! defaults, so an empty file yields a working bench configuration on the
//! simulation driver.
//!
//! ```toml
//! [shared]
//! service_name = "xray-controller"
//!
//! [hal]
//! driver = "sysfs"
//!
//! [timing]
//! pre_roll_s = 0.5
//! post_hold_s = 0.5
//!
//! [latch]
//! policy = "manual"
//! ```

use crate::safety::latch::ClearPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use xray_common::config::{ConfigError, SharedConfig, Validate, check_range};
use xray_common::consts::MAX_CANCEL_LATENCY_S;
use xray_common::hal::config::{HalConfig, PinMap};
use xray_common::heartbeat::HeartbeatConfig;

// ─── Root ───────────────────────────────────────────────────────────

/// Complete controller configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// `[shared]`
    pub shared: SharedConfig,
    /// `[hal]`
    pub hal: HalConfig,
    /// `[pins]`
    pub pins: PinMap,
    /// `[adc]`
    pub adc: AdcConfig,
    /// `[timing]`
    pub timing: TimingConfig,
    /// `[heartbeat]`
    pub heartbeat: HeartbeatConfig,
    /// `[actuators]`
    pub actuators: ActuatorConfig,
    /// `[latch]`
    pub latch: LatchConfig,
}

impl Validate for ControllerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.hal.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "hal.driver cannot be empty".to_string(),
            ));
        }
        self.pins.validate()?;
        self.adc.validate()?;
        self.timing.validate()?;
        self.heartbeat.validate()?;
        self.actuators.validate()
    }
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

// ─── ADC / HV Monitor ───────────────────────────────────────────────

fn default_multiplier() -> f64 {
    2.0 * std::f64::consts::SQRT_2 * 400.0 * 12.0
}

/// `[adc]` section: HV monitor sampling and calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    /// Sampling period [s].
    pub sample_period_s: f64,
    /// Volts per ADC count.
    pub lsb_volts: f64,
    /// Readings with magnitude below this are clamped to 0 [V].
    pub noise_floor_v: f64,
    /// Calibration: `hv = (scale·v + offset)·multiplier`.
    pub scale: f64,
    /// Calibration offset.
    pub offset: f64,
    /// Calibration multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Alarm when the ADC voltage reaches this level [V].
    pub alarm_threshold_v: f64,
    /// Lower edge of the nominal band [V].
    pub band_low_v: f64,
    /// Upper edge of the nominal band [V].
    pub band_high_v: f64,
    /// Fault the controller on alarm during Expose/Preview.
    pub cut_hv_on_alarm: bool,
}

impl AdcConfig {
    /// Minimum sampling period [s].
    pub const MIN_SAMPLE_PERIOD_S: f64 = 0.01;
    /// Maximum sampling period [s].
    pub const MAX_SAMPLE_PERIOD_S: f64 = 1.0;

    /// Sampling period as a `Duration`.
    pub fn sample_period(&self) -> Duration {
        secs(self.sample_period_s)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "adc.sample_period_s",
            self.sample_period_s,
            Self::MIN_SAMPLE_PERIOD_S,
            Self::MAX_SAMPLE_PERIOD_S,
        )?;
        if !(self.lsb_volts > 0.0 && self.lsb_volts.is_finite()) {
            return Err(ConfigError::ValidationError(
                "adc.lsb_volts must be positive".to_string(),
            ));
        }
        check_range("adc.noise_floor_v", self.noise_floor_v, 0.0, 1.0)?;
        if self.band_low_v >= self.band_high_v {
            return Err(ConfigError::ValidationError(format!(
                "adc.band_low_v ({}) must be below adc.band_high_v ({})",
                self.band_low_v, self.band_high_v
            )));
        }
        Ok(())
    }
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            sample_period_s: 0.1,
            lsb_volts: 6.144 / 32767.0,
            noise_floor_v: 0.01,
            scale: 2.0,
            offset: 0.7,
            multiplier: default_multiplier(),
            alarm_threshold_v: 1.815,
            band_low_v: 1.485,
            band_high_v: 1.815,
            cut_hv_on_alarm: true,
        }
    }
}

// ─── Timing ─────────────────────────────────────────────────────────

/// `[timing]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Gap between the two reads of a debounced input [s].
    pub debounce_s: f64,
    /// Interlock poll loop period [s].
    pub interlock_period_s: f64,
    /// HV on before the trigger asserts [s].
    pub pre_roll_s: f64,
    /// HV held on after the trigger clears [s].
    pub post_hold_s: f64,
    /// Interlock polling tick during an exposure [s].
    pub exposure_tick_s: f64,
    /// Preview poll period: timeout and interlocks while in Preview [s].
    pub preview_poll_s: f64,
    /// Longest accepted shutter time [s].
    pub max_exposure_s: f64,
}

impl TimingConfig {
    /// Debounce gap.
    pub fn debounce(&self) -> Duration {
        secs(self.debounce_s)
    }
    /// Interlock poll period.
    pub fn interlock_period(&self) -> Duration {
        secs(self.interlock_period_s)
    }
    /// Pre-roll.
    pub fn pre_roll(&self) -> Duration {
        secs(self.pre_roll_s)
    }
    /// Post-hold.
    pub fn post_hold(&self) -> Duration {
        secs(self.post_hold_s)
    }
    /// Exposure tick.
    pub fn exposure_tick(&self) -> Duration {
        secs(self.exposure_tick_s)
    }
    /// Preview poll period.
    pub fn preview_poll(&self) -> Duration {
        secs(self.preview_poll_s)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range("timing.debounce_s", self.debounce_s, 0.001, 0.05)?;
        check_range("timing.interlock_period_s", self.interlock_period_s, 0.01, 1.0)?;
        check_range("timing.pre_roll_s", self.pre_roll_s, 0.0, 5.0)?;
        check_range("timing.post_hold_s", self.post_hold_s, 0.0, 5.0)?;
        check_range("timing.exposure_tick_s", self.exposure_tick_s, 0.001, 0.05)?;
        check_range("timing.preview_poll_s", self.preview_poll_s, 0.01, 0.1)?;
        check_range("timing.max_exposure_s", self.max_exposure_s, 0.1, 600.0)?;
        // Hazardous states re-check interlocks on these ticks, not the interlock loop.
        cancel_bound("timing.exposure_tick_s", self.exposure_tick_s, self.debounce_s)?;
        cancel_bound("timing.preview_poll_s", self.preview_poll_s, self.debounce_s)
    }
}

fn cancel_bound(name: &str, period_s: f64, debounce_s: f64) -> Result<(), ConfigError> {
    let worst = period_s + debounce_s;
    if worst > MAX_CANCEL_LATENCY_S {
        return Err(ConfigError::ValidationError(format!(
            "{name} + timing.debounce_s = {worst:.3}s exceeds {MAX_CANCEL_LATENCY_S}s"
        )));
    }
    Ok(())
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_s: 0.02,
            interlock_period_s: 0.1,
            pre_roll_s: 0.5,
            post_hold_s: 0.5,
            exposure_tick_s: 0.005,
            preview_poll_s: 0.05,
            max_exposure_s: 60.0,
        }
    }
}

// ─── Actuators ──────────────────────────────────────────────────────

/// `[actuators]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// Delay between serial step commands to the tray controller [s].
    pub tray_command_interval_s: f64,
    /// Give up on a tray move after this many commands.
    pub tray_max_commands: u64,
    /// Half-step delay of the alignment stepper [s].
    pub align_step_delay_s: f64,
    /// Steps from the origin switch to the aligned position.
    pub align_traverse_steps: u64,
    /// Give up homing the alignment axis after this many steps.
    pub align_max_homing_steps: u64,
    /// Refuse alignment unless the tray sits on its close limit.
    pub align_requires_tray_closed: bool,
    /// Half-step delay of the rotation stepper [s].
    pub rotation_step_delay_s: f64,
    /// Half-steps per rotation increment (45°).
    pub rotation_steps_per_increment: u64,
}

impl ActuatorConfig {
    /// Tray command interval.
    pub fn tray_command_interval(&self) -> Duration {
        secs(self.tray_command_interval_s)
    }
    /// Alignment half-step delay.
    pub fn align_step_delay(&self) -> Duration {
        secs(self.align_step_delay_s)
    }
    /// Rotation half-step delay.
    pub fn rotation_step_delay(&self) -> Duration {
        secs(self.rotation_step_delay_s)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "actuators.tray_command_interval_s",
            self.tray_command_interval_s,
            0.0,
            0.1,
        )?;
        check_range("actuators.align_step_delay_s", self.align_step_delay_s, 0.0, 0.05)?;
        check_range(
            "actuators.rotation_step_delay_s",
            self.rotation_step_delay_s,
            0.0,
            0.05,
        )?;
        if self.tray_max_commands == 0 || self.align_max_homing_steps == 0 {
            return Err(ConfigError::ValidationError(
                "actuator motion bounds must be non-zero".to_string(),
            ));
        }
        if self.rotation_steps_per_increment == 0 {
            return Err(ConfigError::ValidationError(
                "actuators.rotation_steps_per_increment must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            tray_command_interval_s: 0.002,
            tray_max_commands: 20_000,
            align_step_delay_s: 0.0015,
            align_traverse_steps: 6895,
            align_max_homing_steps: 20_000,
            align_requires_tray_closed: true,
            rotation_step_delay_s: 0.002,
            rotation_steps_per_increment: 512,
        }
    }
}

// ─── Latch ──────────────────────────────────────────────────────────

/// `[latch]` section.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatchConfig {
    /// E-Stop latch clearing policy.
    pub policy: ClearPolicy,
}

// ─── Tests ──────────────────────────────────────────────────────────
