//! # Hardware Context
//!
//! Explicit owner of every line and channel the rig uses. Built once at
//! startup from a driver, the `[hal]` section and the `[pins]` map, then
//! shared by `Arc` with the components that need hardware access.
//!
//! ```text
//!   DriverRegistry ──create──► Box<dyn HalDriver>
//!                                    │ init(&HalConfig)
//!                                    ▼
//!   PinMap ───────────────► HardwareContext::open
//!                                    │
//!      ┌─────────────┬───────────────┼──────────────┬─────────────┐
//!      ▼             ▼               ▼              ▼             ▼
//!   interlock     outputs          limits        steppers      adc / link
//!   inputs        (all LOW)
//! ```

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};
use xray_common::hal::config::{HalConfig, PinMap};
use xray_common::hal::driver::{
    AnalogInput, DigitalInput, DigitalOutput, DriverDiagnostics, HalDriver, HalError, MotionLink,
};

/// The three safety interlock inputs.
#[derive(Clone)]
pub struct InterlockInputs {
    /// E-Stop (HIGH = released).
    pub estop: Arc<dyn DigitalInput>,
    /// Door / tray interlock (HIGH = closed).
    pub door: Arc<dyn DigitalInput>,
    /// Hardware heartbeat return (HIGH = present).
    pub heartbeat: Arc<dyn DigitalInput>,
}

/// Status LED outputs.
#[derive(Clone)]
pub struct LedOutputs {
    /// Red.
    pub red: Arc<dyn DigitalOutput>,
    /// Amber.
    pub amber: Arc<dyn DigitalOutput>,
    /// Green.
    pub green: Arc<dyn DigitalOutput>,
    /// Blue.
    pub blue: Arc<dyn DigitalOutput>,
}

/// Limit switch inputs (LOW = reached).
#[derive(Clone)]
pub struct LimitInputs {
    /// Tray fully open.
    pub tray_open: Arc<dyn DigitalInput>,
    /// Tray fully closed.
    pub tray_close: Arc<dyn DigitalInput>,
    /// Alignment origin.
    pub align_origin: Arc<dyn DigitalInput>,
}

/// Four coil outputs of one unipolar stepper.
pub type CoilSet = [Arc<dyn DigitalOutput>; 4];

/// Every hardware handle of the rig.
pub struct HardwareContext {
    /// Safety interlock inputs.
    pub interlocks: InterlockInputs,
    /// Heartbeat drive output.
    pub heartbeat_out: Arc<dyn DigitalOutput>,
    /// HV enable relay.
    pub hv_enable: Arc<dyn DigitalOutput>,
    /// Camera trigger.
    pub cam_trigger: Arc<dyn DigitalOutput>,
    /// Camera preview enable.
    pub cam_preview: Arc<dyn DigitalOutput>,
    /// Status LEDs.
    pub leds: LedOutputs,
    /// Limit switches.
    pub limits: LimitInputs,
    /// Alignment stepper coils.
    pub align_coils: CoilSet,
    /// Rotation stepper coils.
    pub rotation_coils: CoilSet,
    /// HV monitor ADC channel.
    pub hv_adc: Arc<dyn AnalogInput>,
    /// Tray motion controller link.
    pub motion: Arc<dyn MotionLink>,
    driver: Mutex<Box<dyn HalDriver>>,
}

impl HardwareContext {
    /// Initialize `driver` and claim every line in `pins`.
    ///
    /// Outputs are driven LOW by the driver as they are claimed.
    pub fn open(
        mut driver: Box<dyn HalDriver>,
        config: &HalConfig,
        pins: &PinMap,
    ) -> Result<Self, HalError> {
        pins.validate()
            .map_err(|e| HalError::ConfigError(e.to_string()))?;
        driver.init(config)?;
        info!(
            "Opening hardware context on driver {} v{}",
            driver.name(),
            driver.version()
        );

        // Outputs first: the relay must be LOW before anything else happens.
        let hv_enable = driver.digital_output(pins.hv_enable)?;
        let cam_trigger = driver.digital_output(pins.cam_trigger)?;
        let cam_preview = driver.digital_output(pins.cam_preview)?;
        let heartbeat_out = driver.digital_output(pins.heartbeat_out)?;
        let leds = LedOutputs {
            red: driver.digital_output(pins.led_red)?,
            amber: driver.digital_output(pins.led_amber)?,
            green: driver.digital_output(pins.led_green)?,
            blue: driver.digital_output(pins.led_blue)?,
        };
        let align_coils = claim_coils(driver.as_mut(), &pins.align_coils)?;
        let rotation_coils = claim_coils(driver.as_mut(), &pins.rotation_coils)?;

        let interlocks = InterlockInputs {
            estop: driver.digital_input(pins.estop)?,
            door: driver.digital_input(pins.door)?,
            heartbeat: driver.digital_input(pins.heartbeat_in)?,
        };
        let limits = LimitInputs {
            tray_open: driver.digital_input(pins.tray_open_limit)?,
            tray_close: driver.digital_input(pins.tray_close_limit)?,
            align_origin: driver.digital_input(pins.align_origin_limit)?,
        };
        let hv_adc = driver.analog_input(pins.hv_adc_channel)?;
        let motion = driver.motion_link()?;

        Ok(Self {
            interlocks,
            heartbeat_out,
            hv_enable,
            cam_trigger,
            cam_preview,
            leds,
            limits,
            align_coils,
            rotation_coils,
            hv_adc,
            motion,
            driver: Mutex::new(driver),
        })
    }

    /// Name of the driver serving this context.
    pub fn driver_name(&self) -> &'static str {
        self.driver.lock().name()
    }

    /// Driver diagnostics, if the driver provides any.
    pub fn diagnostics(&self) -> Option<DriverDiagnostics> {
        self.driver.lock().diagnostics()
    }

    /// Drive every output LOW. Keeps going past failures and reports the first.
    pub fn all_outputs_low(&self) -> Result<(), HalError> {
        let outputs = [
            &self.hv_enable,
            &self.cam_trigger,
            &self.cam_preview,
            &self.heartbeat_out,
            &self.leds.red,
            &self.leds.amber,
            &self.leds.green,
            &self.leds.blue,
        ]
        .into_iter()
        .chain(self.align_coils.iter())
        .chain(self.rotation_coils.iter());

        let mut first_err = None;
        for out in outputs {
            if let Err(e) = out.write(false) {
                warn!("Failed to drive line {} LOW: {}", out.line(), e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Drive every output LOW and release the driver.
    pub fn shutdown(&self) -> Result<(), HalError> {
        let outputs = self.all_outputs_low();
        self.driver.lock().shutdown()?;
        outputs
    }
}

fn claim_coils(driver: &mut dyn HalDriver, lines: &[u32; 4]) -> Result<CoilSet, HalError> {
    Ok([
        driver.digital_output(lines[0])?,
        driver.digital_output(lines[1])?,
        driver.digital_output(lines[2])?,
        driver.digital_output(lines[3])?,
    ])
}
