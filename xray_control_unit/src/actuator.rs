//! Actuator subsystem: tray, alignment and rotation axes.
//!
//! ```text
//!   Axis 1  tray       serial link  ── open/close limit switches
//!   Axis 2  align      stepper      ── origin switch + calibrated traverse
//!   Axis 3  rotation   stepper      ── relative homing (net step count)
//! ```
//!
//! # Guards
//!
//! - One axis moves at a time. A move needs a [`MotionGuard`] from
//!   [`ActuatorSubsystem::try_begin`]; the guard marks the subsystem busy
//!   until dropped.
//! - Tray motion is refused, before any hardware access, unless the
//!   rotation stage is homed.
//! - Alignment is refused unless the tray sits on its close limit (when
//!   configured).
//! - [`ActuatorSubsystem::halt`] stops the running move at its next step.

pub mod align;
pub mod rotation;
pub mod stepper;
pub mod tray;

use crate::config::ActuatorConfig;
use crate::error::ControllerError;
use align::{AlignAxis, AlignReport};
use parking_lot::Mutex;
use rotation::{AxisState, RotationAxis};
use std::sync::atomic::{AtomicBool, Ordering};
use stepper::Stepper;
use tracing::{info, warn};
use tray::TrayAxis;
use xray_hal::HardwareContext;

/// Proof that the subsystem has been claimed for one move.
pub struct MotionGuard<'a> {
    owner: &'a ActuatorSubsystem,
    command: &'static str,
}

impl MotionGuard<'_> {
    /// Command that claimed the subsystem.
    pub fn command(&self) -> &'static str {
        self.command
    }
}

impl Drop for MotionGuard<'_> {
    fn drop(&mut self) {
        self.owner.busy.store(false, Ordering::Release);
    }
}

/// The three axes behind a single busy flag.
pub struct ActuatorSubsystem {
    tray: TrayAxis,
    align: Mutex<AlignAxis>,
    rotation: Mutex<RotationAxis>,
    busy: AtomicBool,
    halt: AtomicBool,
    align_requires_tray_closed: bool,
}

impl ActuatorSubsystem {
    /// Build the axes from the hardware context.
    pub fn new(hw: &HardwareContext, cfg: &ActuatorConfig) -> Self {
        let tray = TrayAxis::new(
            hw.motion.clone(),
            hw.limits.tray_open.clone(),
            hw.limits.tray_close.clone(),
            cfg.tray_command_interval(),
            cfg.tray_max_commands,
        );
        let align = AlignAxis::new(
            Stepper::new(hw.align_coils.clone(), cfg.align_step_delay()),
            hw.limits.align_origin.clone(),
            cfg.align_traverse_steps,
            cfg.align_max_homing_steps,
        );
        let rotation = RotationAxis::new(
            Stepper::new(hw.rotation_coils.clone(), cfg.rotation_step_delay()),
            cfg.rotation_steps_per_increment,
        );
        Self {
            tray,
            align: Mutex::new(align),
            rotation: Mutex::new(rotation),
            busy: AtomicBool::new(false),
            halt: AtomicBool::new(false),
            align_requires_tray_closed: cfg.align_requires_tray_closed,
        }
    }

    /// Claim the subsystem for `command`. Fails if another move is running.
    pub fn try_begin(&self, command: &'static str) -> Result<MotionGuard<'_>, ControllerError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ControllerError::rejected(command, "another axis is moving"))?;
        self.halt.store(false, Ordering::Release);
        Ok(MotionGuard {
            owner: self,
            command,
        })
    }

    /// A move is in progress.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Stop the running move at its next step.
    pub fn halt(&self) {
        if self.is_busy() {
            warn!("Halting actuator motion");
        }
        self.halt.store(true, Ordering::Release);
    }

    /// Rotation stage state.
    pub fn rotation_state(&self) -> AxisState {
        self.rotation.lock().state()
    }

    fn require_rotation_homed(&self, command: &'static str) -> Result<(), ControllerError> {
        if self.rotation_state().homed {
            Ok(())
        } else {
            Err(ControllerError::rejected(command, "rotation stage not homed"))
        }
    }

    /// Drive the tray to its open limit.
    pub fn open_tray(&self, motion: &MotionGuard<'_>) -> Result<u64, ControllerError> {
        self.require_rotation_homed(motion.command())?;
        info!("Opening tray");
        self.tray.open(&self.halt)
    }

    /// Drive the tray to its close limit.
    pub fn close_tray(&self, motion: &MotionGuard<'_>) -> Result<u64, ControllerError> {
        self.require_rotation_homed(motion.command())?;
        info!("Closing tray");
        self.tray.close(&self.halt)
    }

    /// Home the alignment axis and traverse to the aligned position.
    pub fn align_sample(&self, motion: &MotionGuard<'_>) -> Result<AlignReport, ControllerError> {
        if self.align_requires_tray_closed && !self.tray.is_closed()? {
            return Err(ControllerError::rejected(
                motion.command(),
                "tray not at close limit",
            ));
        }
        info!("Aligning sample");
        self.align.lock().home_to_limit(&self.halt)
    }

    /// Rotate the stage one increment.
    pub fn rotate_step(&self, _motion: &MotionGuard<'_>) -> Result<u64, ControllerError> {
        info!("Rotating stage one increment");
        self.rotation.lock().rotate_step(&self.halt)
    }

    /// Return the rotation stage to its reference.
    pub fn home_rotation(&self, _motion: &MotionGuard<'_>) -> Result<u64, ControllerError> {
        info!("Homing rotation stage");
        self.rotation.lock().home(&self.halt)
    }
}
