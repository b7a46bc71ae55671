//! Axis 3: rotation stage.
//!
//! No position sensor. The axis counts net half-steps since the last home
//! and homes by reversing exactly that count. `homed` is false until the
//! first `home()` after start-up, and again after every rotation.

use super::stepper::Stepper;
use crate::error::ControllerError;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use xray_common::hal::types::Direction;

const AXIS: &str = "rotation";

/// Relative position of an axis without absolute feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisState {
    /// Reference established since start-up and not moved off since.
    pub homed: bool,
    /// Net half-steps taken since the last home (forward positive).
    pub net_steps_from_home: i64,
}

/// Rotation axis.
pub struct RotationAxis {
    stepper: Stepper,
    steps_per_increment: u64,
    state: AxisState,
}

impl RotationAxis {
    /// New axis, not homed.
    pub fn new(stepper: Stepper, steps_per_increment: u64) -> Self {
        Self {
            stepper,
            steps_per_increment,
            state: AxisState::default(),
        }
    }

    /// Current axis state.
    #[inline]
    pub const fn state(&self) -> AxisState {
        self.state
    }

    /// Advance one increment forward. Returns steps issued.
    pub fn rotate_step(&mut self, halt: &AtomicBool) -> Result<u64, ControllerError> {
        self.state.homed = false;
        let result = self.run(Direction::Forward, self.steps_per_increment, halt);
        self.finish(result)
    }

    /// Reverse the accumulated net steps. Returns steps issued.
    pub fn home(&mut self, halt: &AtomicBool) -> Result<u64, ControllerError> {
        let net = self.state.net_steps_from_home;
        let dir = if net >= 0 {
            Direction::Reverse
        } else {
            Direction::Forward
        };
        let result = self.run(dir, net.unsigned_abs(), halt).inspect(|issued| {
            self.state.homed = true;
            info!("Rotation homed ({issued} steps)");
        });
        self.finish(result)
    }

    fn run(&mut self, dir: Direction, steps: u64, halt: &AtomicBool) -> Result<u64, ControllerError> {
        for issued in 0..steps {
            if halt.load(Ordering::Acquire) {
                return Err(ControllerError::MotionIncomplete {
                    axis: AXIS,
                    reason: format!("halted after {issued} steps"),
                });
            }
            self.stepper.step(dir)?;
            self.state.net_steps_from_home += dir.sign();
        }
        Ok(steps)
    }

    fn finish(&mut self, result: Result<u64, ControllerError>) -> Result<u64, ControllerError> {
        if let Err(e) = self.stepper.release() {
            warn!("Rotation coil release failed: {e}");
            if result.is_ok() {
                return Err(e.into());
            }
        }
        result
    }
}
