//! Axis 2: sample alignment.
//!
//! Home by stepping forward until the origin switch asserts (LOW), then
//! traverse a calibrated step count in reverse. The origin switch is the
//! only feedback.

use super::stepper::Stepper;
use crate::error::ControllerError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};
use xray_common::hal::driver::DigitalInput;
use xray_common::hal::types::Direction;

const AXIS: &str = "align";

/// Steps issued by one alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignReport {
    /// Steps taken to find the origin.
    pub homing_steps: u64,
    /// Steps traversed back from the origin.
    pub traverse_steps: u64,
}

/// Alignment axis.
pub struct AlignAxis {
    stepper: Stepper,
    origin: Arc<dyn DigitalInput>,
    traverse_steps: u64,
    max_homing_steps: u64,
}

impl AlignAxis {
    /// New alignment axis.
    pub fn new(
        stepper: Stepper,
        origin: Arc<dyn DigitalInput>,
        traverse_steps: u64,
        max_homing_steps: u64,
    ) -> Self {
        Self {
            stepper,
            origin,
            traverse_steps,
            max_homing_steps,
        }
    }

    /// Home to the origin switch and traverse to the aligned position.
    /// Coils are released on every exit path.
    pub fn home_to_limit(&mut self, halt: &AtomicBool) -> Result<AlignReport, ControllerError> {
        let result = self.run(halt);
        if let Err(e) = self.stepper.release() {
            warn!("Align coil release failed: {e}");
            if result.is_ok() {
                return Err(e.into());
            }
        }
        result
    }

    fn run(&mut self, halt: &AtomicBool) -> Result<AlignReport, ControllerError> {
        let mut homing_steps = 0u64;
        while self.origin.read()? {
            check_halt(halt, "homing")?;
            if homing_steps >= self.max_homing_steps {
                return Err(ControllerError::MotionIncomplete {
                    axis: AXIS,
                    reason: format!("origin not found in {homing_steps} steps"),
                });
            }
            self.stepper.step(Direction::Forward)?;
            homing_steps += 1;
        }
        info!("Align origin found after {homing_steps} steps");

        for _ in 0..self.traverse_steps {
            check_halt(halt, "traverse")?;
            self.stepper.step(Direction::Reverse)?;
        }
        info!("Align traverse of {} steps complete", self.traverse_steps);
        Ok(AlignReport {
            homing_steps,
            traverse_steps: self.traverse_steps,
        })
    }
}

fn check_halt(halt: &AtomicBool, phase: &str) -> Result<(), ControllerError> {
    if halt.load(Ordering::Acquire) {
        return Err(ControllerError::MotionIncomplete {
            axis: AXIS,
            reason: format!("halted during {phase}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use xray_common::config::ConfigLoader;
    use xray_common::hal::config::{HalConfig, PinMap};
    use xray_hal::{HardwareContext, SimHandle, SimulationDriver};

    fn axis(trigger_writes: u64, max: u64) -> (AlignAxis, SimHandle, PinMap) {
        let pins = PinMap::default();
        let hal = HalConfig::from_toml(&format!(
            "[[simulation.write_triggers]]\noutput = {}\nwrites = {}\ninput = {}\nhigh = false\n",
            pins.align_coils[0], trigger_writes, pins.align_origin_limit
        ))
        .unwrap();
        let driver = SimulationDriver::new();
        let sim = driver.handle();
        let hw = HardwareContext::open(Box::new(driver), &hal, &pins).unwrap();
        let stepper = Stepper::new(hw.align_coils.clone(), Duration::ZERO);
        let axis = AlignAxis::new(stepper, hw.limits.align_origin.clone(), 12, max);
        (axis, sim, pins)
    }

    #[test]
    fn homes_then_traverses() {
        // One write at claim time, then one per step.
        let (mut axis, sim, pins) = axis(6, 100);
        let report = axis.home_to_limit(&AtomicBool::new(false)).unwrap();
        assert_eq!(report.homing_steps, 5);
        assert_eq!(report.traverse_steps, 12);
        assert!(pins.align_coils.iter().all(|&l| !sim.output(l)));
    }

    #[test]
    fn missing_origin_is_motion_incomplete() {
        let (mut axis, sim, pins) = axis(1_000, 20);
        let err = axis.home_to_limit(&AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, ControllerError::MotionIncomplete { axis: "align", .. }));
        assert!(pins.align_coils.iter().all(|&l| !sim.output(l)));
    }

    #[test]
    fn halt_releases_coils() {
        let (mut axis, sim, pins) = axis(6, 100);
        let err = axis.home_to_limit(&AtomicBool::new(true)).unwrap_err();
        assert!(err.to_string().contains("halted during homing"));
        assert!(pins.align_coils.iter().all(|&l| !sim.output(l)));
    }
}
