//! Half-step commutation for a four-coil unipolar stepper.

use std::thread;
use std::time::Duration;
use xray_common::consts::{HALF_STEP_PHASES, STEPPER_COILS};
use xray_common::hal::driver::HalError;
use xray_common::hal::types::Direction;
use xray_hal::CoilSet;

/// Coil pattern for each half-step phase.
pub const HALF_STEP_SEQ: [[bool; STEPPER_COILS]; HALF_STEP_PHASES] = [
    [true, false, false, false],
    [true, true, false, false],
    [false, true, false, false],
    [false, true, true, false],
    [false, false, true, false],
    [false, false, true, true],
    [false, false, false, true],
    [true, false, false, true],
];

/// One stepper motor and its position in the commutation table.
pub struct Stepper {
    coils: CoilSet,
    phase: usize,
    delay: Duration,
}

impl Stepper {
    /// New stepper at phase 0 with the given inter-phase delay.
    pub fn new(coils: CoilSet, delay: Duration) -> Self {
        Self {
            coils,
            phase: 0,
            delay,
        }
    }

    /// Current phase index.
    #[inline]
    pub const fn phase(&self) -> usize {
        self.phase
    }

    /// Advance one half-step in `dir` and wait the inter-phase delay.
    pub fn step(&mut self, dir: Direction) -> Result<(), HalError> {
        self.phase = match dir {
            Direction::Forward => (self.phase + 1) % HALF_STEP_PHASES,
            Direction::Reverse => (self.phase + HALF_STEP_PHASES - 1) % HALF_STEP_PHASES,
        };
        for (coil, &on) in self.coils.iter().zip(HALF_STEP_SEQ[self.phase].iter()) {
            coil.write(on)?;
        }
        thread::sleep(self.delay);
        Ok(())
    }

    /// De-energize every coil. Attempts all four and reports the first failure.
    pub fn release(&self) -> Result<(), HalError> {
        let mut first = None;
        for coil in &self.coils {
            if let Err(e) = coil.write(false) {
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }
}
