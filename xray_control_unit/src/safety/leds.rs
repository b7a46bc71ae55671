//! Status LED annunciation.
//!
//! | LED   | Lit when                          |
//! |-------|-----------------------------------|
//! | red   | HV alarm, or controller in FAULT  |
//! | amber | interlocks not satisfied, not FAULT |
//! | green | ARMED with interlocks satisfied   |
//! | blue  | EXPOSE or PREVIEW                 |

use crate::state::ControllerState;
use bitflags::bitflags;
use tracing::warn;
use xray_hal::LedOutputs;

bitflags! {
    /// Lit LEDs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LedPattern: u8 {
        /// Red.
        const RED   = 1 << 0;
        /// Amber.
        const AMBER = 1 << 1;
        /// Green.
        const GREEN = 1 << 2;
        /// Blue.
        const BLUE  = 1 << 3;
    }
}

/// LED pattern for the given conditions.
pub fn annunciate(hv_alarm: bool, interlocks_ok: bool, state: ControllerState) -> LedPattern {
    let fault = state == ControllerState::Fault;
    let mut p = LedPattern::empty();
    p.set(LedPattern::RED, hv_alarm || fault);
    p.set(LedPattern::AMBER, !interlocks_ok && !fault);
    p.set(LedPattern::GREEN, state == ControllerState::Armed && interlocks_ok);
    p.set(LedPattern::BLUE, state.is_hazardous());
    p
}

/// The four status LEDs.
pub struct LedPanel {
    leds: LedOutputs,
}

impl LedPanel {
    /// Wrap the LED outputs.
    pub fn new(leds: LedOutputs) -> Self {
        Self { leds }
    }

    /// Drive the LEDs to `pattern`. LED failures are logged, never fatal.
    pub fn apply(&self, pattern: LedPattern) {
        let lines = [
            (&self.leds.red, LedPattern::RED),
            (&self.leds.amber, LedPattern::AMBER),
            (&self.leds.green, LedPattern::GREEN),
            (&self.leds.blue, LedPattern::BLUE),
        ];
        for (out, bit) in lines {
            if let Err(e) = out.write(pattern.contains(bit)) {
                warn!("LED line {} write failed: {}", out.line(), e);
            }
        }
    }

    /// All LEDs off.
    pub fn clear(&self) {
        self.apply(LedPattern::empty());
    }
}
