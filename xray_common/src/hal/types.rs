//! Small value types exchanged with HAL drivers.

use serde::{Deserialize, Serialize};

/// Command understood by the remote motion controller driving the tray
/// axis. Each command advances the carriage by one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionCommand {
    /// One step towards the closed position.
    StepForward,
    /// One step towards the open position.
    StepBackward,
}

impl MotionCommand {
    /// Line-oriented wire encoding sent over the serial link.
    #[inline]
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::StepForward => b"M1F\n",
            Self::StepBackward => b"M1B\n",
        }
    }
}

/// Step direction for stepper-driven axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Walk the commutation table forward.
    Forward,
    /// Walk the commutation table backward.
    Reverse,
}

impl Direction {
    /// Signed unit step.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }

    /// The opposite direction.
    #[inline]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn motion_command_wire_encoding() {
        assert_eq!(MotionCommand::StepForward.as_bytes(), b"M1F\n");
        assert_eq!(MotionCommand::StepBackward.as_bytes(), b"M1B\n");
    }

    #[test]
    fn direction_sign_and_reverse() {
        assert_eq!(Direction::Forward.sign(), 1);
        assert_eq!(Direction::Reverse.sign(), -1);
        assert_eq!(Direction::Forward.reversed(), Direction::Reverse);
    }
}
