//! Simulated tray carriage.
//!
//! Position 0 is fully open, `travel_steps` is fully closed. Each
//! `StepForward` moves one step towards closed, `StepBackward` one step
//! towards open; the carriage stops hard at either end. Limit switches are
//! pulled up and read LOW while the carriage sits on them.

use xray_common::hal::config::SimTrayConfig;
use xray_common::hal::types::MotionCommand;

/// Carriage position and limit wiring.
#[derive(Debug, Clone, Copy)]
pub struct TrayCarriage {
    cfg: SimTrayConfig,
    position: i64,
}

impl TrayCarriage {
    /// Place the carriage at `start_position`, clamped to the travel range.
    pub fn new(cfg: SimTrayConfig) -> Self {
        let travel = cfg.travel_steps.max(0);
        Self {
            cfg: SimTrayConfig {
                travel_steps: travel,
                ..cfg
            },
            position: cfg.start_position.clamp(0, travel),
        }
    }

    /// Apply one motion command.
    pub fn apply(&mut self, command: MotionCommand) {
        let delta = match command {
            MotionCommand::StepForward => 1,
            MotionCommand::StepBackward => -1,
        };
        self.position = (self.position + delta).clamp(0, self.cfg.travel_steps);
    }

    /// Current position in steps from open.
    #[inline]
    pub const fn position(&self) -> i64 {
        self.position
    }

    /// `(line, level)` of the open limit.
    pub fn open_limit_level(&self) -> (u32, bool) {
        (self.cfg.open_limit, self.position > 0)
    }

    /// `(line, level)` of the close limit.
    pub fn close_limit_level(&self) -> (u32, bool) {
        (self.cfg.close_limit, self.position < self.cfg.travel_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(travel: i64, start: i64) -> SimTrayConfig {
        SimTrayConfig {
            open_limit: 1,
            close_limit: 2,
            travel_steps: travel,
            start_position: start,
        }
    }

    #[test]
    fn carriage_stops_at_ends() {
        let mut t = TrayCarriage::new(cfg(3, 0));
        t.apply(MotionCommand::StepBackward);
        assert_eq!(t.position(), 0);
        for _ in 0..10 {
            t.apply(MotionCommand::StepForward);
        }
        assert_eq!(t.position(), 3);
        assert_eq!(t.close_limit_level(), (2, false));
        assert_eq!(t.open_limit_level(), (1, true));
    }

    #[test]
    fn start_position_is_clamped() {
        let t = TrayCarriage::new(cfg(5, 99));
        assert_eq!(t.position(), 5);
        let t = TrayCarriage::new(cfg(5, -1));
        assert_eq!(t.position(), 0);
    }
}
