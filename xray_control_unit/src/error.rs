//! Controller error taxonomy.
//!
//! `CommandRejected` is local and recoverable: nothing changed. Interlock
//! violations and HV alarms that occur *during* a hazardous operation are
//! never returned here; they drive the Fault transition and are reported
//! through notifications. Monitor read failures count as "not ok" rather
//! than propagating.

use crate::safety::interlock::InterlockSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use xray_common::config::ConfigError;
use xray_common::hal::driver::HalError;
use xray_common::heartbeat::HeartbeatError;

/// Controller operation error.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// State guard refused the command; no state change.
    #[error("{command} rejected: {reason}")]
    CommandRejected {
        /// Command name.
        command: &'static str,
        /// Why it was refused.
        reason: String,
    },

    /// Interlocks not satisfied when the command was issued.
    #[error("interlock violation: {0}")]
    InterlockViolation(InterlockSnapshot),

    /// HV monitor reports an alarm; hazardous commands are refused.
    #[error("HV alarm active: {0}")]
    HvAlarm(String),

    /// Relay, ADC, GPIO or serial failure.
    #[error("hardware I/O error: {0}")]
    HardwareIo(#[from] HalError),

    /// Axis stopped before reaching its target.
    #[error("{axis} motion incomplete: {reason}")]
    MotionIncomplete {
        /// Axis name.
        axis: &'static str,
        /// Why motion stopped.
        reason: String,
    },

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Heartbeat / shutdown-flag file failure.
    #[error(transparent)]
    Heartbeat(#[from] HeartbeatError),

    /// Background task could not be started.
    #[error("failed to spawn background task: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ControllerError {
    /// Shorthand for [`ControllerError::CommandRejected`].
    pub fn rejected(command: &'static str, reason: impl Into<String>) -> Self {
        Self::CommandRejected {
            command,
            reason: reason.into(),
        }
    }
}

/// Cause of a Fault transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultReason {
    /// E-Stop pressed.
    EStop,
    /// Door or other interlock opened during a hazardous operation.
    InterlockViolation,
    /// Hardware heartbeat input lost.
    HeartbeatLost,
    /// HV monitor alarm while X-rays were on.
    HvAlarm,
    /// Output write or monitor read failed.
    HardwareIo,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::EStop => "E-Stop",
            Self::InterlockViolation => "interlock violation",
            Self::HeartbeatLost => "heartbeat lost",
            Self::HvAlarm => "HV alarm",
            Self::HardwareIo => "hardware I/O",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_message_names_command() {
        let e = ControllerError::rejected("expose", "controller in FAULT");
        assert_eq!(e.to_string(), "expose rejected: controller in FAULT");
    }

    #[test]
    fn hal_errors_convert() {
        let e: ControllerError = HalError::line(23, "EIO").into();
        assert!(matches!(e, ControllerError::HardwareIo(_)));
        assert!(e.to_string().contains("line 23"));
    }

    #[test]
    fn fault_reason_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&FaultReason::HeartbeatLost).unwrap(),
            "\"heartbeat_lost\""
        );
        assert_eq!(FaultReason::EStop.to_string(), "E-Stop");
    }
}
