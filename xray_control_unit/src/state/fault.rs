//! Sticky fault record.

use crate::error::FaultReason;
use std::time::SystemTime;

/// Why and since when the controller is faulted.
///
/// Set by the first fault after a reset; later faults while active only
/// get logged. Cleared only by a successful reset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaultRecord {
    /// Fault currently latched.
    pub active: bool,
    /// Cause of the latched fault.
    pub reason: Option<FaultReason>,
    /// Time the fault was latched.
    pub since: Option<SystemTime>,
    /// Operator-facing description.
    pub message: String,
}

impl FaultRecord {
    /// Latch `reason` unless a fault is already active. Returns `true` if
    /// this call latched it.
    pub fn raise(&mut self, reason: FaultReason, message: &str) -> bool {
        if self.active {
            return false;
        }
        *self = Self {
            active: true,
            reason: Some(reason),
            since: Some(SystemTime::now()),
            message: message.to_string(),
        };
        true
    }

    /// Clear the record.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
