//! Controller state transitions.
//!
//! `Idle → Armed → Expose | Preview → Idle`, with `Fault` reachable from
//! every state and left only through an explicit reset.
//!
//! ```text
//!            Arm              StartExposure
//!   Idle ───────────► Armed ───────────────► Expose ──ExposureComplete──► Idle
//!    │                  │      StartPreview
//!    │                  └──────────────────► Preview ──StopPreview──────► Idle
//!    │
//!    └── any ──Fault──► Fault ──ResetFault──► Idle
//! ```
//!
//! The table only encodes which transitions are legal. Interlock checks and
//! output writes happen in the controller around each transition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControllerState {
    /// HV off, not armed.
    Idle,
    /// Interlocks verified, ready for a hazardous operation.
    Armed,
    /// Live preview: HV on, preview line asserted.
    Preview,
    /// Exposure in progress: HV on, trigger asserted during the shutter window.
    Expose,
    /// Latched fault; HV held off until reset.
    Fault,
}

impl ControllerState {
    /// `true` while X-rays may be produced.
    #[inline]
    pub const fn is_hazardous(self) -> bool {
        matches!(self, Self::Expose | Self::Preview)
    }

    /// Upper-case name used in notifications.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Armed => "ARMED",
            Self::Preview => "PREVIEW",
            Self::Expose => "EXPOSE",
            Self::Fault => "FAULT",
        }
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a transition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionResult {
    /// Transition succeeded; carries the new state.
    Ok(ControllerState),
    /// Transition rejected with a reason.
    Rejected(&'static str),
}

impl TransitionResult {
    /// `true` if the transition was accepted.
    #[inline]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Event that can trigger a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// Operator arm request (interlocks already verified).
    Arm,
    /// Operator disarm request.
    Disarm,
    /// Exposure start (interlocks already verified).
    StartExposure,
    /// Exposure sequence finished normally.
    ExposureComplete,
    /// Preview start (interlocks already verified).
    StartPreview,
    /// Preview stopped by operator or timeout.
    StopPreview,
    /// Any fault source.
    Fault,
    /// Operator reset (interlocks already verified).
    ResetFault,
}

/// Controller state holder.
#[derive(Debug, Clone)]
pub struct ControllerStateMachine {
    state: ControllerState,
}

impl ControllerStateMachine {
    /// New machine in `Idle`.
    pub const fn new() -> Self {
        Self {
            state: ControllerState::Idle,
        }
    }

    /// Current state.
    #[inline]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    /// Attempt a transition given an event.
    pub fn handle_event(&mut self, event: ControllerEvent) -> TransitionResult {
        use ControllerEvent as E;
        use ControllerState as S;

        let next = match (self.state, event) {
            // Arming is idempotent.
            (S::Idle | S::Armed, E::Arm) => S::Armed,

            // Hazardous operations start from Idle or Armed only.
            (S::Idle | S::Armed, E::StartExposure) => S::Expose,
            (S::Idle | S::Armed, E::StartPreview) => S::Preview,

            (S::Expose, E::ExposureComplete) => S::Idle,
            (S::Preview, E::StopPreview) => S::Idle,

            // Disarm always lands in Idle, except that Fault is sticky.
            (S::Fault, E::Disarm) => return TransitionResult::Rejected("fault persists until reset"),
            (_, E::Disarm) => S::Idle,

            (_, E::Fault) => S::Fault,
            (S::Fault, E::ResetFault) => S::Idle,

            (S::Fault, _) => return TransitionResult::Rejected("controller in FAULT"),
            (S::Expose | S::Preview, _) => {
                return TransitionResult::Rejected("hazardous operation in progress");
            }
            _ => return TransitionResult::Rejected("invalid transition"),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }
}

impl Default for ControllerStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
