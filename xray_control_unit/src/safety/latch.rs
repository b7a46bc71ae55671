//! E-Stop fault latch.
//!
//! Pressing the E-Stop latches a fault that survives the button being
//! released. The latch fires its callback exactly once per press, from
//! whichever thread first observes the falling edge.
//!
//! ```text
//!              press                release (Manual)
//!   Released ────────► Pressed ─────────────────────► Latched
//!       ▲                 ▲  │ release (Auto)            │
//!       │                 │  └──────────► Released     │ press
//!       │                 └────────────────────────────┘
//!       └──────────────── reset() ─────────── Latched
//! ```

use crate::safety::interlock::read_level;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{info, warn};
use xray_common::hal::driver::DigitalInput;

/// When a released E-Stop clears the latch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearPolicy {
    /// Only an explicit reset clears the latch.
    #[default]
    Manual,
    /// Releasing the button clears the latch.
    Auto,
}

/// Latch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LatchState {
    /// Button released, no latched fault.
    Released = 0,
    /// Button currently pressed.
    Pressed = 1,
    /// Button released, fault still latched.
    Latched = 2,
}

impl LatchState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Released,
            1 => Self::Pressed,
            _ => Self::Latched,
        }
    }
}

type FaultCallback = Box<dyn Fn() + Send + Sync>;

/// E-Stop latch.
pub struct FaultLatch {
    estop: Arc<dyn DigitalInput>,
    policy: ClearPolicy,
    state: AtomicU8,
    on_fault: Mutex<Option<FaultCallback>>,
}

impl FaultLatch {
    /// New latch in `Released`.
    pub fn new(estop: Arc<dyn DigitalInput>, policy: ClearPolicy) -> Self {
        Self {
            estop,
            policy,
            state: AtomicU8::new(LatchState::Released as u8),
            on_fault: Mutex::new(None),
        }
    }

    /// Register the press callback, replacing any previous one.
    pub fn set_on_fault(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.on_fault.lock() = Some(Box::new(callback));
    }

    /// Current state.
    pub fn state(&self) -> LatchState {
        LatchState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Feed a debounced E-Stop level (`true` = released).
    pub fn observe(&self, estop_ok: bool) {
        if !estop_ok {
            let prev = self.state.swap(LatchState::Pressed as u8, Ordering::AcqRel);
            if LatchState::from_u8(prev) != LatchState::Pressed {
                warn!("E-Stop pressed");
                if let Some(cb) = self.on_fault.lock().as_ref() {
                    cb();
                }
            }
            return;
        }

        let released = match self.policy {
            ClearPolicy::Manual => LatchState::Latched,
            ClearPolicy::Auto => LatchState::Released,
        };
        if self
            .state
            .compare_exchange(
                LatchState::Pressed as u8,
                released as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            info!("E-Stop released, latch {:?}", released);
        }
    }

    /// Fault latched or button held.
    pub fn faulted(&self) -> bool {
        self.state() != LatchState::Released
    }

    /// Single undebounced read of the E-Stop (`true` = released).
    pub fn estop_ok_now(&self) -> bool {
        read_level(self.estop.as_ref())
    }

    /// Clear the latch. Fails while the button is held or reads pressed.
    pub fn reset(&self) -> Result<(), &'static str> {
        if self.state() == LatchState::Pressed || !self.estop_ok_now() {
            return Err("E-Stop still pressed");
        }
        self.state
            .store(LatchState::Released as u8, Ordering::Release);
        Ok(())
    }
}
