//! Debounced interlock sampling.
//!
//! All three inputs are active-HIGH: E-Stop released, door closed and the
//! hardware heartbeat return present each read HIGH. A snapshot reads the
//! three lines, waits one debounce gap, reads them again, and reports an
//! input as satisfied only if both reads were HIGH. A read error counts as
//! not satisfied.
//!
//! The last snapshot is cached in an atomic so LED refresh and status
//! queries never touch hardware.

use bitflags::bitflags;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::Duration;
use tracing::warn;
use xray_common::hal::driver::DigitalInput;
use xray_hal::InterlockInputs;

bitflags! {
    /// Satisfied interlocks packed for lock-free caching.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterlockFlags: u8 {
        /// E-Stop released.
        const ESTOP_OK     = 1 << 0;
        /// Door closed.
        const DOOR_OK      = 1 << 1;
        /// Hardware heartbeat present.
        const HEARTBEAT_OK = 1 << 2;
    }
}

/// One debounced reading of the interlock inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InterlockSnapshot {
    /// E-Stop released.
    pub estop_ok: bool,
    /// Door closed.
    pub door_ok: bool,
    /// Hardware heartbeat present.
    pub heartbeat_ok: bool,
}

impl InterlockSnapshot {
    /// Every interlock satisfied.
    #[inline]
    pub const fn all_ok(&self) -> bool {
        self.estop_ok && self.door_ok && self.heartbeat_ok
    }

    /// Pack into flags.
    pub fn flags(&self) -> InterlockFlags {
        let mut f = InterlockFlags::empty();
        f.set(InterlockFlags::ESTOP_OK, self.estop_ok);
        f.set(InterlockFlags::DOOR_OK, self.door_ok);
        f.set(InterlockFlags::HEARTBEAT_OK, self.heartbeat_ok);
        f
    }

    /// Unpack from flags.
    pub fn from_flags(f: InterlockFlags) -> Self {
        Self {
            estop_ok: f.contains(InterlockFlags::ESTOP_OK),
            door_ok: f.contains(InterlockFlags::DOOR_OK),
            heartbeat_ok: f.contains(InterlockFlags::HEARTBEAT_OK),
        }
    }
}

impl fmt::Display for InterlockSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |ok: bool| if ok { "ok" } else { "OPEN" };
        write!(
            f,
            "estop={} door={} heartbeat={}",
            mark(self.estop_ok),
            mark(self.door_ok),
            mark(self.heartbeat_ok)
        )
    }
}

/// Read one input, mapping errors to "not satisfied".
pub(crate) fn read_level(input: &dyn DigitalInput) -> bool {
    match input.read() {
        Ok(high) => high,
        Err(e) => {
            warn!("Interlock line {} read failed: {}", input.line(), e);
            false
        }
    }
}

/// Debounced interlock monitor.
pub struct InterlockMonitor {
    inputs: InterlockInputs,
    debounce: Duration,
    last: AtomicU8,
}

impl InterlockMonitor {
    /// New monitor. The cached snapshot starts with every interlock open.
    pub fn new(inputs: InterlockInputs, debounce: Duration) -> Self {
        Self {
            inputs,
            debounce,
            last: AtomicU8::new(InterlockFlags::empty().bits()),
        }
    }

    fn raw(&self) -> InterlockSnapshot {
        InterlockSnapshot {
            estop_ok: read_level(self.inputs.estop.as_ref()),
            door_ok: read_level(self.inputs.door.as_ref()),
            heartbeat_ok: read_level(self.inputs.heartbeat.as_ref()),
        }
    }

    /// Take a debounced snapshot and cache it. Blocks for one debounce gap.
    pub fn snapshot(&self) -> InterlockSnapshot {
        let first = self.raw();
        thread::sleep(self.debounce);
        let second = self.raw();
        let snap = InterlockSnapshot {
            estop_ok: first.estop_ok && second.estop_ok,
            door_ok: first.door_ok && second.door_ok,
            heartbeat_ok: first.heartbeat_ok && second.heartbeat_ok,
        };
        self.last.store(snap.flags().bits(), Ordering::Release);
        snap
    }

    /// Most recent cached snapshot, without touching hardware.
    pub fn last(&self) -> InterlockSnapshot {
        InterlockSnapshot::from_flags(InterlockFlags::from_bits_truncate(
            self.last.load(Ordering::Acquire),
        ))
    }
}
