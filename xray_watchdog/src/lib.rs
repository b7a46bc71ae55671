//! # X-ray HV Watchdog
//!
//! Last line of defence against a crashed controller. Runs as its own
//! process, holds its own handle on the HV enable line and polls the
//! controller's heartbeat file.
//!
//! ```text
//!   heartbeat fresh?  shutdown flag?   action
//!   ───────────────   ──────────────   ─────────────────────────────
//!   no                no               HV LOW, hv_allowed := false
//!   yes               no               hv_allowed := true
//!   any               yes              nothing (clean exit in progress)
//!   ───────────────────────────────────────────────────────────────
//!   then: HV reads HIGH while !hv_allowed  →  HV LOW
//! ```
//!
//! The watchdog forces HV LOW once at startup, and on any error during a
//! poll.

pub mod config;

pub use config::{WatchdogConfig, WatchdogSection};

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use xray_common::hal::driver::{DigitalOutput, HalError};
use xray_common::heartbeat::{HeartbeatConfig, HeartbeatFile, ShutdownFlag};

/// Watchdog failure.
#[derive(Debug, Error)]
pub enum WatchdogError {
    /// HV line access failed.
    #[error("HV line: {0}")]
    Hal(#[from] HalError),
}

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Heartbeat fresh, HV permitted.
    Healthy,
    /// Shutdown flag present; nothing enforced.
    CleanShutdown,
    /// Heartbeat stale without a shutdown flag; HV forced LOW.
    ControllerLost,
    /// HV found HIGH while not permitted; forced LOW.
    HvForcedOff,
    /// Poll failed; HV forced LOW as a precaution.
    Failed,
}

/// Heartbeat-driven HV kill switch.
pub struct HvWatchdog {
    hv: Arc<dyn DigitalOutput>,
    heartbeat: HeartbeatFile,
    flag: ShutdownFlag,
    timeout: Duration,
    hv_allowed: bool,
}

impl HvWatchdog {
    /// Bind to the HV line and the heartbeat files named in `cfg`.
    pub fn new(hv: Arc<dyn DigitalOutput>, cfg: &HeartbeatConfig) -> Self {
        Self {
            hv,
            heartbeat: HeartbeatFile::new(&cfg.file),
            flag: ShutdownFlag::new(&cfg.shutdown_flag),
            timeout: cfg.timeout(),
            hv_allowed: true,
        }
    }

    /// `true` until a lost controller is detected, and again once its
    /// heartbeat resumes.
    #[inline]
    pub const fn hv_allowed(&self) -> bool {
        self.hv_allowed
    }

    /// Drive HV LOW unconditionally. Run before the first poll.
    pub fn startup(&mut self) -> Result<(), WatchdogError> {
        self.hv.write(false)?;
        info!(
            "Watchdog armed: HV line {} forced LOW, heartbeat {} (timeout {:?})",
            self.hv.line(),
            self.heartbeat.path().display(),
            self.timeout
        );
        Ok(())
    }

    /// One decision step at wall-clock time `now`.
    pub fn poll(&mut self, now: SystemTime) -> Result<PollOutcome, WatchdogError> {
        let alive = self.heartbeat.is_alive(now, self.timeout);
        let clean = self.flag.is_raised();

        if !alive && !clean {
            self.hv.write(false)?;
            if self.hv_allowed {
                error!("Controller heartbeat lost: HV forced OFF");
            }
            self.hv_allowed = false;
            return Ok(PollOutcome::ControllerLost);
        }
        if alive && !clean && !self.hv_allowed {
            info!("Controller heartbeat resumed: HV permitted");
            self.hv_allowed = true;
        }

        if !self.hv_allowed && self.hv.read_back()? {
            warn!("HV HIGH while not permitted: forcing OFF");
            self.hv.write(false)?;
            return Ok(PollOutcome::HvForcedOff);
        }

        Ok(if clean {
            debug!("Shutdown flag present");
            PollOutcome::CleanShutdown
        } else {
            PollOutcome::Healthy
        })
    }

    /// [`poll`](Self::poll), forcing HV LOW if the poll itself fails.
    pub fn tick(&mut self, now: SystemTime) -> PollOutcome {
        match self.poll(now) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Watchdog poll failed: {e}; forcing HV OFF");
                if let Err(e) = self.hv.write(false) {
                    error!("HV force-off failed: {e}");
                }
                PollOutcome::Failed
            }
        }
    }
}
