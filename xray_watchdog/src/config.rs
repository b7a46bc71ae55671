//! Watchdog configuration.
//!
//! Shares `[hal]`, `[pins]` and `[heartbeat]` with the controller so both
//! processes can read the same file.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use xray_common::config::{ConfigError, SharedConfig, Validate, check_range};
use xray_common::consts::WATCHDOG_POLL_S;
use xray_common::hal::config::{HalConfig, PinMap};
use xray_common::heartbeat::HeartbeatConfig;

/// Complete watchdog configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// `[shared]`
    pub shared: SharedConfig,
    /// `[hal]`
    pub hal: HalConfig,
    /// `[pins]`; only `hv_enable` is used.
    pub pins: PinMap,
    /// `[heartbeat]`
    pub heartbeat: HeartbeatConfig,
    /// `[watchdog]`
    pub watchdog: WatchdogSection,
}

/// `[watchdog]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogSection {
    /// Poll period [s].
    pub poll_s: f64,
}

impl WatchdogSection {
    /// Minimum poll period [s].
    pub const MIN_POLL_S: f64 = 0.01;
    /// Maximum poll period [s].
    pub const MAX_POLL_S: f64 = 1.0;

    /// Poll period as a `Duration`.
    pub fn poll(&self) -> Duration {
        Duration::from_secs_f64(self.poll_s)
    }
}

impl Default for WatchdogSection {
    fn default() -> Self {
        Self {
            poll_s: WATCHDOG_POLL_S,
        }
    }
}

impl Validate for WatchdogConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.heartbeat.validate()?;
        check_range(
            "watchdog.poll_s",
            self.watchdog.poll_s,
            WatchdogSection::MIN_POLL_S,
            WatchdogSection::MAX_POLL_S,
        )?;
        if self.watchdog.poll_s >= self.heartbeat.timeout_s {
            return Err(ConfigError::ValidationError(format!(
                "watchdog.poll_s ({}) must be shorter than heartbeat.timeout_s ({})",
                self.watchdog.poll_s, self.heartbeat.timeout_s
            )));
        }
        Ok(())
    }
}
