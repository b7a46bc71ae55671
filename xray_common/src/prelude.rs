//! Prelude module for common re-exports.
//!
//! Consumers can `use xray_common::prelude::*;` to get the configuration
//! loader, HAL contracts and heartbeat protocol without listing paths.
//!
//! # Usage
//!
//! ```rust
//! use xray_common::prelude::*;
//! ```

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, SharedConfig, Validate, check_range, load_validated,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{
    DEFAULT_HEARTBEAT_FILE, DEFAULT_SHUTDOWN_FLAG, HEARTBEAT_PERIOD_S, HEARTBEAT_TIMEOUT_S,
    WATCHDOG_POLL_S,
};

// ─── HAL ────────────────────────────────────────────────────────────
pub use crate::hal::config::{HalConfig, PinMap};
pub use crate::hal::driver::{
    AnalogInput, DigitalInput, DigitalOutput, HalDriver, HalError, MotionLink,
};
pub use crate::hal::types::{Direction, MotionCommand};

// ─── Heartbeat ──────────────────────────────────────────────────────
pub use crate::heartbeat::{
    HeartbeatConfig, HeartbeatError, HeartbeatFile, HeartbeatRecord, ShutdownFlag,
};
