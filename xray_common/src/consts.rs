//! System-wide constants for the X-ray rig workspace.
//!
//! Single source of truth for default paths, cadences and hard limits.
//! Imported by the controller and the watchdog; both processes must agree
//! on the heartbeat file protocol.

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/xray/xray.toml";

/// Default heartbeat file written by the controller.
pub const DEFAULT_HEARTBEAT_FILE: &str = "/tmp/xray_heartbeat";

/// Default clean-shutdown flag file.
pub const DEFAULT_SHUTDOWN_FLAG: &str = "/tmp/xray_shutdown_flag";

/// Heartbeat write cadence [s].
pub const HEARTBEAT_PERIOD_S: f64 = 0.2;

/// Heartbeat age beyond which the watchdog treats the controller as dead [s].
pub const HEARTBEAT_TIMEOUT_S: f64 = 1.0;

/// Watchdog poll interval [s].
pub const WATCHDOG_POLL_S: f64 = 0.25;

/// Upper bound on how long a hazardous operation may take to react to an
/// interlock failure or injected fault [s].
pub const MAX_CANCEL_LATENCY_S: f64 = 0.1;

/// Number of half-steps in the stepper commutation table.
pub const HALF_STEP_PHASES: usize = 8;

/// Number of coils driven per stepper motor.
pub const STEPPER_COILS: usize = 4;
