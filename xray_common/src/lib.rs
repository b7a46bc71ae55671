//! X-ray Rig Common Library
//!
//! This crate provides the contracts shared by every crate in the
//! workspace: configuration loading, the hardware abstraction traits,
//! and the heartbeat / shutdown-flag file protocol that links the
//! controller process to the independent HV watchdog process.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - System-wide defaults and limits
//! - [`hal`] - Hardware abstraction traits, errors and pin configuration
//! - [`heartbeat`] - Cross-process heartbeat record and shutdown flag
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use xray_common::config::{ConfigLoader, SharedConfig};
//! use xray_common::heartbeat::HeartbeatRecord;
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod heartbeat;
pub mod prelude;
