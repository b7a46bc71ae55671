//! Integration tests for the X-ray Control Unit.
//!
//! These tests run the full controller against the simulation driver:
//! exposure timing, E-Stop latency, monitor-driven faults, preview, axis
//! guards, operator commands and the heartbeat/shutdown lifecycle.

mod integration;
