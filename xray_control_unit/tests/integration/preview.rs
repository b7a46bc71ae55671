//! Integration test: preview mode.

use super::Rig;
use std::thread;
use std::time::{Duration, Instant};
use xray_control_unit::{ControllerError, ControllerState};

#[test]
fn preview_times_out() {
    let rig = Rig::started();
    let start = Instant::now();
    rig.ctl.start_preview(Some(Duration::from_millis(300))).unwrap();
    assert!(rig.sim.output(rig.pins.cam_preview));

    rig.wait_for(ControllerState::Idle, Duration::from_secs(2));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "stopped after {elapsed:?}");
    assert!(rig.hazards_off());
    assert!(rig.messages().iter().any(|m| m.contains("timeout")));
}

#[test]
fn preview_without_timeout_runs_until_stopped() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();
    thread::sleep(Duration::from_millis(400));
    assert_eq!(rig.ctl.state(), ControllerState::Preview);
    assert!(rig.sim.output(rig.pins.hv_enable));
    assert!(rig.sim.output(rig.pins.led_blue));

    rig.ctl.stop_preview().unwrap();
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
    assert!(rig.hazards_off());
}

#[test]
fn second_hazardous_command_is_refused() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();

    assert!(matches!(
        rig.ctl.start_preview(None),
        Err(ControllerError::CommandRejected { command: "preview", .. })
    ));
    assert!(matches!(
        rig.ctl.expose(Duration::from_millis(50)),
        Err(ControllerError::CommandRejected { command: "expose", .. })
    ));
    assert!(matches!(
        rig.ctl.arm(),
        Err(ControllerError::CommandRejected { command: "arm", .. })
    ));
    assert_eq!(rig.ctl.state(), ControllerState::Preview);
    rig.ctl.stop_preview().unwrap();
}

#[test]
fn disarm_ends_preview() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();
    rig.ctl.disarm().unwrap();
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
    assert!(rig.hazards_off());

    // Idempotent.
    rig.ctl.disarm().unwrap();
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
}

#[test]
fn stop_outside_preview_is_rejected() {
    let rig = Rig::started();
    assert!(matches!(
        rig.ctl.stop_preview(),
        Err(ControllerError::CommandRejected { .. })
    ));
    rig.ctl.arm().unwrap();
    assert!(rig.ctl.stop_preview().is_err());
    assert_eq!(rig.ctl.state(), ControllerState::Armed);
}
