//! Integration test: exposure sequence timing.
//!
//! HV on, pre-roll, trigger held for the shutter time, trigger off,
//! post-hold, HV off, back to Idle.

use super::Rig;
use std::time::{Duration, Instant};
use xray_control_unit::{ControllerState, ExposureOutcome};

const TOLERANCE_S: f64 = 0.06;

#[test]
fn armed_exposure_runs_full_sequence() {
    let rig = Rig::started();
    rig.ctl.arm().unwrap();
    assert_eq!(rig.ctl.state(), ControllerState::Armed);
    assert!(rig.sim.output(rig.pins.led_green));

    let start = Instant::now();
    let outcome = rig.ctl.expose(Duration::from_secs(3)).unwrap();
    assert_eq!(outcome, ExposureOutcome::Completed);
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
    assert!(rig.hazards_off());

    let p = &rig.pins;
    let hv_on = rig.first_write(p.hv_enable, true, start).unwrap();
    let trig_on = rig.first_write(p.cam_trigger, true, start).unwrap();
    let trig_off = rig.first_write(p.cam_trigger, false, trig_on).unwrap();
    let hv_off = rig.first_write(p.hv_enable, false, trig_off).unwrap();

    let window = (trig_off - trig_on).as_secs_f64();
    assert!(
        (window - 3.0).abs() <= TOLERANCE_S,
        "trigger window {window:.3}s"
    );
    assert!((trig_on - hv_on).as_secs_f64() >= rig.cfg.timing.pre_roll_s);
    assert!((hv_off - trig_off).as_secs_f64() >= rig.cfg.timing.post_hold_s);
}

#[test]
fn exposure_auto_arms_from_idle() {
    let rig = Rig::started_with("[timing]\npre_roll_s = 0.05\npost_hold_s = 0.05\n");
    assert_eq!(rig.ctl.state(), ControllerState::Idle);

    let outcome = rig.ctl.expose(Duration::from_millis(100)).unwrap();
    assert_eq!(outcome, ExposureOutcome::Completed);
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
    assert!(!rig.sim.output(rig.pins.led_green));
}

#[test]
fn blue_led_only_while_hazardous() {
    let rig = Rig::started_with("[timing]\npre_roll_s = 0.05\npost_hold_s = 0.05\n");
    let start = Instant::now();
    rig.ctl.expose(Duration::from_millis(100)).unwrap();

    let blue = rig.sim.line_history(rig.pins.led_blue);
    assert!(blue.iter().any(|e| e.high && e.at >= start));
    assert!(!rig.sim.output(rig.pins.led_blue));
}

#[test]
fn out_of_range_shutter_is_refused_without_io() {
    let rig = Rig::started();
    let writes = rig.sim.write_count(rig.pins.hv_enable);

    for shutter in [Duration::ZERO, Duration::from_secs(61)] {
        let err = rig.ctl.expose(shutter).unwrap_err();
        assert!(err.to_string().contains("shutter"), "{err}");
    }
    assert_eq!(rig.sim.write_count(rig.pins.hv_enable), writes);
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
}

#[test]
fn door_open_refuses_exposure() {
    let rig = Rig::started();
    rig.sim.set_input(rig.pins.door, false);
    let err = rig.ctl.expose(Duration::from_millis(50)).unwrap_err();
    assert!(matches!(
        err,
        xray_control_unit::ControllerError::InterlockViolation(snap) if !snap.door_ok
    ));
    assert!(rig.hazards_off());
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
}
