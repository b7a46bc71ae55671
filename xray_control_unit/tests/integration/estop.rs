//! Integration test: E-Stop during an exposure.
//!
//! Pressing the E-Stop mid-shutter must drop HV and the trigger within
//! 100 ms, latch a fault, and hold it until the button is released and
//! the operator resets.

use super::Rig;
use std::thread;
use std::time::{Duration, Instant};
use xray_control_unit::{ControllerError, ControllerState, ExposureOutcome, FaultReason};

const STOP_LATENCY: Duration = Duration::from_millis(100);

#[test]
fn estop_mid_exposure_cuts_hv_and_latches() {
    let rig = Rig::started();
    rig.ctl.arm().unwrap();

    let (outcome, pressed_at) = thread::scope(|s| {
        let presser = s.spawn(|| {
            thread::sleep(Duration::from_secs(1));
            let at = Instant::now();
            rig.sim.set_input(rig.pins.estop, false);
            at
        });
        let outcome = rig.ctl.expose(Duration::from_secs(5)).unwrap();
        (outcome, presser.join().unwrap())
    });

    assert_eq!(outcome, ExposureOutcome::Faulted(FaultReason::EStop));
    assert_eq!(rig.ctl.state(), ControllerState::Fault);
    assert!(rig.hazards_off());

    let hv_off = rig.first_write(rig.pins.hv_enable, false, pressed_at).unwrap();
    let trig_off = rig.first_write(rig.pins.cam_trigger, false, pressed_at).unwrap();
    assert!(hv_off - pressed_at <= STOP_LATENCY, "HV off after {:?}", hv_off - pressed_at);
    assert!(trig_off - pressed_at <= STOP_LATENCY);

    let record = rig.ctl.fault_record();
    assert!(record.active);
    assert_eq!(record.reason, Some(FaultReason::EStop));
    assert!(rig.sim.output(rig.pins.led_red));
}

#[test]
fn estop_during_preview_cuts_hv_within_one_tick() {
    // A slow interlock loop must not stretch the preview cut.
    let rig = Rig::started_with("[timing]\ninterlock_period_s = 0.5\n");
    for _ in 0..5 {
        rig.ctl.start_preview(None).unwrap();
        thread::sleep(Duration::from_millis(137));

        let pressed_at = Instant::now();
        rig.sim.set_input(rig.pins.estop, false);
        rig.wait_for(ControllerState::Fault, Duration::from_millis(500));

        let hv_off = rig.first_write(rig.pins.hv_enable, false, pressed_at).unwrap();
        let preview_off = rig.first_write(rig.pins.cam_preview, false, pressed_at).unwrap();
        assert!(hv_off - pressed_at <= STOP_LATENCY, "HV off after {:?}", hv_off - pressed_at);
        assert!(preview_off - pressed_at <= STOP_LATENCY);

        rig.sim.set_input(rig.pins.estop, true);
        thread::sleep(Duration::from_millis(250));
        rig.ctl.reset_fault().unwrap();
    }
}

#[test]
fn reset_refused_while_pressed_then_accepted() {
    let rig = Rig::started();
    rig.sim.set_input(rig.pins.estop, false);
    rig.wait_for(ControllerState::Fault, Duration::from_millis(500));

    // Fault is sticky: nothing hazardous and no arming while latched.
    assert!(matches!(
        rig.ctl.reset_fault(),
        Err(ControllerError::InterlockViolation(snap)) if !snap.estop_ok
    ));
    assert!(matches!(rig.ctl.arm(), Err(ControllerError::CommandRejected { .. })));
    assert!(rig.ctl.expose(Duration::from_millis(50)).is_err());
    assert!(!rig.sim.output(rig.pins.hv_enable));

    rig.sim.set_input(rig.pins.estop, true);
    // Released but not reset: still faulted.
    thread::sleep(Duration::from_millis(250));
    assert_eq!(rig.ctl.state(), ControllerState::Fault);

    rig.ctl.reset_fault().unwrap();
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
    assert!(!rig.ctl.fault_record().active);
    rig.ctl.arm().unwrap();
}

#[test]
fn disarm_in_fault_keeps_fault() {
    let rig = Rig::started();
    rig.sim.set_input(rig.pins.estop, false);
    rig.wait_for(ControllerState::Fault, Duration::from_millis(500));

    rig.ctl.disarm().unwrap();
    assert_eq!(rig.ctl.state(), ControllerState::Fault);
    assert!(rig.hazards_off());
}

#[test]
fn auto_clear_policy_still_needs_reset_of_controller() {
    let rig = Rig::started_with("[latch]\npolicy = \"auto\"\n");
    rig.sim.set_input(rig.pins.estop, false);
    rig.wait_for(ControllerState::Fault, Duration::from_millis(500));
    rig.sim.set_input(rig.pins.estop, true);
    thread::sleep(Duration::from_millis(250));

    assert_eq!(rig.ctl.state(), ControllerState::Fault);
    rig.ctl.reset_fault().unwrap();
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
}
