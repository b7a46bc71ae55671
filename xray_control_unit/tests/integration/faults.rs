//! Integration test: monitor loops driving the Fault transition.

use super::{ALARM_COUNTS, Rig};
use std::thread;
use std::time::{Duration, Instant};
use xray_control_unit::{ControllerError, ControllerState, FaultReason};

const DETECT: Duration = Duration::from_millis(500);
const STOP_LATENCY: Duration = Duration::from_millis(100);

#[test]
fn door_opened_during_preview_faults() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();
    assert!(rig.sim.output(rig.pins.hv_enable));

    let opened_at = Instant::now();
    rig.sim.set_input(rig.pins.door, false);
    rig.wait_for(ControllerState::Fault, DETECT);

    assert!(rig.hazards_off());
    let hv_off = rig.first_write(rig.pins.hv_enable, false, opened_at).unwrap();
    assert!(hv_off - opened_at <= STOP_LATENCY, "HV off after {:?}", hv_off - opened_at);
    assert_eq!(
        rig.ctl.fault_record().reason,
        Some(FaultReason::InterlockViolation)
    );
    assert!(rig.sim.output(rig.pins.led_red));
}

#[test]
fn door_open_while_idle_only_warns() {
    let rig = Rig::started();
    rig.sim.set_input(rig.pins.door, false);
    thread::sleep(Duration::from_millis(300));

    assert_eq!(rig.ctl.state(), ControllerState::Idle);
    assert!(rig.sim.output(rig.pins.led_amber));
    assert!(rig.messages().iter().any(|m| m.starts_with("Interlocks open")));

    rig.sim.set_input(rig.pins.door, true);
    thread::sleep(Duration::from_millis(300));
    assert!(!rig.sim.output(rig.pins.led_amber));
    assert!(rig.messages().iter().any(|m| m == "Interlocks OK"));
}

#[test]
fn hardware_heartbeat_loss_faults_from_any_state() {
    let rig = Rig::started();
    rig.ctl.arm().unwrap();
    rig.sim.set_input(rig.pins.heartbeat_in, false);
    rig.wait_for(ControllerState::Fault, DETECT);
    assert_eq!(rig.ctl.fault_record().reason, Some(FaultReason::HeartbeatLost));
    assert!(rig.hazards_off());
}

#[test]
fn hv_alarm_during_preview_faults() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();

    rig.sim.set_analog(rig.pins.hv_adc_channel, ALARM_COUNTS);
    rig.wait_for(ControllerState::Fault, DETECT);

    assert!(rig.hazards_off());
    assert_eq!(rig.ctl.fault_record().reason, Some(FaultReason::HvAlarm));
    let status = rig.ctl.status();
    assert!(status.hv_alarm);
    assert!(status.hv_adc_volts.unwrap() > rig.cfg.adc.alarm_threshold_v);
    assert!(rig.messages().iter().any(|m| m.starts_with("DANGER")));
}

#[test]
fn hv_alarm_refuses_hazardous_commands() {
    let rig = Rig::started();
    rig.sim.set_analog(rig.pins.hv_adc_channel, ALARM_COUNTS);
    thread::sleep(Duration::from_millis(300));

    assert!(matches!(rig.ctl.start_preview(None), Err(ControllerError::HvAlarm(_))));
    assert!(matches!(
        rig.ctl.expose(Duration::from_millis(50)),
        Err(ControllerError::HvAlarm(_))
    ));
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
    assert!(rig.sim.output(rig.pins.led_red));

    rig.sim.set_analog(rig.pins.hv_adc_channel, 0);
    thread::sleep(Duration::from_millis(300));
    rig.ctl.start_preview(None).unwrap();
    rig.ctl.stop_preview().unwrap();
}

#[test]
fn unreadable_hv_monitor_during_preview_faults() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();
    rig.sim.fail_channel(rig.pins.hv_adc_channel, true);
    rig.wait_for(ControllerState::Fault, DETECT);
    assert_eq!(rig.ctl.fault_record().reason, Some(FaultReason::HardwareIo));
    assert!(rig.hazards_off());
}

#[test]
fn first_fault_cause_is_kept() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();
    rig.sim.set_input(rig.pins.door, false);
    rig.wait_for(ControllerState::Fault, DETECT);
    rig.sim.set_input(rig.pins.estop, false);
    thread::sleep(Duration::from_millis(300));

    assert_eq!(
        rig.ctl.fault_record().reason,
        Some(FaultReason::InterlockViolation)
    );
}

#[test]
fn failed_trigger_line_faults_exposure() {
    let rig = Rig::started_with("[timing]\npre_roll_s = 0.05\npost_hold_s = 0.05\n");
    rig.sim.fail_line(rig.pins.cam_trigger, true);
    let outcome = rig.ctl.expose(Duration::from_millis(100)).unwrap();
    assert_eq!(
        outcome,
        xray_control_unit::ExposureOutcome::Faulted(FaultReason::HardwareIo)
    );
    assert!(!rig.sim.output(rig.pins.hv_enable));
    assert_eq!(rig.ctl.state(), ControllerState::Fault);
}
