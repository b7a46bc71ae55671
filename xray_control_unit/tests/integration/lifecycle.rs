//! Integration test: start-up, heartbeat, notifications and shutdown.

use super::Rig;
use std::thread;
use std::time::{Duration, SystemTime};
use xray_common::heartbeat::{HeartbeatFile, ShutdownFlag};
use xray_control_unit::{ControllerState, ExposureOutcome};

#[test]
fn start_clears_stale_flag_and_beats() {
    let rig = Rig::build("");
    let flag = ShutdownFlag::new(&rig.cfg.heartbeat.shutdown_flag);
    flag.raise().unwrap();

    rig.ctl.start().unwrap();
    assert!(!flag.is_raised());
    assert!(rig.sim.output(rig.pins.heartbeat_out));

    let hb = HeartbeatFile::new(&rig.cfg.heartbeat.file);
    let first = hb.read().unwrap().unwrap().last_seen;
    thread::sleep(rig.cfg.heartbeat.period() * 3);
    let later = hb.read().unwrap().unwrap().last_seen;
    assert!(later > first);
    assert!(hb.is_alive(SystemTime::now(), rig.cfg.heartbeat.timeout()));
}

#[test]
fn shutdown_raises_flag_and_drops_everything() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();

    rig.ctl.shutdown();
    assert!(ShutdownFlag::new(&rig.cfg.heartbeat.shutdown_flag).is_raised());
    assert!(rig.hazards_off());
    assert!(!rig.sim.output(rig.pins.heartbeat_out));
    assert_eq!(rig.ctl.state(), ControllerState::Idle);

    // Heartbeat stops once the loops are gone.
    let hb = HeartbeatFile::new(&rig.cfg.heartbeat.file);
    let stamp = hb.read().unwrap().unwrap().last_seen;
    thread::sleep(rig.cfg.heartbeat.period() * 3);
    assert_eq!(hb.read().unwrap().unwrap().last_seen, stamp);

    // Idempotent.
    rig.ctl.shutdown();
}

#[test]
fn drop_makes_safe_without_flag() {
    let rig = Rig::started();
    rig.ctl.start_preview(None).unwrap();
    let flag = rig.cfg.heartbeat.shutdown_flag.clone();
    let sim = rig.sim.clone();
    let pins = rig.pins.clone();

    drop(rig.ctl);
    assert!(!sim.output(pins.hv_enable));
    assert!(!sim.output(pins.cam_preview));
    assert!(!flag.exists());
}

#[test]
fn notifications_follow_transitions() {
    let rig = Rig::started_with("[timing]\npre_roll_s = 0.05\npost_hold_s = 0.05\n");
    rig.ctl.arm().unwrap();
    assert_eq!(
        rig.ctl.expose(Duration::from_millis(100)).unwrap(),
        ExposureOutcome::Completed
    );

    let messages = rig.messages();
    let order = ["Controller ready.", "System ARMED", "Exposure start", "Exposure complete"];
    let mut at = 0;
    for want in order {
        let pos = messages[at..]
            .iter()
            .position(|m| m == want)
            .unwrap_or_else(|| panic!("missing {want:?} in {messages:?}"));
        at += pos + 1;
    }

    let notes = rig.notes.lock();
    let last = notes.iter().rev().find(|n| n.message == "Exposure complete").unwrap();
    assert_eq!(last.state, ControllerState::Idle);
    assert!(last.interlocks_ok);
    assert!(last.fault.is_none());

    let json = serde_json::to_value(last).unwrap();
    assert_eq!(json["state"], "IDLE");
    assert!(json.get("fault").is_none());
}

#[test]
fn status_reports_fault_message() {
    let rig = Rig::started();
    rig.sim.set_input(rig.pins.estop, false);
    rig.wait_for(ControllerState::Fault, Duration::from_millis(500));

    let status = rig.ctl.status();
    assert_eq!(status.state, ControllerState::Fault);
    assert_eq!(status.message, "FAULT: E-Stop pressed");
    assert!(!status.interlocks_ok);
}
