//! Integration test: axis commands and their guards.

use super::{FAST_AXES, Rig};
use std::thread;
use std::time::Duration;
use xray_control_unit::{ControllerError, ControllerState, FaultReason};

#[test]
fn tray_refused_until_rotation_homed() {
    let rig = Rig::started_with(FAST_AXES);
    assert!(!rig.ctl.rotation_homed());

    assert!(matches!(
        rig.ctl.close_tray(),
        Err(ControllerError::CommandRejected { command: "close", .. })
    ));
    assert!(rig.sim.motion_log().is_empty());
    assert_eq!(rig.sim.tray_position(), Some(0));
    assert_eq!(rig.ctl.state(), ControllerState::Idle);

    rig.ctl.home_rotation().unwrap();
    assert!(rig.ctl.rotation_homed());
    assert_eq!(rig.ctl.close_tray().unwrap(), 4);
    assert_eq!(rig.sim.tray_position(), Some(4));
    assert_eq!(rig.ctl.open_tray().unwrap(), 4);
    assert_eq!(rig.sim.tray_position(), Some(0));
}

#[test]
fn rotation_step_unhomes_and_home_returns() {
    let rig = Rig::started_with(FAST_AXES);
    rig.ctl.home_rotation().unwrap();
    assert_eq!(rig.ctl.rotate_step().unwrap(), 8);
    assert_eq!(rig.ctl.rotate_step().unwrap(), 8);
    assert!(!rig.ctl.rotation_homed());
    assert!(rig.ctl.open_tray().is_err());

    assert_eq!(rig.ctl.home_rotation().unwrap(), 16);
    assert!(rig.ctl.rotation_homed());
}

#[test]
fn align_requires_closed_tray() {
    let rig = Rig::started_with(FAST_AXES);
    assert!(matches!(
        rig.ctl.align_sample(),
        Err(ControllerError::CommandRejected { command: "align", .. })
    ));

    rig.ctl.home_rotation().unwrap();
    rig.ctl.close_tray().unwrap();
    let report = rig.ctl.align_sample().unwrap();
    assert!(report.homing_steps > 0);
    assert_eq!(report.traverse_steps, 6);
    for coil in rig.pins.align_coils {
        assert!(!rig.sim.output(coil), "coil {coil} left energized");
    }
}

#[test]
fn axis_commands_refused_while_hazardous() {
    let rig = Rig::started_with(FAST_AXES);
    rig.ctl.start_preview(None).unwrap();
    for result in [rig.ctl.home_rotation(), rig.ctl.rotate_step()] {
        assert!(matches!(result, Err(ControllerError::CommandRejected { .. })));
    }
    assert!(rig.ctl.close_tray().is_err());
    rig.ctl.stop_preview().unwrap();
}

#[test]
fn motion_link_failure_faults() {
    let rig = Rig::started_with(FAST_AXES);
    rig.ctl.home_rotation().unwrap();
    rig.sim.fail_motion(true);

    assert!(matches!(rig.ctl.close_tray(), Err(ControllerError::HardwareIo(_))));
    assert_eq!(rig.ctl.state(), ControllerState::Fault);
    assert_eq!(rig.ctl.fault_record().reason, Some(FaultReason::HardwareIo));
}

const SLOW_ROTATION: &str = r#"
[actuators]
rotation_step_delay_s = 0.01
rotation_steps_per_increment = 60
"#;

#[test]
fn moving_axis_blocks_hazardous_commands() {
    let rig = Rig::started_with(SLOW_ROTATION);
    thread::scope(|s| {
        let mover = s.spawn(|| rig.ctl.rotate_step());
        thread::sleep(Duration::from_millis(150));

        assert!(matches!(
            rig.ctl.expose(Duration::from_millis(50)),
            Err(ControllerError::CommandRejected { command: "expose", .. })
        ));
        assert!(matches!(
            rig.ctl.home_rotation(),
            Err(ControllerError::CommandRejected { command: "home", .. })
        ));
        assert_eq!(mover.join().unwrap().unwrap(), 60);
    });
    assert!(!rig.sim.output(rig.pins.hv_enable));
}

#[test]
fn fault_halts_running_axis() {
    let rig = Rig::started_with(SLOW_ROTATION);
    let result = thread::scope(|s| {
        let mover = s.spawn(|| rig.ctl.rotate_step());
        thread::sleep(Duration::from_millis(150));
        rig.sim.set_input(rig.pins.estop, false);
        mover.join().unwrap()
    });

    assert!(matches!(
        result,
        Err(ControllerError::MotionIncomplete { axis: "rotation", .. })
    ));
    assert_eq!(rig.ctl.state(), ControllerState::Fault);
    assert_eq!(rig.ctl.fault_record().reason, Some(FaultReason::EStop));
    for coil in rig.pins.rotation_coils {
        assert!(!rig.sim.output(coil));
    }
}
