//! Integration test: operator command lines dispatched to a live controller.

use super::{FAST_AXES, Rig};
use xray_control_unit::ControllerState;
use xray_control_unit::command::{Command, ParseError};

fn run(rig: &Rig, line: &str) -> Result<String, String> {
    let cmd = line.parse::<Command>().map_err(|e: ParseError| e.to_string())?;
    cmd.execute(&rig.ctl).map_err(|e| e.to_string())
}

#[test]
fn operator_session() {
    let toml = format!("{FAST_AXES}\n[timing]\npre_roll_s = 0.05\npost_hold_s = 0.05\n");
    let rig = Rig::started_with(&toml);

    assert_eq!(run(&rig, "home").unwrap(), "rotation homed (0 steps)");
    assert_eq!(run(&rig, "close").unwrap(), "tray closed (4 commands)");
    assert!(run(&rig, "align").unwrap().starts_with("aligned"));
    assert_eq!(run(&rig, "arm").unwrap(), "armed");
    assert_eq!(run(&rig, "expose 0.1").unwrap(), "exposure completed");
    assert_eq!(
        run(&rig, "preview 5").unwrap(),
        "preview started (5.0s timeout)"
    );
    assert_eq!(run(&rig, "stop").unwrap(), "preview stopped");
    assert_eq!(run(&rig, "disarm").unwrap(), "disarmed (IDLE)");
    assert!(run(&rig, "status").unwrap().contains("\"state\":\"IDLE\""));
    assert_eq!(run(&rig, "quit").unwrap(), "bye");
    assert_eq!(rig.ctl.state(), ControllerState::Idle);
}

#[test]
fn rejected_commands_report_reason() {
    let rig = Rig::started_with(FAST_AXES);
    let err = run(&rig, "open").unwrap_err();
    assert!(err.contains("not homed"), "{err}");
    assert!(run(&rig, "reset").unwrap_err().contains("not in FAULT"));
    assert!(run(&rig, "stop").is_err());
}

#[test]
fn malformed_lines_never_reach_the_controller() {
    let rig = Rig::started();
    let writes = rig.sim.write_count(rig.pins.hv_enable);
    for line in ["", "fire", "expose", "expose -1", "expose abc", "arm now"] {
        assert!(run(&rig, line).is_err(), "{line:?} accepted");
    }
    assert_eq!(rig.sim.write_count(rig.pins.hv_enable), writes);
}
