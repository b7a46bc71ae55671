//! In-memory model of the rig's electrical state.
//!
//! One `SimRig` is shared (behind a `parking_lot::Mutex`) by every handle
//! the simulation driver hands out, so a write on one handle is visible to
//! all others immediately.
//!
//! # Reactions
//!
//! ```text
//!   output write ──► history + write count
//!        │
//!        ├──► loopbacks       (input := output level)
//!        └──► write triggers  (after N writes, input := level)
//!
//!   motion command ──► motion log ──► tray carriage ──► open/close limits
//! ```

use super::tray::TrayCarriage;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, trace};
use xray_common::hal::config::{SimLoopback, SimWriteTrigger, SimulationConfig};
use xray_common::hal::types::MotionCommand;

/// One recorded output write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteEvent {
    /// Output line written.
    pub line: u32,
    /// Level written.
    pub high: bool,
    /// Time of the write.
    pub at: Instant,
}

#[derive(Debug, Clone)]
struct ArmedTrigger {
    cfg: SimWriteTrigger,
    fired: bool,
}

/// Shared electrical state of the simulated rig.
#[derive(Debug)]
pub struct SimRig {
    inputs: HashMap<u32, bool>,
    outputs: HashMap<u32, bool>,
    analog: HashMap<u32, i32>,
    write_counts: HashMap<u32, u64>,
    loopbacks: Vec<SimLoopback>,
    triggers: Vec<ArmedTrigger>,
    tray: Option<TrayCarriage>,
    failed_lines: HashSet<u32>,
    failed_channels: HashSet<u32>,
    motion_failed: bool,
    history: Vec<WriteEvent>,
    motion_log: Vec<MotionCommand>,
    pub(crate) input_reads: u64,
    pub(crate) output_writes: u64,
}

impl SimRig {
    /// Build the rig from the `[hal.simulation]` section.
    pub fn new(config: &SimulationConfig) -> Self {
        let mut rig = Self {
            inputs: config.input_levels.iter().map(|l| (l.line, l.high)).collect(),
            outputs: HashMap::new(),
            analog: config.analog.iter().map(|a| (a.channel, a.raw)).collect(),
            write_counts: HashMap::new(),
            loopbacks: config.loopbacks.clone(),
            triggers: config
                .write_triggers
                .iter()
                .map(|&cfg| ArmedTrigger { cfg, fired: false })
                .collect(),
            tray: config.tray.map(TrayCarriage::new),
            failed_lines: HashSet::new(),
            failed_channels: HashSet::new(),
            motion_failed: false,
            history: Vec::new(),
            motion_log: Vec::new(),
            input_reads: 0,
            output_writes: 0,
        };
        rig.apply_tray_limits();
        debug!(
            "SimRig initialized: {} preset inputs, {} loopbacks, {} triggers, tray={}",
            rig.inputs.len(),
            rig.loopbacks.len(),
            rig.triggers.len(),
            rig.tray.is_some()
        );
        rig
    }

    // ─── Digital ────────────────────────────────────────────────────

    /// Input level; unset inputs read HIGH (pull-up).
    pub fn input(&mut self, line: u32) -> Option<bool> {
        if self.failed_lines.contains(&line) {
            return None;
        }
        self.input_reads += 1;
        Some(self.inputs.get(&line).copied().unwrap_or(true))
    }

    /// Force an input level.
    pub fn set_input(&mut self, line: u32, high: bool) {
        trace!("sim input {line} := {high}");
        self.inputs.insert(line, high);
    }

    /// Current output level; unset outputs are LOW.
    pub fn output(&self, line: u32) -> bool {
        self.outputs.get(&line).copied().unwrap_or(false)
    }

    /// Drive an output and run every reaction attached to it.
    ///
    /// Returns `false` if the line has been failed.
    pub fn write_output(&mut self, line: u32, high: bool) -> bool {
        if self.failed_lines.contains(&line) {
            return false;
        }
        self.output_writes += 1;
        self.outputs.insert(line, high);
        self.history.push(WriteEvent {
            line,
            high,
            at: Instant::now(),
        });
        let count = {
            let c = self.write_counts.entry(line).or_insert(0);
            *c += 1;
            *c
        };

        for lb in self.loopbacks.iter().filter(|lb| lb.output == line) {
            self.inputs.insert(lb.input, high);
        }
        for trig in self
            .triggers
            .iter_mut()
            .filter(|t| !t.fired && t.cfg.output == line && count >= t.cfg.writes)
        {
            trig.fired = true;
            debug!(
                "sim trigger: {} writes on line {} -> input {} := {}",
                count, line, trig.cfg.input, trig.cfg.high
            );
            self.inputs.insert(trig.cfg.input, trig.cfg.high);
        }
        true
    }

    /// Number of writes performed on `line`.
    pub fn write_count(&self, line: u32) -> u64 {
        self.write_counts.get(&line).copied().unwrap_or(0)
    }

    // ─── Analog ─────────────────────────────────────────────────────

    /// Raw counts of an ADC channel (0 if never set).
    pub fn analog(&self, channel: u32) -> Option<i32> {
        if self.failed_channels.contains(&channel) {
            return None;
        }
        Some(self.analog.get(&channel).copied().unwrap_or(0))
    }

    /// Set raw counts of an ADC channel.
    pub fn set_analog(&mut self, channel: u32, raw: i32) {
        self.analog.insert(channel, raw);
    }

    // ─── Motion ─────────────────────────────────────────────────────

    /// Accept a motion command. Returns `false` if the link has been failed.
    pub fn motion(&mut self, command: MotionCommand) -> bool {
        if self.motion_failed {
            return false;
        }
        self.motion_log.push(command);
        if let Some(tray) = self.tray.as_mut() {
            tray.apply(command);
        }
        self.apply_tray_limits();
        true
    }

    fn apply_tray_limits(&mut self) {
        if let Some(tray) = self.tray {
            let (open_line, open_high) = tray.open_limit_level();
            let (close_line, close_high) = tray.close_limit_level();
            self.inputs.insert(open_line, open_high);
            self.inputs.insert(close_line, close_high);
        }
    }

    /// Current tray carriage position, if a tray is simulated.
    pub fn tray_position(&self) -> Option<i64> {
        self.tray.map(|t| t.position())
    }

    // ─── Fault Injection ────────────────────────────────────────────

    /// Make every read/write on `line` fail (`true`) or succeed again.
    pub fn set_line_failed(&mut self, line: u32, failed: bool) {
        if failed {
            self.failed_lines.insert(line);
        } else {
            self.failed_lines.remove(&line);
        }
    }

    /// Make ADC reads on `channel` fail (`true`) or succeed again.
    pub fn set_channel_failed(&mut self, channel: u32, failed: bool) {
        if failed {
            self.failed_channels.insert(channel);
        } else {
            self.failed_channels.remove(&channel);
        }
    }

    /// Make the motion link fail (`true`) or succeed again.
    pub fn set_motion_failed(&mut self, failed: bool) {
        self.motion_failed = failed;
    }

    // ─── Recording ──────────────────────────────────────────────────

    /// Every output write so far, oldest first.
    pub fn history(&self) -> &[WriteEvent] {
        &self.history
    }

    /// Every motion command so far, oldest first.
    pub fn motion_log(&self) -> &[MotionCommand] {
        &self.motion_log
    }

    /// Forget recorded writes and motion commands.
    pub fn clear_records(&mut self) {
        self.history.clear();
        self.motion_log.clear();
    }
}
