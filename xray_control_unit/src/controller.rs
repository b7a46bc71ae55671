//! # Safety Controller
//!
//! Sole writer of the HV enable, camera trigger and preview lines. Every
//! write to those lines happens while holding the core lock, after the
//! state has been checked, so a concurrent Fault can never be overtaken by
//! a stale "on" write.
//!
//! ```text
//!   commands ──► SafetyController ──► RelayDriver (hv / trigger / preview)
//!                   ▲   │
//!      fault path   │   └──► LedPanel, ActuatorSubsystem, notifications
//!                   │
//!   ┌───────────────┴────────────────────────────────────────────┐
//!   │ interlock loop   hv loop   preview loop           heartbeat │
//!   └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monitor loops never touch the hazardous outputs themselves; they call
//! the fault path. Notifications are built under the core lock and
//! delivered after it is released.

use crate::actuator::align::AlignReport;
use crate::actuator::{ActuatorSubsystem, MotionGuard};
use crate::config::ControllerConfig;
use crate::error::{ControllerError, FaultReason};
use crate::periodic::PeriodicTask;
use crate::safety::hv_monitor::HvMonitor;
use crate::safety::interlock::{InterlockMonitor, InterlockSnapshot};
use crate::safety::latch::FaultLatch;
use crate::safety::leds::{LedPanel, annunciate};
use crate::safety::relay::RelayDriver;
use crate::state::{ControllerEvent, ControllerState, ControllerStateMachine, FaultRecord, TransitionResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use xray_common::hal::driver::HalError;
use xray_common::heartbeat::{HeartbeatFile, ShutdownFlag};
use xray_hal::HardwareContext;

// ─── Notifications ──────────────────────────────────────────────────

/// State report pushed on every transition and alarm edge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Controller state after the event.
    pub state: ControllerState,
    /// Last interlock snapshot was all ok.
    pub interlocks_ok: bool,
    /// Last HV monitor ADC voltage.
    pub hv_adc_volts: Option<f64>,
    /// Last calibrated tube voltage estimate.
    pub hv_estimated_volts: Option<f64>,
    /// Last HV monitor alarm state.
    pub hv_alarm: bool,
    /// Operator-facing message.
    pub message: String,
    /// Latched fault cause, if in Fault.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultReason>,
}

/// Notification sink.
pub type Notifier = Box<dyn Fn(&Notification) + Send + Sync>;

/// How an exposure ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureOutcome {
    /// Full sequence ran; state back to Idle.
    Completed,
    /// A fault interrupted the sequence.
    Faulted(FaultReason),
    /// Disarmed or shut down mid-sequence.
    Aborted,
}

impl fmt::Display for ExposureOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Faulted(reason) => write!(f, "faulted ({reason})"),
            Self::Aborted => f.write_str("aborted"),
        }
    }
}

fn violation_reason(snap: &InterlockSnapshot) -> FaultReason {
    if !snap.estop_ok {
        FaultReason::EStop
    } else if !snap.heartbeat_ok {
        FaultReason::HeartbeatLost
    } else {
        FaultReason::InterlockViolation
    }
}

fn state_guard(command: &'static str, result: TransitionResult) -> Result<(), ControllerError> {
    match result {
        TransitionResult::Ok(_) => Ok(()),
        TransitionResult::Rejected(reason) => Err(ControllerError::rejected(command, reason)),
    }
}

// ─── Shared core ────────────────────────────────────────────────────

struct Core {
    machine: ControllerStateMachine,
    fault: FaultRecord,
    preview_deadline: Option<Instant>,
}

struct Shared {
    hw: Arc<HardwareContext>,
    cfg: ControllerConfig,
    interlocks: InterlockMonitor,
    latch: FaultLatch,
    hv: HvMonitor,
    hv_relay: RelayDriver,
    trigger: RelayDriver,
    preview: RelayDriver,
    leds: LedPanel,
    actuators: ActuatorSubsystem,
    heartbeat: HeartbeatFile,
    shutdown_flag: ShutdownFlag,
    notifier: Mutex<Option<Notifier>>,
    core: Mutex<Core>,
    interlocks_were_ok: AtomicBool,
}

impl Shared {
    fn new(hw: Arc<HardwareContext>, cfg: &ControllerConfig) -> Result<Self, HalError> {
        Ok(Self {
            interlocks: InterlockMonitor::new(hw.interlocks.clone(), cfg.timing.debounce()),
            latch: FaultLatch::new(hw.interlocks.estop.clone(), cfg.latch.policy),
            hv: HvMonitor::new(hw.hv_adc.clone(), cfg.adc.clone()),
            hv_relay: RelayDriver::new("hv_enable", hw.hv_enable.clone())?,
            trigger: RelayDriver::new("cam_trigger", hw.cam_trigger.clone())?,
            preview: RelayDriver::new("cam_preview", hw.cam_preview.clone())?,
            leds: LedPanel::new(hw.leds.clone()),
            actuators: ActuatorSubsystem::new(&hw, &cfg.actuators),
            heartbeat: HeartbeatFile::new(&cfg.heartbeat.file),
            shutdown_flag: ShutdownFlag::new(&cfg.heartbeat.shutdown_flag),
            notifier: Mutex::new(None),
            core: Mutex::new(Core {
                machine: ControllerStateMachine::new(),
                fault: FaultRecord::default(),
                preview_deadline: None,
            }),
            interlocks_were_ok: AtomicBool::new(false),
            cfg: cfg.clone(),
            hw,
        })
    }

    // ── Notifications ──

    fn note(&self, core: &Core, message: impl Into<String>) -> Notification {
        let hv = self.hv.latest();
        Notification {
            state: core.machine.state(),
            interlocks_ok: self.interlocks.last().all_ok(),
            hv_adc_volts: hv.and_then(|r| r.adc_volts),
            hv_estimated_volts: hv.and_then(|r| r.estimated_hv_volts),
            hv_alarm: hv.is_some_and(|r| r.alarm),
            message: message.into(),
            fault: core.fault.reason,
        }
    }

    fn emit(&self, note: Notification) {
        info!("[{}] {}", note.state, note.message);
        if let Some(notify) = self.notifier.lock().as_ref() {
            notify(&note);
        }
    }

    fn emit_all(&self, notes: impl IntoIterator<Item = Notification>) {
        for note in notes {
            self.emit(note);
        }
    }

    fn refresh_leds(&self, core: &Core) {
        self.leds.apply(annunciate(
            self.hv.alarm_active(),
            self.interlocks.last().all_ok(),
            core.machine.state(),
        ));
    }

    // ── Outputs ──

    /// Trigger, preview and HV LOW. Attempts all three.
    fn outputs_off(&self) -> Result<(), HalError> {
        let mut first = None;
        for relay in [&self.trigger, &self.preview, &self.hv_relay] {
            if let Err(e) = relay.off() {
                error!("{} could not be driven LOW: {}", relay.name(), e);
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), Err)
    }

    // ── Fault path ──

    fn fault_locked(&self, core: &mut Core, reason: FaultReason, message: &str) -> Option<Notification> {
        // Best effort: a failed LOW write is already logged and must not stop the transition.
        let _ = self.outputs_off();
        self.actuators.halt();
        core.preview_deadline = None;
        core.machine.handle_event(ControllerEvent::Fault);
        let latched = core.fault.raise(reason, message);
        self.refresh_leds(core);
        if latched {
            error!("FAULT ({reason}): {message}");
            Some(self.note(core, format!("FAULT: {message}")))
        } else {
            debug!("Additional fault while latched ({reason}): {message}");
            None
        }
    }

    fn fault(&self, reason: FaultReason, message: &str) {
        let note = {
            let mut core = self.core.lock();
            self.fault_locked(&mut core, reason, message)
        };
        self.emit_all(note);
    }

    // ── Hazardous sequence helpers ──

    /// Check that `state` still holds; otherwise report how the sequence ended.
    fn still_in(&self, core: &Core, state: ControllerState) -> Option<ExposureOutcome> {
        match core.machine.state() {
            s if s == state => None,
            ControllerState::Fault => Some(ExposureOutcome::Faulted(
                core.fault.reason.unwrap_or(FaultReason::HardwareIo),
            )),
            _ => Some(ExposureOutcome::Aborted),
        }
    }

    /// Wait `duration` in exposure ticks, checking state and interlocks on every tick.
    fn hold(&self, duration: Duration) -> Result<(), ExposureOutcome> {
        let deadline = Instant::now() + duration;
        let tick = self.cfg.timing.exposure_tick();
        loop {
            if let Some(outcome) = self.still_in(&self.core.lock(), ControllerState::Expose) {
                return Err(outcome);
            }
            if Instant::now() >= deadline {
                return Ok(());
            }
            let snap = self.interlocks.snapshot();
            if !snap.all_ok() {
                let reason = violation_reason(&snap);
                self.fault(reason, &format!("Interlock violation during exposure ({snap})"));
                return Err(ExposureOutcome::Faulted(reason));
            }
            thread::sleep(tick.min(deadline.saturating_duration_since(Instant::now())));
        }
    }

    /// Switch one output while the exposure is still running.
    fn expose_step(&self, relay: &RelayDriver, on: bool) -> Result<(), ExposureOutcome> {
        let note;
        {
            let mut core = self.core.lock();
            if let Some(outcome) = self.still_in(&core, ControllerState::Expose) {
                return Err(outcome);
            }
            let result = if on { relay.on() } else { relay.off() };
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    note = self.fault_locked(
                        &mut core,
                        FaultReason::HardwareIo,
                        &format!("{} write failed: {e}", relay.name()),
                    );
                }
            }
        }
        self.emit_all(note);
        Err(ExposureOutcome::Faulted(FaultReason::HardwareIo))
    }

    fn run_exposure(&self, shutter: Duration) -> ExposureOutcome {
        let t = &self.cfg.timing;
        let sequence = || -> Result<(), ExposureOutcome> {
            self.hold(t.pre_roll())?;
            self.expose_step(&self.trigger, true)?;
            info!("Trigger asserted for {:.3}s", shutter.as_secs_f64());
            self.hold(shutter)?;
            self.expose_step(&self.trigger, false)?;
            self.hold(t.post_hold())
        };
        if let Err(outcome) = sequence() {
            // Interrupted: make sure nothing was left on.
            let core = self.core.lock();
            if !core.machine.state().is_hazardous() {
                let _ = self.outputs_off();
            }
            return outcome;
        }

        let note = {
            let mut core = self.core.lock();
            if let Some(outcome) = self.still_in(&core, ControllerState::Expose) {
                return outcome;
            }
            if let Err(e) = self.outputs_off() {
                let note = self.fault_locked(
                    &mut core,
                    FaultReason::HardwareIo,
                    &format!("HV off failed after exposure: {e}"),
                );
                drop(core);
                self.emit_all(note);
                return ExposureOutcome::Faulted(FaultReason::HardwareIo);
            }
            core.machine.handle_event(ControllerEvent::ExposureComplete);
            self.refresh_leds(&core);
            self.note(&core, "Exposure complete")
        };
        self.emit(note);
        ExposureOutcome::Completed
    }

    /// Common guard for Expose/Preview entry. Returns the snapshot taken.
    fn hazard_precheck(&self, command: &'static str) -> Result<InterlockSnapshot, ControllerError> {
        if self.hv.alarm_active() {
            return Err(ControllerError::HvAlarm(format!("{command} refused while HV monitor is in alarm")));
        }
        Ok(self.interlocks.snapshot())
    }

    fn enter_hazard_locked(
        &self,
        core: &mut Core,
        command: &'static str,
        snap: &InterlockSnapshot,
        event: ControllerEvent,
    ) -> Result<(), ControllerError> {
        match core.machine.state() {
            ControllerState::Idle | ControllerState::Armed => {}
            ControllerState::Fault => return Err(ControllerError::rejected(command, "controller in FAULT")),
            _ => return Err(ControllerError::rejected(command, "hazardous operation in progress")),
        }
        if self.actuators.is_busy() {
            return Err(ControllerError::rejected(command, "an axis is moving"));
        }
        if !snap.all_ok() {
            return Err(ControllerError::InterlockViolation(*snap));
        }
        if core.machine.state() == ControllerState::Idle {
            core.machine.handle_event(ControllerEvent::Arm);
            info!("Auto-armed for {command}");
        }
        state_guard(command, core.machine.handle_event(event))
    }

    // ── Operations ──

    fn stop_preview(&self, message: &str) -> Result<(), ControllerError> {
        let note = {
            let mut core = self.core.lock();
            if core.machine.state() != ControllerState::Preview {
                return Err(ControllerError::rejected("stop_preview", "not in PREVIEW"));
            }
            core.preview_deadline = None;
            if let Err(e) = self.outputs_off() {
                let note = self.fault_locked(
                    &mut core,
                    FaultReason::HardwareIo,
                    &format!("output write failed stopping preview: {e}"),
                );
                drop(core);
                self.emit_all(note);
                return Err(e.into());
            }
            core.machine.handle_event(ControllerEvent::StopPreview);
            self.refresh_leds(&core);
            self.note(&core, message)
        };
        self.emit(note);
        Ok(())
    }

    fn run_motion<T>(
        &self,
        command: &'static str,
        op: impl FnOnce(&ActuatorSubsystem, &MotionGuard<'_>) -> Result<T, ControllerError>,
    ) -> Result<T, ControllerError> {
        let motion = {
            let core = self.core.lock();
            let state = core.machine.state();
            if state == ControllerState::Fault || state.is_hazardous() {
                return Err(ControllerError::rejected(command, format!("not allowed in {state}")));
            }
            self.actuators.try_begin(command)?
        };
        match op(&self.actuators, &motion) {
            Ok(v) => Ok(v),
            Err(e @ ControllerError::CommandRejected { .. }) => {
                warn!("{e}");
                Err(e)
            }
            Err(e) => {
                drop(motion);
                self.fault(FaultReason::HardwareIo, &format!("{command} failed: {e}"));
                Err(e)
            }
        }
    }

    // ── Periodic loop bodies ──

    fn interlock_tick(&self) {
        if let Err(e) = self.hw.heartbeat_out.write(true) {
            warn!("Heartbeat output write failed: {e}");
        }
        let snap = self.interlocks.snapshot();
        // May fire the E-Stop callback; must run without the core lock.
        self.latch.observe(snap.estop_ok);

        let mut notes = Vec::new();
        {
            let mut core = self.core.lock();
            let state = core.machine.state();
            if state != ControllerState::Fault && !snap.heartbeat_ok {
                notes.extend(self.fault_locked(&mut core, FaultReason::HeartbeatLost, "Heartbeat lost"));
            } else if state.is_hazardous() && !snap.all_ok() {
                notes.extend(self.fault_locked(
                    &mut core,
                    violation_reason(&snap),
                    &format!("Interlock violation ({snap})"),
                ));
            }
            let ok = snap.all_ok();
            if self.interlocks_were_ok.swap(ok, Ordering::AcqRel) != ok {
                let msg = if ok {
                    "Interlocks OK".to_string()
                } else {
                    format!("Interlocks open: {snap}")
                };
                notes.push(self.note(&core, msg));
            }
            self.refresh_leds(&core);
        }
        self.emit_all(notes);
    }

    fn hv_tick(&self) {
        let (reading, edge) = self.hv.sample();
        let mut notes = Vec::new();
        {
            let mut core = self.core.lock();
            if reading.alarm && core.machine.state().is_hazardous() && self.cfg.adc.cut_hv_on_alarm {
                let (reason, msg) = match reading.adc_volts {
                    Some(_) => (FaultReason::HvAlarm, "HV alarm while X-ray ON"),
                    None => (FaultReason::HardwareIo, "HV monitor unreadable while X-ray ON"),
                };
                notes.extend(self.fault_locked(&mut core, reason, msg));
            }
            if let Some(edge) = edge {
                if reading.alarm {
                    warn!("{}", edge.message());
                }
                notes.push(self.note(&core, edge.message()));
            }
            self.refresh_leds(&core);
        }
        self.emit_all(notes);
    }

    /// Preview re-checks interlocks on this tick so the HV cut does not
    /// wait for the slower interlock loop.
    fn preview_tick(&self) {
        if self.core.lock().machine.state() != ControllerState::Preview {
            return;
        }
        let snap = self.interlocks.snapshot();
        if !snap.all_ok() {
            // May fire the E-Stop callback; must run without the core lock.
            self.latch.observe(snap.estop_ok);
            let note = {
                let mut core = self.core.lock();
                if core.machine.state().is_hazardous() {
                    self.fault_locked(
                        &mut core,
                        violation_reason(&snap),
                        &format!("Interlock violation during preview ({snap})"),
                    )
                } else {
                    None
                }
            };
            self.emit_all(note);
            return;
        }

        let expired = {
            let core = self.core.lock();
            core.machine.state() == ControllerState::Preview
                && core.preview_deadline.is_some_and(|d| Instant::now() >= d)
        };
        if expired {
            info!("Preview timeout");
            if let Err(e) = self.stop_preview("Preview stopped (timeout)") {
                warn!("Preview timeout stop failed: {e}");
            }
        }
    }

    fn heartbeat_tick(&self) {
        if let Err(e) = self.heartbeat.touch() {
            warn!("Heartbeat write failed: {e}");
        }
    }

    /// De-energize everything and leave hazardous states. Used on shutdown/drop.
    fn make_safe(&self) {
        self.actuators.halt();
        {
            let mut core = self.core.lock();
            let _ = self.outputs_off();
            core.preview_deadline = None;
            if core.machine.state() != ControllerState::Fault {
                core.machine.handle_event(ControllerEvent::Disarm);
            }
        }
        self.leds.clear();
        if let Err(e) = self.hw.all_outputs_low() {
            error!("Failed to drive all outputs LOW: {e}");
        }
    }
}

// ─── Public controller ──────────────────────────────────────────────

/// The X-ray rig safety controller.
///
/// Construct with [`new`](Self::new), then [`start`](Self::start) the
/// monitor loops. Commands may be issued from any thread.
pub struct SafetyController {
    shared: Arc<Shared>,
    tasks: Mutex<Vec<PeriodicTask>>,
    stopped: AtomicBool,
}

impl SafetyController {
    /// Build the controller over an opened hardware context. Every hazardous
    /// output is driven LOW; no background loop runs yet.
    pub fn new(hw: Arc<HardwareContext>, cfg: &ControllerConfig) -> Result<Self, ControllerError> {
        let shared = Arc::new(Shared::new(hw, cfg)?);
        let weak: Weak<Shared> = Arc::downgrade(&shared);
        shared.latch.set_on_fault(move || {
            if let Some(shared) = weak.upgrade() {
                shared.fault(FaultReason::EStop, "E-Stop pressed");
            }
        });
        Ok(Self {
            shared,
            tasks: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        })
    }

    /// Register the notification sink, replacing any previous one.
    pub fn set_notifier(&self, notifier: impl Fn(&Notification) + Send + Sync + 'static) {
        *self.shared.notifier.lock() = Some(Box::new(notifier));
    }

    /// Clear a stale shutdown flag, start the heartbeat and spawn the
    /// interlock, HV, preview and heartbeat loops.
    pub fn start(&self) -> Result<(), ControllerError> {
        let s = &self.shared;
        if s.shutdown_flag.clear()? {
            info!("Removed stale shutdown flag {}", s.shutdown_flag.path().display());
        }
        s.heartbeat.touch()?;
        s.hw.heartbeat_out.write(true)?;

        let cfg = &s.cfg;
        let loops: [(&str, Duration, fn(&Shared)); 4] = [
            ("interlock", cfg.timing.interlock_period(), Shared::interlock_tick),
            ("hv-monitor", cfg.adc.sample_period(), Shared::hv_tick),
            ("preview", cfg.timing.preview_poll(), Shared::preview_tick),
            ("heartbeat", cfg.heartbeat.period(), Shared::heartbeat_tick),
        ];
        let mut tasks = self.tasks.lock();
        for (name, period, body) in loops {
            let shared = Arc::clone(s);
            tasks.push(PeriodicTask::spawn(name, period, move || body(&shared))?);
        }
        drop(tasks);

        let note = self.shared.note(&self.shared.core.lock(), "Controller ready.");
        self.shared.emit(note);
        Ok(())
    }

    /// Current state.
    pub fn state(&self) -> ControllerState {
        self.shared.core.lock().machine.state()
    }

    /// Current fault record.
    pub fn fault_record(&self) -> FaultRecord {
        self.shared.core.lock().fault.clone()
    }

    /// Current status without side effects.
    pub fn status(&self) -> Notification {
        let core = self.shared.core.lock();
        let message = if core.fault.active {
            format!("FAULT: {}", core.fault.message)
        } else {
            core.machine.state().to_string()
        };
        self.shared.note(&core, message)
    }

    /// `Idle → Armed` if every interlock is satisfied.
    pub fn arm(&self) -> Result<(), ControllerError> {
        let s = &self.shared;
        let snap = s.interlocks.snapshot();
        let note = {
            let mut core = s.core.lock();
            match core.machine.state() {
                ControllerState::Idle | ControllerState::Armed => {}
                ControllerState::Fault => return Err(ControllerError::rejected("arm", "controller in FAULT")),
                _ => return Err(ControllerError::rejected("arm", "hazardous operation in progress")),
            }
            if !snap.all_ok() {
                return Err(ControllerError::InterlockViolation(snap));
            }
            state_guard("arm", core.machine.handle_event(ControllerEvent::Arm))?;
            s.refresh_leds(&core);
            s.note(&core, "System ARMED")
        };
        s.emit(note);
        Ok(())
    }

    /// De-energize HV and triggers and return to Idle. In Fault, outputs are
    /// made safe but the fault persists.
    pub fn disarm(&self) -> Result<(), ControllerError> {
        let s = &self.shared;
        let note = {
            let mut core = s.core.lock();
            core.preview_deadline = None;
            if let Err(e) = s.outputs_off() {
                let note = s.fault_locked(&mut core, FaultReason::HardwareIo, &format!("disarm write failed: {e}"));
                drop(core);
                s.emit_all(note);
                return Err(e.into());
            }
            if core.machine.state() == ControllerState::Fault {
                debug!("Disarm in FAULT: outputs safe, fault persists");
                return Ok(());
            }
            core.machine.handle_event(ControllerEvent::Disarm);
            s.refresh_leds(&core);
            s.note(&core, "System DISARMED → IDLE")
        };
        s.emit(note);
        Ok(())
    }

    /// Run one exposure: HV on, pre-roll, trigger for `shutter`, post-hold,
    /// HV off. Blocks for the whole sequence. Auto-arms from Idle.
    ///
    /// Interlock violations during the sequence fault the controller and are
    /// reported as [`ExposureOutcome::Faulted`], not as errors.
    pub fn expose(&self, shutter: Duration) -> Result<ExposureOutcome, ControllerError> {
        let s = &self.shared;
        let max = s.cfg.timing.max_exposure_s;
        if shutter.is_zero() || shutter.as_secs_f64() > max {
            return Err(ControllerError::rejected(
                "expose",
                format!("shutter time must be in (0, {max}] s"),
            ));
        }
        let snap = s.hazard_precheck("expose")?;
        let note = {
            let mut core = s.core.lock();
            s.enter_hazard_locked(&mut core, "expose", &snap, ControllerEvent::StartExposure)?;
            if let Err(e) = s.hv_relay.on() {
                let note = s.fault_locked(&mut core, FaultReason::HardwareIo, &format!("HV enable failed: {e}"));
                drop(core);
                s.emit_all(note);
                return Err(e.into());
            }
            s.refresh_leds(&core);
            s.note(&core, "Exposure start")
        };
        s.emit(note);

        let outcome = s.run_exposure(shutter);
        info!("Exposure {outcome}");
        Ok(outcome)
    }

    /// Enter Preview: HV on and preview line asserted until
    /// [`stop_preview`](Self::stop_preview) or the optional timeout.
    pub fn start_preview(&self, timeout: Option<Duration>) -> Result<(), ControllerError> {
        let s = &self.shared;
        let snap = s.hazard_precheck("preview")?;
        let note = {
            let mut core = s.core.lock();
            s.enter_hazard_locked(&mut core, "preview", &snap, ControllerEvent::StartPreview)?;
            if let Err(e) = s.hv_relay.on().and_then(|()| s.preview.on()) {
                let note = s.fault_locked(&mut core, FaultReason::HardwareIo, &format!("preview start failed: {e}"));
                drop(core);
                s.emit_all(note);
                return Err(e.into());
            }
            core.preview_deadline = timeout.map(|t| Instant::now() + t);
            s.refresh_leds(&core);
            s.note(&core, "Preview started")
        };
        s.emit(note);
        Ok(())
    }

    /// Leave Preview. Rejected in any other state.
    pub fn stop_preview(&self) -> Result<(), ControllerError> {
        self.shared.stop_preview("Preview stopped")
    }

    /// `Fault → Idle` if every interlock is satisfied and the E-Stop latch clears.
    pub fn reset_fault(&self) -> Result<(), ControllerError> {
        let s = &self.shared;
        let snap = s.interlocks.snapshot();
        s.latch.observe(snap.estop_ok);
        let note = {
            let mut core = s.core.lock();
            if core.machine.state() != ControllerState::Fault {
                return Err(ControllerError::rejected("reset", "controller not in FAULT"));
            }
            if !snap.all_ok() {
                return Err(ControllerError::InterlockViolation(snap));
            }
            s.latch
                .reset()
                .map_err(|reason| ControllerError::rejected("reset", reason))?;
            state_guard("reset", core.machine.handle_event(ControllerEvent::ResetFault))?;
            core.fault.clear();
            s.refresh_leds(&core);
            s.note(&core, "FAULT cleared → IDLE")
        };
        s.emit(note);
        Ok(())
    }

    /// Axis 1: open the tray.
    pub fn open_tray(&self) -> Result<u64, ControllerError> {
        self.shared.run_motion("open", |a, m| a.open_tray(m))
    }

    /// Axis 1: close the tray.
    pub fn close_tray(&self) -> Result<u64, ControllerError> {
        self.shared.run_motion("close", |a, m| a.close_tray(m))
    }

    /// Axis 2: align the sample.
    pub fn align_sample(&self) -> Result<AlignReport, ControllerError> {
        self.shared.run_motion("align", |a, m| a.align_sample(m))
    }

    /// Axis 3: rotate one increment.
    pub fn rotate_step(&self) -> Result<u64, ControllerError> {
        self.shared.run_motion("rotate", |a, m| a.rotate_step(m))
    }

    /// Axis 3: return to the reference position.
    pub fn home_rotation(&self) -> Result<u64, ControllerError> {
        self.shared.run_motion("home", |a, m| a.home_rotation(m))
    }

    /// Rotation stage homed.
    pub fn rotation_homed(&self) -> bool {
        self.shared.actuators.rotation_state().homed
    }

    /// Graceful exit: raise the shutdown flag, stop every loop and drive
    /// every output LOW. Idempotent.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Controller shutting down");
        if let Err(e) = self.shared.shutdown_flag.raise() {
            error!("Failed to raise shutdown flag: {e}");
        }
        self.stop_tasks();
        self.shared.make_safe();
    }

    fn stop_tasks(&self) {
        let tasks: Vec<PeriodicTask> = std::mem::take(&mut *self.tasks.lock());
        for mut task in tasks {
            task.stop();
            debug!("Stopped {}", task.name());
        }
    }
}

impl Drop for SafetyController {
    fn drop(&mut self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.stop_tasks();
            self.shared.make_safe();
        }
    }
}
