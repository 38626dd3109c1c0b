//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the per-pod state machines, supervisors, the fleet
//! store, and the debounced input reader.  It exposes a clean,
//! hardware-agnostic API.  All I/O flows through port traits injected at
//! call sites, making the entire service testable with mock adapters.
//!
//! ```text
//!   InputPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          AppService          │
//! ActuatorPort ◀──│  FSM × N · Supervisor × N    │
//!                 │  InputReader · Fleet         │
//!                 └──────────────────────────────┘
//! ```
//!
//! ## Tick order and the button tie-break
//!
//! The main loop drains queued remote commands **before** the control
//! tick; button gestures are classified **inside** the tick and applied
//! last.  A local gesture therefore deterministically overrides a remote
//! mode request that arrived in the same tick.

use heapless::Vec;
use log::{info, warn};

use crate::config::LiftConfig;
use crate::error::CommandError;
use crate::fleet::{Fleet, MAX_PODS};
use crate::fsm::context::{LiftContext, LiftMode, RelayCommands, SensorState};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::input::{ButtonGesture, ButtonId, InputReader};
use crate::safety::LiftSupervisor;
use crate::telemetry::PodTelemetry;

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{ActuatorPort, ConfigPort, EventSink, InputPort};

/// Milliseconds a dirty config waits before the auto-save check fires.
const AUTO_SAVE_DELAY_MS: u64 = 5_000;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    config: LiftConfig,
    fleet: Fleet,
    fsms: Vec<Fsm, MAX_PODS>,
    ctxs: Vec<LiftContext, MAX_PODS>,
    supervisors: Vec<LiftSupervisor, MAX_PODS>,
    input: InputReader,
    /// Last commands actually written to the hardware, per pod.  Outputs
    /// are level-state inside the core but edge-triggered at the port.
    last_applied: Vec<Option<RelayCommands>, MAX_PODS>,
    tick_count: u64,
    /// Monotonic millisecond clock advanced by the tick period; feeds the
    /// gesture timing in the input reader.
    now_ms: u32,
    config_dirty: bool,
    dirty_since_tick: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the state machines — call [`Self::start`] next.
    pub fn new(config: LiftConfig) -> Self {
        let fleet = Fleet::new(config.pod_count, env!("CARGO_PKG_VERSION"));
        let mut fsms = Vec::new();
        let mut ctxs = Vec::new();
        let mut supervisors = Vec::new();
        let mut last_applied = Vec::new();
        for pod in 0..fleet.len() {
            // Capacity is MAX_PODS; fleet.len() is clamped to it.
            let _ = fsms.push(Fsm::new(build_state_table(), StateId::Stopped, pod));
            let _ = ctxs.push(LiftContext::new(config.clone()));
            let _ = supervisors.push(LiftSupervisor::new(&config));
            let _ = last_applied.push(None);
        }
        let input = InputReader::new(&config);

        Self {
            config,
            fleet,
            fsms,
            ctxs,
            supervisors,
            input,
            last_applied,
            tick_count: 0,
            now_ms: 0,
            config_dirty: false,
            dirty_since_tick: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Run the initial `on_enter` for every pod's starting state.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        for pod in 0..self.fleet.len() {
            self.fsms[pod].start(&mut self.ctxs[pod]);
        }
        sink.emit(&AppEvent::Started {
            pods: self.fleet.len() as u8,
        });
        info!("AppService started with {} pods", self.fleet.len());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle for every pod in index order:
    /// sample inputs → gestures → supervisor → state machine → store
    /// write-back → actuators.
    ///
    /// The `hw` parameter satisfies **both** [`InputPort`] and
    /// [`ActuatorPort`] — this avoids a double mutable borrow while keeping
    /// the port boundary explicit.
    pub fn tick(&mut self, hw: &mut (impl InputPort + ActuatorPort), sink: &mut impl EventSink) {
        self.tick_count += 1;
        self.now_ms = self.now_ms.wrapping_add(self.config.control_loop_interval_ms);

        for pod in 0..self.fleet.len() {
            // 1. Sample and debounce this pod's inputs.
            let raw = hw.read_raw(pod);
            let inputs = self.input.sample(pod, raw, self.now_ms);

            // 2. Local button gestures apply now — after any remote
            //    commands this tick, so the button wins the tie-break.
            if let Some(gesture) = inputs.gesture {
                self.apply_gesture(pod, gesture, sink);
            }

            let sensors = SensorState {
                top_wet: inputs.top_wet,
                bot_wet: inputs.bot_wet,
            };
            let Ok(mode) = self.fleet.pod(pod).map(|p| p.mode) else {
                continue;
            };

            // 3. Supervisor evaluation (sensor conflict, travel stall).
            let last_action = self.fsms[pod].current_state().action();
            let faults = self.supervisors[pod].evaluate(&sensors, last_action);
            let prev_faults = self.ctxs[pod].fault_flags;
            if faults != 0 && prev_faults == 0 {
                warn!("pod {pod}: faults raised, flags=0b{faults:08b}");
                sink.emit(&AppEvent::FaultDetected {
                    pod: pod as u8,
                    flags: faults,
                });
            } else if faults == 0 && prev_faults != 0 {
                sink.emit(&AppEvent::FaultCleared { pod: pod as u8 });
            }

            // 4. State machine tick (pure state logic).
            let prev_state = self.fsms[pod].current_state();
            {
                let ctx = &mut self.ctxs[pod];
                ctx.mode = mode;
                ctx.sensors = sensors;
                ctx.fault_flags = faults;
            }
            self.fsms[pod].tick(&mut self.ctxs[pod]);
            let state = self.fsms[pod].current_state();

            // 5. Write the derived fields back into the pod store.
            let position = self.ctxs[pod].position;
            if let Ok(rec) = self.fleet.pod_mut(pod) {
                rec.action = state.action();
                rec.position = position;
                rec.top_wet = sensors.top_wet;
                rec.bot_wet = sensors.bot_wet;
                rec.last_update_tick = self.tick_count;
            }

            // 6. Apply actuator commands — only on change, so a steady
            //    state produces no output edges.
            let commands = self.ctxs[pod].commands;
            if self.last_applied[pod] != Some(commands) {
                hw.apply(pod, &commands);
                self.last_applied[pod] = Some(commands);
            }

            // 7. Report the transition.
            if state != prev_state {
                sink.emit(&AppEvent::PodChanged {
                    pod: pod as u8,
                    action: state.action(),
                    position: self.ctxs[pod].position,
                });
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from the MQTT bridge or serial
    /// console).  Invalid pod indices are rejected here and never reach a
    /// state machine.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        sink: &mut impl EventSink,
    ) -> Result<(), CommandError> {
        match cmd {
            AppCommand::SetPodMode { pod, mode } => self.request_pod_mode(pod, mode, sink),
            AppCommand::SetSystemMode(mode) => {
                self.request_system_mode(mode, sink);
                Ok(())
            }
            AppCommand::SetFollowSystem { pod, follow } => {
                let mode_changed = self.fleet.set_follow_system(pod, follow)?;
                info!("pod {pod}: follow_system={follow}");
                if mode_changed {
                    self.supervisors[pod].note_mode_change();
                    let mode = self.fleet.pod(pod)?.mode;
                    sink.emit(&AppEvent::ModeChanged {
                        pod: pod as u8,
                        mode,
                    });
                }
                Ok(())
            }
            AppCommand::UpdateConfig(config) => {
                self.apply_config(config);
                Ok(())
            }
            AppCommand::SaveConfig => {
                self.dirty_since_tick = 0;
                self.mark_config_dirty();
                info!("explicit config save requested (will flush on next auto-save check)");
                Ok(())
            }
        }
    }

    /// Set one pod's mode.  Addressing pod 0 broadcasts (its mode is the
    /// system mode).
    pub fn request_pod_mode(
        &mut self,
        pod: usize,
        mode: LiftMode,
        sink: &mut impl EventSink,
    ) -> Result<(), CommandError> {
        let changed = self.fleet.set_pod_mode(pod, mode)?;
        self.after_mode_change(&changed, sink);
        Ok(())
    }

    /// Broadcast the system mode.
    pub fn request_system_mode(&mut self, mode: LiftMode, sink: &mut impl EventSink) {
        let changed = self.fleet.set_system_mode(mode);
        self.after_mode_change(&changed, sink);
    }

    fn after_mode_change(&mut self, changed: &[usize], sink: &mut impl EventSink) {
        for &pod in changed {
            self.supervisors[pod].note_mode_change();
            if let Ok(rec) = self.fleet.pod(pod) {
                sink.emit(&AppEvent::ModeChanged {
                    pod: pod as u8,
                    mode: rec.mode,
                });
                if pod == 0 {
                    sink.emit(&AppEvent::SystemModeChanged(rec.mode));
                }
            }
        }
    }

    // ── Button gestures ───────────────────────────────────────

    /// Map a classified gesture onto fleet operations:
    /// short press drives this pod (pressing toward the current mode
    /// toggles Off), long press broadcasts, both-pressed is the
    /// emergency stop.
    fn apply_gesture(&mut self, pod: usize, gesture: ButtonGesture, sink: &mut impl EventSink) {
        let result = match gesture {
            ButtonGesture::Short(btn) => {
                let target = match btn {
                    ButtonId::Up => LiftMode::Up,
                    ButtonId::Down => LiftMode::Down,
                };
                let Ok(current) = self.fleet.pod(pod).map(|p| p.mode) else {
                    return;
                };
                let mode = if current == target {
                    LiftMode::Off
                } else {
                    target
                };
                info!("pod {pod}: short press -> {mode:?}");
                self.request_pod_mode(pod, mode, sink)
            }
            ButtonGesture::Long(btn) => {
                let mode = match btn {
                    ButtonId::Up => LiftMode::Up,
                    ButtonId::Down => LiftMode::Down,
                };
                info!("pod {pod}: long press -> system {mode:?}");
                self.request_system_mode(mode, sink);
                Ok(())
            }
            ButtonGesture::BothPressed => {
                warn!("pod {pod}: both buttons pressed -> system Off");
                self.request_system_mode(LiftMode::Off, sink);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("pod {pod}: button request rejected: {e}");
        }
    }

    // ── Telemetry-cadence work ────────────────────────────────

    /// Refresh every pod's battery figures from the ADC.  Runs on the
    /// ten-second telemetry cadence, outside the control tick.
    pub fn refresh_battery(&mut self, hw: &mut impl InputPort) {
        for pod in 0..self.fleet.len() {
            let raw = hw.read_battery_raw(pod);
            let reading = crate::sensors::battery::convert(raw, &self.config.battery);
            if let Ok(rec) = self.fleet.pod_mut(pod) {
                rec.battery_volts = reading.volts;
                rec.battery_pct = reading.percent;
            }
        }
    }

    /// Propagate the node uptime into the pod records.
    pub fn note_uptime(&mut self, uptime_secs: u64) {
        for pod in 0..self.fleet.len() {
            if let Ok(rec) = self.fleet.pod_mut(pod) {
                rec.uptime_secs = uptime_secs;
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot for one pod.
    pub fn build_telemetry(&self, pod: usize) -> Result<PodTelemetry, CommandError> {
        let rec = self.fleet.pod(pod)?;
        Ok(PodTelemetry {
            pod: pod as u8,
            mode: rec.mode,
            action: rec.action,
            position: rec.position,
            top_sensor: rec.top_wet,
            bottom_sensor: rec.bot_wet,
            battery_pct: rec.battery_pct,
            battery_volts: rec.battery_volts,
            uptime_secs: rec.uptime_secs,
            version: rec.version.clone(),
            fault_flags: self
                .ctxs
                .get(pod)
                .map(|c| c.fault_flags)
                .unwrap_or_default(),
        })
    }

    /// Read-only view of the pod store (for the bridge and display).
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Current state of one pod's machine.
    pub fn state(&self, pod: usize) -> Result<StateId, CommandError> {
        self.fsms
            .get(pod)
            .map(|f| f.current_state())
            .ok_or(CommandError::InvalidPod)
    }

    /// The fleet-wide system mode (pod 0's mode).
    pub fn system_mode(&self) -> LiftMode {
        self.fleet.system_mode()
    }

    /// Number of pods under control.
    pub fn pod_count(&self) -> usize {
        self.fleet.len()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Current fault bitmask for one pod (0 = no faults).
    pub fn fault_flags(&self, pod: usize) -> u8 {
        self.ctxs.get(pod).map(|c| c.fault_flags).unwrap_or_default()
    }

    /// Clone of the live configuration.
    pub fn current_config(&self) -> LiftConfig {
        self.config.clone()
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_config(&mut self, config: LiftConfig) {
        if config.pod_count != self.fleet.len() {
            warn!(
                "pod_count change ({} -> {}) requires a restart; keeping {}",
                self.fleet.len(),
                config.pod_count,
                self.fleet.len()
            );
        }
        for ctx in self.ctxs.iter_mut() {
            ctx.config = config.clone();
            ctx.tick_period_ms = config.control_loop_interval_ms;
        }
        for sup in self.supervisors.iter_mut() {
            sup.reconfigure(&config);
        }
        self.input.reconfigure(&config);
        self.config = config;
        self.mark_config_dirty();
        info!("configuration updated at runtime");
    }

    // ── Config dirty-flag management ──────────────────────────

    /// Mark the config as modified.
    pub fn mark_config_dirty(&mut self) {
        if !self.config_dirty {
            self.config_dirty = true;
            self.dirty_since_tick = self.tick_count;
        }
    }

    /// Check if auto-save should trigger (5 seconds after last change).
    /// Returns `true` if the config was saved.
    pub fn auto_save_if_needed(&mut self, storage: &impl ConfigPort) -> bool {
        if !self.config_dirty {
            return false;
        }
        let ticks_since_dirty = self.tick_count.saturating_sub(self.dirty_since_tick);
        let ms_since_dirty = ticks_since_dirty * u64::from(self.config.control_loop_interval_ms);
        if ms_since_dirty < AUTO_SAVE_DELAY_MS {
            return false;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("config auto-saved to NVS");
                true
            }
            Err(e) => {
                warn!("config auto-save failed: {}", e);
                false
            }
        }
    }

    /// Force-save if dirty (call before shutdown).
    pub fn force_save_if_dirty(&mut self, storage: &impl ConfigPort) {
        if !self.config_dirty {
            return;
        }
        match storage.save(&self.config) {
            Ok(()) => {
                self.config_dirty = false;
                info!("config force-saved before shutdown");
            }
            Err(e) => {
                warn!("config force-save failed: {}", e);
            }
        }
    }

    /// Whether the config has unsaved changes.
    pub fn is_config_dirty(&self) -> bool {
        self.config_dirty
    }
}
