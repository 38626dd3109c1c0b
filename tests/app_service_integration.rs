//! Integration tests: AppService → per-pod FSMs → actuator port.
//!
//! Drives the whole control core through mock ports, tick by tick, with
//! the default timing (50 ms tick, 8 s up-dwell, 3 s down-dwell).

use vlift::app::commands::AppCommand;
use vlift::app::events::AppEvent;
use vlift::app::ports::{ActuatorPort, EventSink, InputPort};
use vlift::app::service::AppService;
use vlift::config::LiftConfig;
use vlift::error::CommandError;
use vlift::fleet::MAX_PODS;
use vlift::fsm::context::{LiftAction, LiftMode, LiftPosition, RelayCommands};
use vlift::fsm::StateId;
use vlift::input::RawInputs;

// ── Mock implementations ──────────────────────────────────────

struct MockHw {
    raw: [RawInputs; MAX_PODS],
    battery_raw: [u16; MAX_PODS],
    /// Every apply() call the service made, in order.
    applied: Vec<(usize, RelayCommands)>,
}

impl MockHw {
    fn new() -> Self {
        Self {
            raw: [RawInputs::default(); MAX_PODS],
            battery_raw: [0; MAX_PODS],
            applied: Vec::new(),
        }
    }

    fn applied_for(&self, pod: usize) -> Vec<RelayCommands> {
        self.applied
            .iter()
            .filter(|(p, _)| *p == pod)
            .map(|(_, c)| *c)
            .collect()
    }
}

impl InputPort for MockHw {
    fn read_raw(&mut self, pod: usize) -> RawInputs {
        self.raw.get(pod).copied().unwrap_or_default()
    }

    fn read_battery_raw(&mut self, pod: usize) -> u16 {
        self.battery_raw.get(pod).copied().unwrap_or_default()
    }
}

impl ActuatorPort for MockHw {
    fn apply(&mut self, pod: usize, commands: &RelayCommands) {
        self.applied.push((pod, *commands));
    }

    fn all_off(&mut self) {}
}

#[derive(Default)]
struct RecordingSink {
    events: Vec<AppEvent>,
}

impl RecordingSink {
    fn fault_detections(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::FaultDetected { .. }))
            .count()
    }

    fn fault_clears(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::FaultCleared { .. }))
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Helpers ───────────────────────────────────────────────────

const TICK_MS: u32 = 50;
/// Ticks for a raw level to pass the 4-sample debouncer.
const DEBOUNCE_TICKS: u32 = 4;

fn make_app(pods: usize) -> (AppService, MockHw, RecordingSink) {
    let config = LiftConfig {
        pod_count: pods,
        ..Default::default()
    };
    let mut app = AppService::new(config);
    let hw = MockHw::new();
    let mut sink = RecordingSink::default();
    app.start(&mut sink);
    (app, hw, sink)
}

fn run(app: &mut AppService, hw: &mut MockHw, sink: &mut RecordingSink, ticks: u32) {
    for _ in 0..ticks {
        app.tick(hw, sink);
    }
}

fn up_settle_ticks() -> u32 {
    LiftConfig::default().up_settle_ms / TICK_MS
}

// ── Mode Off stops within one tick ────────────────────────────

#[test]
fn mode_off_stops_within_one_tick() {
    let (mut app, mut hw, mut sink) = make_app(2);

    app.handle_command(
        AppCommand::SetPodMode {
            pod: 1,
            mode: LiftMode::Up,
        },
        &mut sink,
    )
    .unwrap();
    run(&mut app, &mut hw, &mut sink, 5);
    assert_eq!(app.state(1).unwrap(), StateId::Raising);

    app.handle_command(
        AppCommand::SetPodMode {
            pod: 1,
            mode: LiftMode::Off,
        },
        &mut sink,
    )
    .unwrap();
    app.tick(&mut hw, &mut sink);

    assert_eq!(app.state(1).unwrap(), StateId::Stopped);
    assert_eq!(app.fleet().pod(1).unwrap().action, LiftAction::Stop);
}

// ── Raise → seat → stop, with exact dwell timing ─────────────

#[test]
fn raise_seats_for_the_full_up_dwell_then_stops() {
    let (mut app, mut hw, mut sink) = make_app(2);

    // Pod 1 rests at the bottom.
    hw.raw[1].bot_sensor = true;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 1);
    assert_eq!(app.fleet().pod(1).unwrap().position, LiftPosition::Down);

    app.handle_command(
        AppCommand::SetPodMode {
            pod: 1,
            mode: LiftMode::Up,
        },
        &mut sink,
    )
    .unwrap();
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.state(1).unwrap(), StateId::Raising);
    let last = *hw.applied_for(1).last().unwrap();
    assert!(last.up_relay && !last.down_relay && last.up_led);

    // The pod leaves the bottom and reaches the top sensor.
    hw.raw[1].bot_sensor = false;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS);
    hw.raw[1].top_sensor = true;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS);
    assert_eq!(app.state(1).unwrap(), StateId::SeatingUp);
    assert_eq!(app.fleet().pod(1).unwrap().position, LiftPosition::AlmostUp);

    // Relay stays engaged for the full settle window...
    run(&mut app, &mut hw, &mut sink, up_settle_ticks() - 1);
    assert_eq!(app.state(1).unwrap(), StateId::SeatingUp);
    assert_eq!(app.fleet().pod(1).unwrap().action, LiftAction::Raise);

    // ...and releases exactly at its end.
    app.tick(&mut hw, &mut sink);
    assert_eq!(app.state(1).unwrap(), StateId::Stopped);
    assert_eq!(app.fleet().pod(1).unwrap().position, LiftPosition::Up);
    let last = *hw.applied_for(1).last().unwrap();
    assert_eq!(last, RelayCommands::all_off());
}

// ── Sensor conflict forces Stop/Middle regardless of mode ────

#[test]
fn both_sensors_wet_forces_stop_and_middle() {
    let (mut app, mut hw, mut sink) = make_app(2);

    app.handle_command(AppCommand::SetSystemMode(LiftMode::Up), &mut sink)
        .unwrap();
    run(&mut app, &mut hw, &mut sink, 2);
    assert_eq!(app.state(0).unwrap(), StateId::Raising);

    hw.raw[0].top_sensor = true;
    hw.raw[0].bot_sensor = true;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 1);

    assert_eq!(app.state(0).unwrap(), StateId::Faulted);
    assert_eq!(app.fleet().pod(0).unwrap().action, LiftAction::Stop);
    assert_eq!(app.fleet().pod(0).unwrap().position, LiftPosition::Middle);
    assert_eq!(sink.fault_detections(), 1);

    // The conflict clears; the pod resumes (mode is still Up).
    hw.raw[0].bot_sensor = false;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 2);
    assert_eq!(sink.fault_clears(), 1);
    assert_ne!(app.state(0).unwrap(), StateId::Faulted);
}

#[test]
fn persistent_conflict_reports_a_single_fault_event() {
    let (mut app, mut hw, mut sink) = make_app(1);
    hw.raw[0].top_sensor = true;
    hw.raw[0].bot_sensor = true;
    run(&mut app, &mut hw, &mut sink, 50);
    assert_eq!(sink.fault_detections(), 1);
}

// ── Fleet coordination ────────────────────────────────────────

#[test]
fn system_mode_honours_follow_flags() {
    let (mut app, mut hw, mut sink) = make_app(3);

    app.handle_command(
        AppCommand::SetFollowSystem {
            pod: 1,
            follow: true,
        },
        &mut sink,
    )
    .unwrap();
    app.handle_command(AppCommand::SetSystemMode(LiftMode::Up), &mut sink)
        .unwrap();
    app.tick(&mut hw, &mut sink);

    assert_eq!(app.fleet().pod(0).unwrap().mode, LiftMode::Up);
    assert_eq!(app.fleet().pod(1).unwrap().mode, LiftMode::Up);
    assert_eq!(app.fleet().pod(2).unwrap().mode, LiftMode::Off);
    assert_eq!(app.state(1).unwrap(), StateId::Raising);
    assert_eq!(app.state(2).unwrap(), StateId::Stopped);
}

#[test]
fn out_of_range_commands_never_reach_a_state_machine() {
    let (mut app, _hw, mut sink) = make_app(2);
    assert_eq!(
        app.handle_command(
            AppCommand::SetPodMode {
                pod: 9,
                mode: LiftMode::Up
            },
            &mut sink
        ),
        Err(CommandError::InvalidPod)
    );
    assert_eq!(
        app.handle_command(
            AppCommand::SetFollowSystem {
                pod: 0,
                follow: true
            },
            &mut sink
        ),
        Err(CommandError::NotAFollower)
    );
}

// ── Level-triggered state, edge-triggered outputs ─────────────

#[test]
fn repeated_system_mode_produces_no_extra_relay_writes() {
    let (mut app, mut hw, mut sink) = make_app(2);

    app.handle_command(AppCommand::SetSystemMode(LiftMode::Up), &mut sink)
        .unwrap();
    run(&mut app, &mut hw, &mut sink, 10);
    let writes_after_first = hw.applied.len();

    app.handle_command(AppCommand::SetSystemMode(LiftMode::Up), &mut sink)
        .unwrap();
    run(&mut app, &mut hw, &mut sink, 10);

    assert_eq!(
        hw.applied.len(),
        writes_after_first,
        "identical mode must not toggle relays again"
    );
}

// ── Stall fail-safe ───────────────────────────────────────────

#[test]
fn stalled_travel_forces_stop_until_the_next_mode_command() {
    let config = LiftConfig {
        pod_count: 1,
        max_travel_ms: 2_000,
        ..Default::default()
    };
    let mut app = AppService::new(config);
    let mut hw = MockHw::new();
    let mut sink = RecordingSink::default();
    app.start(&mut sink);

    app.handle_command(AppCommand::SetSystemMode(LiftMode::Up), &mut sink)
        .unwrap();
    // No sensor ever trips: the stall window expires.
    run(&mut app, &mut hw, &mut sink, 2_000 / TICK_MS + 3);

    assert_eq!(app.state(0).unwrap(), StateId::Faulted);
    assert_eq!(app.fleet().pod(0).unwrap().action, LiftAction::Stop);
    assert_eq!(sink.fault_detections(), 1);

    // Latched: time alone does not re-engage the relay.
    run(&mut app, &mut hw, &mut sink, 40);
    assert_eq!(app.state(0).unwrap(), StateId::Faulted);

    // A fresh mode command unlatches and allows a retry.
    app.handle_command(AppCommand::SetSystemMode(LiftMode::Off), &mut sink)
        .unwrap();
    run(&mut app, &mut hw, &mut sink, 2);
    assert_eq!(app.state(0).unwrap(), StateId::Stopped);
    assert_eq!(sink.fault_clears(), 1);
}

// ── Buttons ───────────────────────────────────────────────────

#[test]
fn short_press_requests_this_pods_mode() {
    let (mut app, mut hw, mut sink) = make_app(2);

    hw.raw[1].up_button = true;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 2);
    hw.raw[1].up_button = false;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 2);

    assert_eq!(app.fleet().pod(1).unwrap().mode, LiftMode::Up);
    assert_eq!(app.state(1).unwrap(), StateId::Raising);
    // The other pod is untouched.
    assert_eq!(app.fleet().pod(0).unwrap().mode, LiftMode::Off);
}

#[test]
fn short_press_toward_current_mode_toggles_off() {
    let (mut app, mut hw, mut sink) = make_app(2);

    app.handle_command(
        AppCommand::SetPodMode {
            pod: 1,
            mode: LiftMode::Up,
        },
        &mut sink,
    )
    .unwrap();
    run(&mut app, &mut hw, &mut sink, 2);

    hw.raw[1].up_button = true;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 2);
    hw.raw[1].up_button = false;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 2);

    assert_eq!(app.fleet().pod(1).unwrap().mode, LiftMode::Off);
    assert_eq!(app.state(1).unwrap(), StateId::Stopped);
}

#[test]
fn local_button_wins_over_remote_command_in_the_same_tick() {
    let (mut app, mut hw, mut sink) = make_app(2);

    // Button already held and debounced; release is in flight.
    hw.raw[1].up_button = true;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 2);
    hw.raw[1].up_button = false;

    // Remote command lands between ticks; the release gesture resolves
    // inside the following ticks and must win.
    app.handle_command(
        AppCommand::SetPodMode {
            pod: 1,
            mode: LiftMode::Down,
        },
        &mut sink,
    )
    .unwrap();
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 2);

    assert_eq!(app.fleet().pod(1).unwrap().mode, LiftMode::Up);
}

#[test]
fn both_buttons_is_the_emergency_stop() {
    let (mut app, mut hw, mut sink) = make_app(3);

    app.handle_command(
        AppCommand::SetFollowSystem {
            pod: 1,
            follow: true,
        },
        &mut sink,
    )
    .unwrap();
    app.handle_command(AppCommand::SetSystemMode(LiftMode::Up), &mut sink)
        .unwrap();
    run(&mut app, &mut hw, &mut sink, 3);
    assert_eq!(app.state(0).unwrap(), StateId::Raising);
    assert_eq!(app.state(1).unwrap(), StateId::Raising);

    hw.raw[0].up_button = true;
    hw.raw[0].down_button = true;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 2);

    assert_eq!(app.system_mode(), LiftMode::Off);
    assert_eq!(app.fleet().pod(0).unwrap().action, LiftAction::Stop);
    assert_eq!(app.fleet().pod(1).unwrap().action, LiftAction::Stop);
}

#[test]
fn long_press_broadcasts_the_system_mode() {
    let (mut app, mut hw, mut sink) = make_app(2);
    let long_ticks = LiftConfig::default().long_press_ms / TICK_MS;

    hw.raw[1].down_button = true;
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + long_ticks + 2);

    assert_eq!(app.system_mode(), LiftMode::Down);
    // Pod 1 itself is an independent follower and keeps its own mode.
    assert_eq!(app.fleet().pod(1).unwrap().mode, LiftMode::Off);
}

// ── Battery and telemetry snapshots ───────────────────────────

#[test]
fn battery_refresh_fills_the_records() {
    let (mut app, mut hw, mut sink) = make_app(2);
    let cal = LiftConfig::default().battery;

    // Raw count corresponding to a full pack.
    let full_raw = (cal.max_volts / (cal.divider_ratio * cal.multiplier) / cal.adc_ref_volts
        * f32::from(cal.adc_max)) as u16;
    hw.battery_raw[0] = full_raw;
    hw.battery_raw[1] = 0;
    app.refresh_battery(&mut hw);
    run(&mut app, &mut hw, &mut sink, 1);

    let pod0 = app.fleet().pod(0).unwrap();
    assert!(pod0.battery_pct >= 99);
    assert!((pod0.battery_volts - cal.max_volts).abs() < 0.1);
    assert_eq!(app.fleet().pod(1).unwrap().battery_pct, 0);
}

#[test]
fn telemetry_snapshot_mirrors_the_live_state() {
    let (mut app, mut hw, mut sink) = make_app(2);

    hw.raw[0].bot_sensor = true;
    app.handle_command(
        AppCommand::SetPodMode {
            pod: 1,
            mode: LiftMode::Up,
        },
        &mut sink,
    )
    .unwrap();
    app.note_uptime(4_242);
    run(&mut app, &mut hw, &mut sink, DEBOUNCE_TICKS + 1);

    let t0 = app.build_telemetry(0).unwrap();
    assert_eq!(t0.pod, 0);
    assert!(t0.bottom_sensor);
    assert_eq!(t0.position, LiftPosition::Down);
    assert_eq!(t0.uptime_secs, 4_242);
    assert_eq!(t0.version.as_str(), env!("CARGO_PKG_VERSION"));

    let t1 = app.build_telemetry(1).unwrap();
    assert_eq!(t1.mode, LiftMode::Up);
    assert_eq!(t1.action, LiftAction::Raise);
}

// ── Config persistence flow ───────────────────────────────────

#[test]
fn config_update_auto_saves_after_the_grace_period() {
    use vlift::adapters::nvs::NvsAdapter;

    let (mut app, mut hw, mut sink) = make_app(2);
    let nvs = NvsAdapter::new().unwrap();

    let cfg = LiftConfig {
        down_settle_ms: 2_500,
        ..Default::default()
    };
    app.handle_command(AppCommand::UpdateConfig(cfg), &mut sink)
        .unwrap();
    assert!(app.is_config_dirty());
    assert!(!app.auto_save_if_needed(&nvs), "grace period not yet over");

    // 5 s of ticks later the save fires.
    run(&mut app, &mut hw, &mut sink, 5_000 / TICK_MS + 1);
    assert!(app.auto_save_if_needed(&nvs));
    assert!(!app.is_config_dirty());

    use vlift::app::ports::ConfigPort;
    assert_eq!(nvs.load().unwrap().down_settle_ms, 2_500);
}
