//! V-Lift Pod Controller — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink     NvsAdapter   TimeAdapter│
//! │  (Input+Actuator)     (EventSink)      (Config+KV)  (uptime)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Lift FSM × N · Supervisors · Fleet · InputReader      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  CadenceScheduler (telemetry classes) · Watchdog (TWDT)        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The WiFi association and MQTT client live outside this loop; they feed
//! commands in through [`AppService::handle_command`] and consume the
//! events this loop emits through the sink.
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use vlift::adapters::hardware::HardwareAdapter;
use vlift::adapters::log_sink::LogEventSink;
use vlift::adapters::nvs::NvsAdapter;
use vlift::adapters::time::TimeAdapter;
use vlift::app::events::AppEvent;
use vlift::app::ports::{ConfigPort, EventSink};
use vlift::app::service::AppService;
use vlift::config::{LiftConfig, NodeConfig};
use vlift::diagnostics;
use vlift::drivers::watchdog::Watchdog;
use vlift::events::{self, Event};
use vlift::scheduler::CadenceScheduler;
use vlift::telemetry::{UpdateCadence, entities_due};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!(
        "V-Lift pod controller v{} starting",
        diagnostics::firmware_version()
    );

    // ── 2. Hardware peripherals ───────────────────────────────
    if let Err(e) = vlift::drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt; the TWDT
        // resets the board after its timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = Watchdog::new();

    // ── 3. Configuration from NVS (or defaults) ───────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("NVS init failed ({e}), running with defaults and no persistence");
            None
        }
    };
    let node: NodeConfig = nvs
        .as_ref()
        .and_then(|n| n.load_node().ok())
        .unwrap_or_default();
    let lift_config: LiftConfig = nvs
        .as_ref()
        .and_then(|n| n.load().ok())
        .unwrap_or_default();

    info!(
        "node: pod {} of {}, mqtt {}:{}, ext_antenna={}",
        node.pod_number, lift_config.pod_count, node.mqtt_server, node.mqtt_port, node.ext_antenna
    );

    // ── 4. Adapters and the application core ──────────────────
    let time = TimeAdapter::new();
    let mut hw = HardwareAdapter::new(usize::from(node.pod_number));
    let mut sink = LogEventSink::new();
    let mut scheduler = CadenceScheduler::new();
    let mut service = AppService::new(lift_config.clone());
    service.start(&mut sink);

    // ── 5. Tick timers, then the cooperative loop ─────────────
    vlift::drivers::hw_timer::start_timers(lift_config.control_loop_interval_ms);

    loop {
        events::drain_events(|event| match event {
            Event::ControlTick => {
                service.tick(&mut hw, &mut sink);
                if let Some(nvs) = nvs.as_ref() {
                    service.auto_save_if_needed(nvs);
                }
            }

            Event::TelemetryBaseTick => {
                service.refresh_battery(&mut hw);
                service.note_uptime(time.uptime_secs());
                for cadence in scheduler.on_base_tick() {
                    emit_telemetry(&service, cadence, &mut sink);
                }
            }

            Event::HubOnline => {
                // The hub restarted: republish every entity class so its
                // state is rebuilt without waiting for the slow cadences.
                info!("hub online — full republish");
                for cadence in [
                    UpdateCadence::TenSeconds,
                    UpdateCadence::OneMinute,
                    UpdateCadence::FiveMinutes,
                    UpdateCadence::OneHour,
                    UpdateCadence::OneDay,
                ] {
                    emit_telemetry(&service, cadence, &mut sink);
                }
            }

            // Command payloads are applied by the comms task through
            // AppService::handle_command before this wake-up lands.
            Event::CommandReceived => {}

            Event::WatchdogTick => watchdog.feed(),
        });

        watchdog.feed();
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Emit one telemetry snapshot per pod for a due cadence class.
fn emit_telemetry(service: &AppService, cadence: UpdateCadence, sink: &mut impl EventSink) {
    if entities_due(cadence).next().is_none() {
        return;
    }
    for pod in 0..service.pod_count() {
        match service.build_telemetry(pod) {
            Ok(data) => sink.emit(&AppEvent::Telemetry { cadence, data }),
            Err(e) => warn!("telemetry snapshot for pod {pod} failed: {e}"),
        }
    }
}
