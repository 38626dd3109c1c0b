//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! The MQTT bridge implements the same trait on the network side.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::telemetry::mode_payload;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry { cadence, data: t } => {
                info!(
                    "TELEM | {:?} | pod {} | {:?}/{:?}/{:?} | top={} bot={} | \
                     bat={}% {:.2}V | up={}s | faults=0b{:08b}",
                    cadence,
                    t.pod,
                    t.mode,
                    t.action,
                    t.position,
                    if t.top_sensor { "wet" } else { "dry" },
                    if t.bottom_sensor { "wet" } else { "dry" },
                    t.battery_pct,
                    t.battery_volts,
                    t.uptime_secs,
                    t.fault_flags,
                );
            }
            AppEvent::PodChanged {
                pod,
                action,
                position,
            } => {
                info!("POD   | {} -> {:?} @ {:?}", pod, action, position);
            }
            AppEvent::ModeChanged { pod, mode } => {
                info!("MODE  | pod {} -> {}", pod, mode_payload(*mode));
            }
            AppEvent::SystemModeChanged(mode) => {
                info!("MODE  | system -> {}", mode_payload(*mode));
            }
            AppEvent::FaultDetected { pod, flags } => {
                warn!("FAULT | pod {} raised, flags=0b{:08b}", pod, flags);
            }
            AppEvent::FaultCleared { pod } => {
                info!("FAULT | pod {} all cleared", pod);
            }
            AppEvent::Started { pods } => {
                info!("START | {} pods under control", pods);
            }
        }
    }
}
