//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them — log to serial, publish over MQTT, draw on
//! the status display.

use crate::fsm::context::{LiftAction, LiftMode, LiftPosition};
use crate::telemetry::{PodTelemetry, UpdateCadence};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic telemetry snapshot for one pod.  The cadence tells the
    /// bridge which entity class came due (see
    /// [`entities_due`](crate::telemetry::entities_due)).
    Telemetry {
        cadence: UpdateCadence,
        data: PodTelemetry,
    },

    /// A pod's action or derived position changed.
    PodChanged {
        pod: u8,
        action: LiftAction,
        position: LiftPosition,
    },

    /// A pod's desired mode changed (command, button, or broadcast).
    ModeChanged { pod: u8, mode: LiftMode },

    /// The system mode changed (carried by pod 0).
    SystemModeChanged(LiftMode),

    /// One or more faults were raised on a pod.
    FaultDetected { pod: u8, flags: u8 },

    /// All faults on a pod have cleared.
    FaultCleared { pod: u8 },

    /// The application service has started.
    Started { pods: u8 },
}
