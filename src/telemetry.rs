//! Telemetry vocabulary shared with the MQTT/Home-Assistant bridge.
//!
//! The bridge itself (client, topic formatting, discovery metadata) lives
//! outside the control core; this module defines everything that influences
//! behavior: the entity table with its publish cadences and subscribe
//! flags, the per-pod snapshot the core hands outward, and the parsing of
//! inbound command payloads into [`AppCommand`]s.

use serde::Serialize;

use crate::app::commands::AppCommand;
use crate::error::CommandError;
use crate::fsm::context::{LiftAction, LiftMode, LiftPosition};

// ---------------------------------------------------------------------------
// Cadence classes
// ---------------------------------------------------------------------------

/// How often the bridge republishes an entity.  `Never` means the entity is
/// bundled into the status message instead of published on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateCadence {
    TenSeconds,
    OneMinute,
    FiveMinutes,
    OneHour,
    OneDay,
    Never,
}

impl UpdateCadence {
    /// Period in seconds, or `None` for `Never`.
    pub fn period_secs(self) -> Option<u32> {
        match self {
            Self::TenSeconds => Some(10),
            Self::OneMinute => Some(60),
            Self::FiveMinutes => Some(300),
            Self::OneHour => Some(3_600),
            Self::OneDay => Some(86_400),
            Self::Never => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entity table
// ---------------------------------------------------------------------------

/// Home Assistant device class hint for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaClass {
    Moisture,
    Battery,
    Voltage,
    Duration,
    Info,
    Box,
}

/// Everything the core exposes to (or accepts from) the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityId {
    Version,
    Uptime,
    BatteryPct,
    BatteryVolts,
    TopSensor,
    BotSensor,
    Mode,
    SystemMode,
    FollowSystem,
}

/// One row of the entity table.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    pub id: EntityId,
    /// Entity name fragment used in topic strings by the bridge.
    pub name: &'static str,
    /// Published once per pod rather than once per node.
    pub per_pod: bool,
    /// The bridge subscribes to the matching command topic.
    pub subscribe: bool,
    /// Publish with the MQTT retain flag.
    pub retain: bool,
    pub class: HaClass,
    pub cadence: UpdateCadence,
}

/// The full entity table, mirrored by the bridge's discovery metadata.
pub const ENTITIES: &[EntityDescriptor] = &[
    EntityDescriptor {
        id: EntityId::Version,
        name: "version",
        per_pod: true,
        subscribe: false,
        retain: true,
        class: HaClass::Info,
        cadence: UpdateCadence::OneDay,
    },
    EntityDescriptor {
        id: EntityId::Uptime,
        name: "uptime",
        per_pod: true,
        subscribe: false,
        retain: false,
        class: HaClass::Duration,
        cadence: UpdateCadence::OneMinute,
    },
    EntityDescriptor {
        id: EntityId::BatteryPct,
        name: "battery",
        per_pod: true,
        subscribe: false,
        retain: false,
        class: HaClass::Battery,
        cadence: UpdateCadence::OneMinute,
    },
    EntityDescriptor {
        id: EntityId::BatteryVolts,
        name: "battery_voltage",
        per_pod: true,
        subscribe: false,
        retain: false,
        class: HaClass::Voltage,
        cadence: UpdateCadence::OneMinute,
    },
    EntityDescriptor {
        id: EntityId::TopSensor,
        name: "top_sensor",
        per_pod: true,
        subscribe: false,
        retain: false,
        class: HaClass::Moisture,
        cadence: UpdateCadence::TenSeconds,
    },
    EntityDescriptor {
        id: EntityId::BotSensor,
        name: "bottom_sensor",
        per_pod: true,
        subscribe: false,
        retain: false,
        class: HaClass::Moisture,
        cadence: UpdateCadence::TenSeconds,
    },
    EntityDescriptor {
        id: EntityId::Mode,
        name: "mode",
        per_pod: true,
        subscribe: true,
        retain: true,
        class: HaClass::Box,
        cadence: UpdateCadence::Never,
    },
    EntityDescriptor {
        id: EntityId::SystemMode,
        name: "system_mode",
        per_pod: false,
        subscribe: true,
        retain: true,
        class: HaClass::Box,
        cadence: UpdateCadence::Never,
    },
    EntityDescriptor {
        id: EntityId::FollowSystem,
        name: "follow_system",
        per_pod: true,
        subscribe: true,
        retain: true,
        class: HaClass::Box,
        cadence: UpdateCadence::Never,
    },
];

/// Entities the bridge should refresh for a given cadence class.
pub fn entities_due(cadence: UpdateCadence) -> impl Iterator<Item = &'static EntityDescriptor> {
    ENTITIES.iter().filter(move |e| e.cadence == cadence)
}

// ---------------------------------------------------------------------------
// Outbound snapshot
// ---------------------------------------------------------------------------

/// A point-in-time snapshot of one pod, suitable for the bridge's status
/// message.
#[derive(Debug, Clone, Serialize)]
pub struct PodTelemetry {
    pub pod: u8,
    pub mode: LiftMode,
    pub action: LiftAction,
    pub position: LiftPosition,
    pub top_sensor: bool,
    pub bottom_sensor: bool,
    pub battery_pct: u8,
    pub battery_volts: f32,
    pub uptime_secs: u64,
    pub version: heapless::String<8>,
    pub fault_flags: u8,
}

// ---------------------------------------------------------------------------
// Inbound command parsing
// ---------------------------------------------------------------------------

/// Parse a mode payload from the wire ("UP"/"DOWN"/"OFF", any case,
/// surrounding whitespace tolerated).
pub fn parse_mode(payload: &str) -> Result<LiftMode, CommandError> {
    let p = payload.trim();
    if p.eq_ignore_ascii_case("up") {
        Ok(LiftMode::Up)
    } else if p.eq_ignore_ascii_case("down") {
        Ok(LiftMode::Down)
    } else if p.eq_ignore_ascii_case("off") {
        Ok(LiftMode::Off)
    } else {
        Err(CommandError::BadPayload)
    }
}

/// Parse a switch payload ("ON"/"OFF").
pub fn parse_switch(payload: &str) -> Result<bool, CommandError> {
    let p = payload.trim();
    if p.eq_ignore_ascii_case("on") {
        Ok(true)
    } else if p.eq_ignore_ascii_case("off") {
        Ok(false)
    } else {
        Err(CommandError::BadPayload)
    }
}

/// Map an inbound command-topic payload onto an [`AppCommand`].
/// Only subscribable entities accept commands.
pub fn parse_command(
    entity: EntityId,
    pod: usize,
    payload: &str,
) -> Result<AppCommand, CommandError> {
    match entity {
        EntityId::Mode => Ok(AppCommand::SetPodMode {
            pod,
            mode: parse_mode(payload)?,
        }),
        EntityId::SystemMode => Ok(AppCommand::SetSystemMode(parse_mode(payload)?)),
        EntityId::FollowSystem => Ok(AppCommand::SetFollowSystem {
            pod,
            follow: parse_switch(payload)?,
        }),
        _ => Err(CommandError::BadPayload),
    }
}

/// Wire representation of a mode, used by the bridge when publishing.
pub fn mode_payload(mode: LiftMode) -> &'static str {
    match mode {
        LiftMode::Up => "UP",
        LiftMode::Down => "DOWN",
        LiftMode::Off => "OFF",
    }
}
