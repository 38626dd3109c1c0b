//! Fuzz the inbound command-payload parsers.
//!
//! The MQTT bridge hands raw payload bytes to `telemetry::parse_command`;
//! arbitrary input must only ever yield `Ok(command)` or `BadPayload`,
//! never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vlift::telemetry::{parse_command, parse_mode, parse_switch, EntityId};

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = core::str::from_utf8(data) else {
        return;
    };

    let _ = parse_mode(payload);
    let _ = parse_switch(payload);

    // Pod index comes from the topic; exercise in-range and out-of-range.
    for entity in [
        EntityId::Mode,
        EntityId::SystemMode,
        EntityId::FollowSystem,
        EntityId::BatteryPct,
    ] {
        let _ = parse_command(entity, 0, payload);
        let _ = parse_command(entity, 99, payload);
    }
});
