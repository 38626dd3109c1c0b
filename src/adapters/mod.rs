//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements               | Connects to              |
//! |------------|--------------------------|--------------------------|
//! | `hardware` | InputPort, ActuatorPort  | ESP32 ADC, GPIO          |
//! | `log_sink` | EventSink                | Serial log output        |
//! | `nvs`      | ConfigPort, StoragePort  | NVS / in-memory store    |
//! | `time`     | —                        | ESP32 system timer       |
//!
//! The MQTT bridge that mirrors pod state to the home-automation hub is a
//! further `EventSink` implementor living outside this crate's core scope.

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
