//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (MQTT bridge,
//! serial console) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.  Pod indices are validated at the coordinator
//! boundary; an invalid index never reaches a state machine.

use crate::config::LiftConfig;
use crate::fsm::context::LiftMode;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Set one pod's desired mode.  Pod 0's mode is the system mode, so
    /// addressing pod 0 broadcasts to force-followed pods.
    SetPodMode { pod: usize, mode: LiftMode },

    /// Broadcast the system mode (pod 0 plus every follower that has
    /// follow-system enabled).
    SetSystemMode(LiftMode),

    /// Enable or disable a follower pod's follow-system flag.  Enabling
    /// immediately applies the current system mode to that pod.
    SetFollowSystem { pod: usize, follow: bool },

    /// Hot-reload configuration (e.g. from NVS or the bridge).
    UpdateConfig(LiftConfig),

    /// Explicitly persist the current config to NVS on the next check.
    SaveConfig,
}
