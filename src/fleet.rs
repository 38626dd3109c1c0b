//! Pod state store and fleet coordinator.
//!
//! One [`PodRecord`] per pod, indexed `0..pod_count`, created at startup and
//! never destroyed.  Write discipline (single writer per field):
//!
//! - `mode` and `role` are written only through the coordinator operations
//!   on [`Fleet`];
//! - `action`, `position` and the sensor mirrors are written only by the
//!   control tick in [`AppService`](crate::app::service::AppService);
//! - battery/uptime bookkeeping is refreshed on the telemetry cadence.
//!
//! Pod 0 is the coordinator: its mode *is* the system mode.  Followers
//! carry an explicit `follow_system` flag; while it is set, system-mode
//! broadcasts overwrite their mode.  Out-of-range indices are rejected
//! here, at the boundary — they never reach a state machine.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::fsm::context::{LiftAction, LiftMode, LiftPosition};

/// Fixed capacity of the pod array; `LiftConfig::pod_count` selects how
/// many slots are live (typically 2–6).
pub const MAX_PODS: usize = 6;

/// Coordinator vs follower — force-follow only exists on followers, so the
/// flag cannot be set on a pod where it is meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodRole {
    /// Pod 0.  Owns the system mode.
    Coordinator,
    /// Any other pod.  While `follow_system` is set, system-mode broadcasts
    /// overwrite this pod's mode.
    Follower { follow_system: bool },
}

/// The full mirrored state of one pod.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodRecord {
    pub mode: LiftMode,
    pub action: LiftAction,
    pub position: LiftPosition,
    pub top_wet: bool,
    pub bot_wet: bool,
    pub role: PodRole,
    pub battery_pct: u8,
    pub battery_volts: f32,
    pub uptime_secs: u64,
    /// Firmware version reported by the pod.
    pub version: String<8>,
    /// Tick at which the control loop last touched this record.
    pub last_update_tick: u64,
}

impl PodRecord {
    fn new(role: PodRole, version: &str) -> Self {
        let mut v = String::new();
        // Truncate rather than fail: the display field is fixed-width.
        let _ = v.push_str(&version[..version.len().min(8)]);
        Self {
            mode: LiftMode::Off,
            action: LiftAction::Stop,
            position: LiftPosition::Middle,
            top_wet: false,
            bot_wet: false,
            role,
            battery_pct: 0,
            battery_volts: 0.0,
            uptime_secs: 0,
            version: v,
            last_update_tick: 0,
        }
    }

    /// Whether a system-mode broadcast overwrites this pod.
    pub fn follows_system(&self) -> bool {
        match self.role {
            PodRole::Coordinator => true,
            PodRole::Follower { follow_system } => follow_system,
        }
    }
}

/// The fleet: pod records plus the coordinator operations over them.
pub struct Fleet {
    pods: Vec<PodRecord, MAX_PODS>,
}

impl Fleet {
    /// Build the fleet with `pod_count` records, all `Off`/`Stop`.
    pub fn new(pod_count: usize, version: &str) -> Self {
        let count = pod_count.clamp(1, MAX_PODS);
        let mut pods = Vec::new();
        for i in 0..count {
            let role = if i == 0 {
                PodRole::Coordinator
            } else {
                PodRole::Follower {
                    follow_system: false,
                }
            };
            // Capacity is MAX_PODS and count is clamped above.
            let _ = pods.push(PodRecord::new(role, version));
        }
        Self { pods }
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PodRecord> {
        self.pods.iter()
    }

    /// Read access to one pod's record.
    pub fn pod(&self, idx: usize) -> Result<&PodRecord, CommandError> {
        self.pods.get(idx).ok_or(CommandError::InvalidPod)
    }

    /// Mutable access for the control tick's write-back.
    pub(crate) fn pod_mut(&mut self, idx: usize) -> Result<&mut PodRecord, CommandError> {
        self.pods.get_mut(idx).ok_or(CommandError::InvalidPod)
    }

    /// The system mode is pod 0's mode.
    pub fn system_mode(&self) -> LiftMode {
        self.pods[0].mode
    }

    // ── Coordinator operations ────────────────────────────────────

    /// Broadcast a system mode: pod 0 takes it, and so does every follower
    /// with `follow_system` set.  Independent followers are untouched.
    /// Returns the set of pods whose mode actually changed.
    pub fn set_system_mode(&mut self, mode: LiftMode) -> Vec<usize, MAX_PODS> {
        let mut changed = Vec::new();
        for (i, pod) in self.pods.iter_mut().enumerate() {
            if pod.follows_system() && pod.mode != mode {
                pod.mode = mode;
                let _ = changed.push(i);
            }
        }
        changed
    }

    /// Set a single pod's mode.  On pod 0 this *is* the system mode, so it
    /// broadcasts.  Never alters follow flags.
    pub fn set_pod_mode(
        &mut self,
        idx: usize,
        mode: LiftMode,
    ) -> Result<Vec<usize, MAX_PODS>, CommandError> {
        if idx == 0 {
            if self.pods.is_empty() {
                return Err(CommandError::InvalidPod);
            }
            return Ok(self.set_system_mode(mode));
        }

        let pod = self.pods.get_mut(idx).ok_or(CommandError::InvalidPod)?;
        let mut changed = Vec::new();
        if pod.mode != mode {
            pod.mode = mode;
            let _ = changed.push(idx);
        }
        Ok(changed)
    }

    /// Explicitly set a follower's follow-system flag.  Enabling it
    /// immediately applies the current system mode to that pod.
    /// Returns `true` if the pod's mode changed as a result.
    pub fn set_follow_system(&mut self, idx: usize, follow: bool) -> Result<bool, CommandError> {
        let system_mode = self.system_mode();
        let pod = self.pods.get_mut(idx).ok_or(CommandError::InvalidPod)?;

        match pod.role {
            PodRole::Coordinator => Err(CommandError::NotAFollower),
            PodRole::Follower { .. } => {
                pod.role = PodRole::Follower {
                    follow_system: follow,
                };
                if follow && pod.mode != system_mode {
                    pod.mode = system_mode;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}
