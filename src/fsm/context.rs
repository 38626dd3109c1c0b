//! Shared mutable context threaded through every state handler.
//!
//! `LiftContext` is the single struct a pod's state handlers read from and
//! write to: the latest debounced sensors, the desired mode, relay/LED
//! command outputs, derived position, configuration, timing, and
//! accumulated faults.  Think of it as the "blackboard" in a blackboard
//! architecture — one per pod.

use serde::{Deserialize, Serialize};

use crate::config::LiftConfig;

// ---------------------------------------------------------------------------
// Lift vocabulary
// ---------------------------------------------------------------------------

/// Where the pod should be.  Written by the fleet coordinator (or the
/// telemetry layer through it) — never by the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiftMode {
    Up,
    Down,
    #[default]
    Off,
}

/// What the pod is doing right now.  Written only by the state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiftAction {
    #[default]
    Stop,
    Raise,
    Lower,
}

/// Where the pod is.  The end positions are sensor-confirmed; the
/// intermediate ones are time-based estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiftPosition {
    Up,
    AlmostUp,
    #[default]
    Middle,
    AlmostDown,
    Down,
}

// ---------------------------------------------------------------------------
// Sensor truth (read-only to state handlers; written by the input reader)
// ---------------------------------------------------------------------------

/// Debounced position-sensor state for one pod.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorState {
    pub top_wet: bool,
    pub bot_wet: bool,
}

// ---------------------------------------------------------------------------
// Actuator commands (written by state handlers; consumed by the adapter)
// ---------------------------------------------------------------------------

/// Relay and LED levels requested by the state handlers.  The service
/// applies these to the hardware only when they change, so a steady state
/// produces no output edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayCommands {
    pub up_relay: bool,
    pub down_relay: bool,
    pub up_led: bool,
    pub down_led: bool,
}

impl RelayCommands {
    /// Everything released — safe default.
    pub fn all_off() -> Self {
        Self::default()
    }

    fn set(up: bool, down: bool) -> Self {
        Self {
            up_relay: up,
            down_relay: down,
            up_led: up,
            down_led: down,
        }
    }

    /// Relay pair for raising (LEDs mirror the relays).
    pub fn raising() -> Self {
        Self::set(true, false)
    }

    /// Relay pair for lowering.
    pub fn lowering() -> Self {
        Self::set(false, true)
    }
}

// ---------------------------------------------------------------------------
// LiftContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct LiftContext {
    // -- Timing --
    /// Ticks elapsed since the current state was entered.
    pub ticks_in_state: u64,
    /// Monotonic total tick count.
    pub total_ticks: u64,
    /// Duration of one tick in milliseconds.
    pub tick_period_ms: u32,

    // -- Inputs --
    /// Desired end state for this pod.  Updated before each tick.
    pub mode: LiftMode,
    /// Latest debounced sensor readings.  Updated before each tick.
    pub sensors: SensorState,

    // -- Outputs --
    /// Relay/LED commands to be applied after the tick.
    pub commands: RelayCommands,
    /// Derived physical position estimate.
    pub position: LiftPosition,

    // -- Configuration --
    pub config: LiftConfig,

    // -- Faults --
    /// Accumulated fault bitmask (see `LiftFault::mask()`).  Set by the
    /// lift supervisor, read by state handlers.
    pub fault_flags: u8,
}

impl LiftContext {
    /// Create a new context with the given configuration.
    pub fn new(config: LiftConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            tick_period_ms: config.control_loop_interval_ms,
            mode: LiftMode::Off,
            sensors: SensorState::default(),
            commands: RelayCommands::all_off(),
            position: LiftPosition::Middle,
            config,
            fault_flags: 0,
        }
    }

    /// Milliseconds elapsed since the current state was entered.
    pub fn ms_in_state(&self) -> u64 {
        self.ticks_in_state * u64::from(self.tick_period_ms)
    }

    /// Returns `true` if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.fault_flags != 0
    }

    /// Check whether a specific fault flag is set.
    pub fn has_fault(&self, fault: crate::error::LiftFault) -> bool {
        self.fault_flags & fault.mask() != 0
    }
}
