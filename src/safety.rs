//! Per-pod lift supervisor.
//!
//! The supervisor runs **every tick before the state machine** and
//! accumulates a fault bitmask in `LiftContext.fault_flags`.  The state
//! handlers check this mask to decide whether to drop into `Faulted`.
//!
//! ## Fault lifecycle
//!
//! 1. A condition triggers a fault (e.g. both sensors wet).
//! 2. The supervisor sets the corresponding bit.
//! 3. The state machine transitions to `Faulted`; relays are released.
//! 4. Each tick, the supervisor re-evaluates.  Sensor conflicts clear
//!    themselves when the readings disagree again; a travel stall stays
//!    latched until the next mode command (so a jammed pod does not retry
//!    on its own).
//! 5. When the mask reaches zero the state machine resumes in `Stopped`.
//!
//! Multiple simultaneous faults are tracked individually; the pod does not
//! leave `Faulted` until *every* fault is resolved.

use crate::config::LiftConfig;
use crate::error::LiftFault;
use crate::fsm::context::{LiftAction, SensorState};
use log::{error, info};

/// Lift supervisor for a single pod.
pub struct LiftSupervisor {
    /// Latched fault bitmask.
    faults: u8,
    /// Ticks a travel may run before it is declared stalled.
    max_travel_ticks: u32,
    /// Consecutive ticks the pod has been travelling.
    travel_ticks: u32,
    /// A stall stays latched until the next mode command.
    stall_latched: bool,
    tick_period_ms: u32,
}

impl LiftSupervisor {
    pub fn new(config: &LiftConfig) -> Self {
        Self {
            faults: 0,
            max_travel_ticks: config.max_travel_ms / config.control_loop_interval_ms.max(1),
            travel_ticks: 0,
            stall_latched: false,
            tick_period_ms: config.control_loop_interval_ms,
        }
    }

    /// Re-derive timing limits after a runtime config update.
    pub fn reconfigure(&mut self, config: &LiftConfig) {
        self.max_travel_ticks = config.max_travel_ms / config.control_loop_interval_ms.max(1);
        self.tick_period_ms = config.control_loop_interval_ms;
    }

    /// A new mode command arrived for this pod: unlatch any stall so the
    /// operator can retry, and restart the travel clock.
    pub fn note_mode_change(&mut self) {
        self.travel_ticks = 0;
        if self.stall_latched {
            self.stall_latched = false;
            self.clear_fault(LiftFault::TravelStall);
        }
    }

    /// Evaluate all fault conditions for this tick.
    /// `action` is what the state machine did last tick.
    /// Returns the updated fault bitmask.
    pub fn evaluate(&mut self, sensors: &SensorState, action: LiftAction) -> u8 {
        // ── Sensor consistency ────────────────────────────────────
        self.eval_fault(
            LiftFault::SensorConflict,
            sensors.top_wet && sensors.bot_wet,
        );

        // ── Travel stall (bounds the whole stroke) ────────────────
        if action == LiftAction::Stop {
            self.travel_ticks = 0;
        } else {
            self.travel_ticks = self.travel_ticks.saturating_add(1);
            if self.travel_ticks > self.max_travel_ticks && !self.stall_latched {
                error!(
                    "travel exceeded {}ms with no terminating sensor contact",
                    self.max_travel_ticks * self.tick_period_ms
                );
                self.stall_latched = true;
            }
        }
        self.eval_fault(LiftFault::TravelStall, self.stall_latched);

        self.faults
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: LiftFault) -> bool {
        self.faults & fault.mask() != 0
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Set or clear a fault bit based on a boolean condition.
    fn eval_fault(&mut self, fault: LiftFault, condition: bool) {
        if condition {
            if self.faults & fault.mask() == 0 {
                error!("FAULT SET: {fault}");
            }
            self.faults |= fault.mask();
        } else {
            if self.faults & fault.mask() != 0 {
                info!("FAULT CLEARED: {fault}");
            }
            self.faults &= !fault.mask();
        }
    }

    /// Unconditionally clear a fault bit.
    fn clear_fault(&mut self, fault: LiftFault) {
        self.faults &= !fault.mask();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn supervisor() -> LiftSupervisor {
        LiftSupervisor::new(&LiftConfig::default())
    }

    fn wet(top: bool, bot: bool) -> SensorState {
        SensorState {
            top_wet: top,
            bot_wet: bot,
        }
    }

    #[test]
    fn clean_sensors_no_faults() {
        let mut s = supervisor();
        assert_eq!(s.evaluate(&wet(false, false), LiftAction::Stop), 0);
        assert_eq!(s.evaluate(&wet(true, false), LiftAction::Stop), 0);
        assert_eq!(s.evaluate(&wet(false, true), LiftAction::Stop), 0);
    }

    #[test]
    fn both_wet_sets_and_clears_conflict() {
        let mut s = supervisor();
        let f = s.evaluate(&wet(true, true), LiftAction::Stop);
        assert_ne!(f & LiftFault::SensorConflict.mask(), 0);
        assert!(s.has_fault(LiftFault::SensorConflict));

        let f = s.evaluate(&wet(true, false), LiftAction::Stop);
        assert_eq!(f, 0);
    }

    #[test]
    fn stall_fires_after_max_travel() {
        let cfg = LiftConfig::default();
        let mut s = LiftSupervisor::new(&cfg);
        let ticks = cfg.max_travel_ms / cfg.control_loop_interval_ms;

        for _ in 0..ticks {
            assert_eq!(s.evaluate(&wet(false, false), LiftAction::Raise), 0);
        }
        let f = s.evaluate(&wet(false, false), LiftAction::Raise);
        assert_ne!(f & LiftFault::TravelStall.mask(), 0);
    }

    #[test]
    fn stall_stays_latched_until_mode_change() {
        let cfg = LiftConfig::default();
        let mut s = LiftSupervisor::new(&cfg);
        let ticks = cfg.max_travel_ms / cfg.control_loop_interval_ms + 1;
        for _ in 0..ticks {
            s.evaluate(&wet(false, false), LiftAction::Raise);
        }
        assert!(s.has_fault(LiftFault::TravelStall));

        // Relay released, pod idle — still latched.
        for _ in 0..100 {
            s.evaluate(&wet(false, false), LiftAction::Stop);
        }
        assert!(s.has_fault(LiftFault::TravelStall));

        s.note_mode_change();
        assert_eq!(s.evaluate(&wet(false, false), LiftAction::Stop), 0);
    }

    #[test]
    fn completed_travel_resets_the_clock() {
        let cfg = LiftConfig::default();
        let mut s = LiftSupervisor::new(&cfg);
        let half = cfg.max_travel_ms / cfg.control_loop_interval_ms / 2;

        for _ in 0..half {
            s.evaluate(&wet(false, false), LiftAction::Raise);
        }
        // Travel finished; pod rests.
        s.evaluate(&wet(true, false), LiftAction::Stop);

        // A fresh travel gets the full window again.
        for _ in 0..half + 2 {
            assert_eq!(s.evaluate(&wet(false, false), LiftAction::Lower), 0);
        }
    }
}
