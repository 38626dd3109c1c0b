//! Telemetry cadence scheduler.
//!
//! The hardware pushes one [`TelemetryBaseTick`](crate::events::Event) every
//! ten seconds; this engine derives the slower cadence classes from it by
//! plain tick counting, so the whole schedule is deterministic and testable
//! without a wall clock.
//!
//! ```text
//!  base tick (10s) ──▶ TenSeconds         every tick
//!                      OneMinute          every 6th
//!                      FiveMinutes        every 30th
//!                      OneHour            every 360th
//!                      OneDay             every 8640th
//! ```
//!
//! The main loop hands each due cadence to the telemetry bridge, which
//! decides what to publish (see [`telemetry::entities_due`]).
//!
//! [`telemetry::entities_due`]: crate::telemetry::entities_due

use heapless::Vec;
use log::debug;

use crate::telemetry::UpdateCadence;

const TICKS_PER_MINUTE: u32 = 6;
const TICKS_PER_FIVE_MIN: u32 = 30;
const TICKS_PER_HOUR: u32 = 360;
const TICKS_PER_DAY: u32 = 8_640;

/// Derives due cadence classes from the ten-second base tick.
#[derive(Debug, Default)]
pub struct CadenceScheduler {
    base_ticks: u32,
}

impl CadenceScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one base tick and return every cadence class due now,
    /// fastest first.
    pub fn on_base_tick(&mut self) -> Vec<UpdateCadence, 5> {
        self.base_ticks = self.base_ticks.wrapping_add(1);

        let mut due = Vec::new();
        let _ = due.push(UpdateCadence::TenSeconds);
        if self.base_ticks % TICKS_PER_MINUTE == 0 {
            let _ = due.push(UpdateCadence::OneMinute);
        }
        if self.base_ticks % TICKS_PER_FIVE_MIN == 0 {
            let _ = due.push(UpdateCadence::FiveMinutes);
        }
        if self.base_ticks % TICKS_PER_HOUR == 0 {
            let _ = due.push(UpdateCadence::OneHour);
        }
        if self.base_ticks % TICKS_PER_DAY == 0 {
            let _ = due.push(UpdateCadence::OneDay);
        }

        if due.len() > 1 {
            debug!("telemetry cadences due: {due:?}");
        }
        due
    }

    /// Base ticks seen so far (10s units).
    pub fn base_ticks(&self) -> u32 {
        self.base_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_seconds_fires_every_tick() {
        let mut s = CadenceScheduler::new();
        for _ in 0..20 {
            assert!(s.on_base_tick().contains(&UpdateCadence::TenSeconds));
        }
    }

    #[test]
    fn one_minute_fires_every_sixth_tick() {
        let mut s = CadenceScheduler::new();
        let mut fires = 0;
        for _ in 0..60 {
            if s.on_base_tick().contains(&UpdateCadence::OneMinute) {
                fires += 1;
            }
        }
        assert_eq!(fires, 10);
    }

    #[test]
    fn slow_cadences_align_with_their_periods() {
        let mut s = CadenceScheduler::new();
        let mut five_min = 0;
        let mut hourly = 0;
        let mut daily = 0;
        for _ in 0..TICKS_PER_DAY {
            let due = s.on_base_tick();
            if due.contains(&UpdateCadence::FiveMinutes) {
                five_min += 1;
            }
            if due.contains(&UpdateCadence::OneHour) {
                hourly += 1;
            }
            if due.contains(&UpdateCadence::OneDay) {
                daily += 1;
            }
        }
        assert_eq!(five_min, 288);
        assert_eq!(hourly, 24);
        assert_eq!(daily, 1);
    }

    #[test]
    fn coincident_fires_are_ordered_fastest_first() {
        let mut s = CadenceScheduler::new();
        let mut last = Vec::new();
        for _ in 0..TICKS_PER_HOUR {
            last = s.on_base_tick();
        }
        assert_eq!(
            last.as_slice(),
            &[
                UpdateCadence::TenSeconds,
                UpdateCadence::OneMinute,
                UpdateCadence::FiveMinutes,
                UpdateCadence::OneHour,
            ]
        );
    }
}
