//! Battery voltage and charge-percentage conversion.
//!
//! The pack voltage is brought into ADC range by a resistor divider; the
//! conversion back is a straight linear chain:
//!
//! ```text
//! volts = raw × vref / adc_max × divider × multiplier
//! pct   = clamp((volts − min) / (max − min) × 100, 0, 100)
//! ```
//!
//! Pure functions, no state — recomputed on each telemetry interval,
//! outside the control tick.

use crate::config::BatteryCalibration;

/// One converted battery sample.
#[derive(Debug, Clone, Copy)]
pub struct BatteryReading {
    pub raw: u16,
    pub volts: f32,
    pub percent: u8,
}

/// Pack voltage from a raw ADC count.
pub fn volts_from_raw(raw: u16, cal: &BatteryCalibration) -> f32 {
    f32::from(raw) * cal.adc_ref_volts / f32::from(cal.adc_max.max(1))
        * cal.divider_ratio
        * cal.multiplier
}

/// Charge percentage from a pack voltage, clamped to 0–100.
pub fn percent_from_volts(volts: f32, cal: &BatteryCalibration) -> u8 {
    let span = cal.max_volts - cal.min_volts;
    if span <= 0.0 {
        return 0;
    }
    let pct = (volts - cal.min_volts) / span * 100.0;
    pct.clamp(0.0, 100.0) as u8
}

/// Full conversion of one raw sample.
pub fn convert(raw: u16, cal: &BatteryCalibration) -> BatteryReading {
    let volts = volts_from_raw(raw, cal);
    BatteryReading {
        raw,
        volts,
        percent: percent_from_volts(volts, cal),
    }
}
