//! System configuration parameters
//!
//! All tunable parameters for the V-Lift pod controller.  Timing and
//! calibration values live here as an explicit struct injected into the
//! coordinator and state machines at construction, so tests can run each
//! instance with varied parameters.  Values can be overridden via NVS.

use serde::{Deserialize, Serialize};

/// Battery ADC calibration — the linear conversion chain from raw counts
/// to pack voltage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatteryCalibration {
    /// Pack voltage corresponding to 100%.
    pub max_volts: f32,
    /// Pack voltage corresponding to 0%.
    pub min_volts: f32,
    /// Resistor divider ratio bringing the pack voltage into ADC range.
    pub divider_ratio: f32,
    /// Trim multiplier for ADC gain error.
    pub multiplier: f32,
    /// ADC reference voltage.
    pub adc_ref_volts: f32,
    /// Full-scale ADC count (4095 for 12-bit).
    pub adc_max: u16,
}

impl Default for BatteryCalibration {
    fn default() -> Self {
        // Two 12 V AGM batteries in series: 24 V full, 23 V empty.
        Self {
            max_volts: 24.0,
            min_volts: 23.0,
            divider_ratio: 12.0,
            multiplier: 1.0,
            adc_ref_volts: 3.3,
            adc_max: 4095,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiftConfig {
    // --- Fleet ---
    /// Number of pods being controlled.
    pub pod_count: usize,

    // --- Travel timing ---
    /// Extra relay-on time after first top-sensor contact, to seat the pod
    /// fully against the upper stop.
    pub up_settle_ms: u32,
    /// Extra relay-on time after first bottom-sensor contact.  Shorter than
    /// the up dwell — over-travel risk differs by direction.
    pub down_settle_ms: u32,
    /// Fail-safe: a commanded travel with no terminating sensor transition
    /// inside this window forces Stop and latches a stall fault.
    pub max_travel_ms: u32,

    // --- Input ---
    /// Hold duration that turns a button press into a long press.
    pub long_press_ms: u32,

    // --- Timing ---
    /// Control loop interval (milliseconds).  Sensor and button lines are
    /// debounced over four consecutive ticks at this rate.
    pub control_loop_interval_ms: u32,

    // --- Battery ---
    pub battery: BatteryCalibration,
}

impl Default for LiftConfig {
    fn default() -> Self {
        Self {
            pod_count: 2,

            up_settle_ms: 8_000,
            down_settle_ms: 3_000,
            max_travel_ms: 60_000,

            long_press_ms: 3_000,

            control_loop_interval_ms: 50, // 20 Hz

            battery: BatteryCalibration::default(),
        }
    }
}

/// Node identity and connectivity settings, persisted in NVS and loaded
/// once at startup.  The WiFi/MQTT client that consumes the credentials
/// lives outside the control core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub mqtt_server: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    /// XIAO ESP32-C6: route RF to the external antenna connector.
    pub ext_antenna: bool,
    /// Which pod this board is — pod 0 is the fleet coordinator.
    pub pod_number: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::MAX_PODS;

    #[test]
    fn default_config_is_sane() {
        let c = LiftConfig::default();
        assert!(c.pod_count >= 1 && c.pod_count <= MAX_PODS);
        assert!(c.up_settle_ms > 0);
        assert!(c.down_settle_ms > 0);
        assert!(c.max_travel_ms > c.up_settle_ms);
        assert!(c.long_press_ms > 0);
        assert!(c.control_loop_interval_ms > 0);
        assert!(c.battery.max_volts > c.battery.min_volts);
        assert!(c.battery.divider_ratio > 0.0);
        assert!(c.battery.adc_max > 0);
    }

    #[test]
    fn up_dwell_longer_than_down_dwell() {
        let c = LiftConfig::default();
        assert!(
            c.up_settle_ms > c.down_settle_ms,
            "seating against gravity needs the longer dwell"
        );
    }

    #[test]
    fn serde_roundtrip() {
        let c = LiftConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: LiftConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c.pod_count, c2.pod_count);
        assert_eq!(c.up_settle_ms, c2.up_settle_ms);
        assert!((c.battery.max_volts - c2.battery.max_volts).abs() < 0.001);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = LiftConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: LiftConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.down_settle_ms, c2.down_settle_ms);
        assert!((c.battery.divider_ratio - c2.battery.divider_ratio).abs() < 0.001);
    }

    #[test]
    fn node_config_postcard_roundtrip() {
        let n = NodeConfig {
            wifi_ssid: "lift-net".into(),
            mqtt_server: "192.168.237.2".into(),
            mqtt_port: 1883,
            pod_number: 1,
            ..Default::default()
        };
        let bytes = postcard::to_allocvec(&n).unwrap();
        let n2: NodeConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(n.wifi_ssid, n2.wifi_ssid);
        assert_eq!(n.mqtt_port, n2.mqtt_port);
        assert_eq!(n.pod_number, n2.pod_number);
    }
}
