//! Hardware adapter — bridges real peripherals to the domain port traits.
//!
//! Owns the position sensors, relay pair, and LED pair, exposing them
//! through [`InputPort`] and [`ActuatorPort`].  This is the only module in
//! the system that touches actual hardware; on non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.
//!
//! One board drives one physical pod (`local_pod`, from
//! [`NodeConfig::pod_number`](crate::config::NodeConfig)).  Reads for any
//! other index return inactive levels and actuation for them is ignored —
//! remote pods are mirrored through the telemetry bridge, not wired here.

use log::debug;

use crate::app::ports::{ActuatorPort, InputPort};
use crate::drivers::hw_init;
use crate::drivers::leds::LiftLeds;
use crate::drivers::relay::LiftRelays;
use crate::fsm::context::RelayCommands;
use crate::input::RawInputs;
use crate::pins;
use crate::sensors::position::PositionSensors;

/// Concrete adapter that combines the board's peripherals behind the
/// port traits.
pub struct HardwareAdapter {
    local_pod: usize,
    position: PositionSensors,
    relays: LiftRelays,
    leds: LiftLeds,
}

impl HardwareAdapter {
    pub fn new(local_pod: usize) -> Self {
        Self {
            local_pod,
            position: PositionSensors::new(),
            relays: LiftRelays::new(pins::UP_RELAY_GPIO, pins::DOWN_RELAY_GPIO),
            leds: LiftLeds::new(pins::UP_LED_GPIO, pins::DOWN_LED_GPIO),
        }
    }

    /// Which pod this board physically drives.
    pub fn local_pod(&self) -> usize {
        self.local_pod
    }
}

// ── InputPort implementation ──────────────────────────────────

impl InputPort for HardwareAdapter {
    fn read_raw(&mut self, pod: usize) -> RawInputs {
        if pod != self.local_pod {
            return RawInputs::default();
        }
        let position = self.position.read();
        RawInputs {
            top_sensor: position.top_wet,
            bot_sensor: position.bot_wet,
            // Buttons are wired active-low with pull-ups.
            up_button: !hw_init::gpio_read(pins::UP_BUTTON_GPIO),
            down_button: !hw_init::gpio_read(pins::DOWN_BUTTON_GPIO),
        }
    }

    fn read_battery_raw(&mut self, pod: usize) -> u16 {
        if pod != self.local_pod {
            return 0;
        }
        hw_init::adc1_read(pins::BATTERY_ADC_CHANNEL)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn apply(&mut self, pod: usize, commands: &RelayCommands) {
        if pod != self.local_pod {
            debug!("pod {pod}: actuation mirrored remotely, not wired here");
            return;
        }
        self.relays.set(commands.up_relay, commands.down_relay);
        self.leds.set(commands.up_led, commands.down_led);
    }

    fn all_off(&mut self) {
        self.relays.all_off();
        self.leds.off();
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::fsm::context::LiftAction;

    #[test]
    fn remote_pods_read_inactive_and_ignore_actuation() {
        let mut hw = HardwareAdapter::new(0);
        assert_eq!(hw.read_raw(1), RawInputs::default());
        assert_eq!(hw.read_battery_raw(1), 0);

        hw.apply(
            1,
            &RelayCommands {
                up_relay: true,
                ..Default::default()
            },
        );
        assert_eq!(hw.relays.engaged(), LiftAction::Stop);
    }

    #[test]
    fn local_actuation_reaches_the_relays() {
        let mut hw = HardwareAdapter::new(0);
        hw.apply(
            0,
            &RelayCommands {
                up_relay: true,
                up_led: true,
                ..Default::default()
            },
        );
        assert_eq!(hw.relays.engaged(), LiftAction::Raise);
        assert_eq!(hw.leds.lit(), (true, false));

        hw.all_off();
        assert_eq!(hw.relays.engaged(), LiftAction::Stop);
        assert_eq!(hw.leds.lit(), (false, false));
    }

    #[test]
    fn local_sensor_reads_follow_the_sim_statics() {
        use crate::sensors::position::{sim_set_bot_wet, sim_set_top_wet};
        let mut hw = HardwareAdapter::new(0);

        sim_set_top_wet(true);
        assert!(hw.read_raw(0).top_sensor);
        sim_set_top_wet(false);
        sim_set_bot_wet(true);
        let raw = hw.read_raw(0);
        assert!(!raw.top_sensor);
        assert!(raw.bot_sensor);
        sim_set_bot_wet(false);
    }
}
