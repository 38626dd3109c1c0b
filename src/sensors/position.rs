//! Wet-contact position sensors at the travel extremes.
//!
//! Each pod carries two sensors that output a digital HIGH on contact:
//! one at full-up, one at full-down.  They are wired to GPIOs configured
//! as pull-up inputs; debouncing happens downstream in the input reader.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads real GPIO levels via hw_init helpers.
//! On host/test: reads injectable statics (both dry by default).

use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::pins;

static SIM_TOP_WET: AtomicBool = AtomicBool::new(false);
static SIM_BOT_WET: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_top_wet(wet: bool) {
    SIM_TOP_WET.store(wet, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_bot_wet(wet: bool) {
    SIM_BOT_WET.store(wet, Ordering::Relaxed);
}

/// Raw (undebounced) reading of both travel sensors.
#[derive(Debug, Clone, Copy)]
pub struct PositionReading {
    pub top_wet: bool,
    pub bot_wet: bool,
}

pub struct PositionSensors {
    _top_gpio: i32,
    _bot_gpio: i32,
}

impl PositionSensors {
    pub fn new() -> Self {
        Self {
            _top_gpio: pins::TOP_SENSOR_GPIO,
            _bot_gpio: pins::BOT_SENSOR_GPIO,
        }
    }

    pub fn read(&self) -> PositionReading {
        PositionReading {
            top_wet: self.read_top(),
            bot_wet: self.read_bot(),
        }
    }

    #[cfg(target_os = "espidf")]
    fn read_top(&self) -> bool {
        hw_init::gpio_read(pins::TOP_SENSOR_GPIO)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_top(&self) -> bool {
        SIM_TOP_WET.load(Ordering::Relaxed)
    }

    #[cfg(target_os = "espidf")]
    fn read_bot(&self) -> bool {
        hw_init::gpio_read(pins::BOT_SENSOR_GPIO)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_bot(&self) -> bool {
        SIM_BOT_WET.load(Ordering::Relaxed)
    }
}

impl Default for PositionSensors {
    fn default() -> Self {
        Self::new()
    }
}
