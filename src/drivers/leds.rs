//! Direction indicator LED pair driver.
//!
//! Two discrete LEDs on the pod enclosure: the up LED is lit while the
//! pod raises, the down LED while it lowers.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real GPIO via hw_init helpers.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;

pub struct LiftLeds {
    up_gpio: i32,
    down_gpio: i32,
    lit: (bool, bool),
}

impl LiftLeds {
    pub fn new(up_gpio: i32, down_gpio: i32) -> Self {
        Self {
            up_gpio,
            down_gpio,
            lit: (false, false),
        }
    }

    pub fn set(&mut self, up: bool, down: bool) {
        if self.lit == (up, down) {
            return;
        }
        hw_init::gpio_write(self.up_gpio, up);
        hw_init::gpio_write(self.down_gpio, down);
        self.lit = (up, down);
    }

    pub fn off(&mut self) {
        self.set(false, false);
    }

    pub fn lit(&self) -> (bool, bool) {
        self.lit
    }
}
