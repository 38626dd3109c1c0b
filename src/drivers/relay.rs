//! Lift motor relay pair driver.
//!
//! Two relays drive the pod motor: one for raise, one for lower.  The pair
//! must never be energised together (that shorts the motor supply), so the
//! driver switches break-before-make and refuses a conflicting request.
//!
//! ## Safety contract
//!
//! Travel bounds (sensor contact, settle dwells, stall timeout) are
//! enforced by the state machine and supervisor; this driver is a dumb
//! actuator.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real GPIO via hw_init helpers.
//! On host/test: tracks state in-memory only.

use log::error;

use crate::drivers::hw_init;
use crate::fsm::context::LiftAction;

pub struct LiftRelays {
    up_gpio: i32,
    down_gpio: i32,
    engaged: LiftAction,
}

impl LiftRelays {
    pub fn new(up_gpio: i32, down_gpio: i32) -> Self {
        Self {
            up_gpio,
            down_gpio,
            engaged: LiftAction::Stop,
        }
    }

    /// Drive the relay pair from the requested levels.  A request with
    /// both coils on is rejected and forces Stop instead.
    pub fn set(&mut self, up: bool, down: bool) {
        if up && down {
            error!("relay conflict requested; forcing stop");
            self.apply(LiftAction::Stop);
            return;
        }
        let action = match (up, down) {
            (true, _) => LiftAction::Raise,
            (_, true) => LiftAction::Lower,
            _ => LiftAction::Stop,
        };
        self.apply(action);
    }

    /// Engage the relay for `action`, break-before-make.  No-op when the
    /// requested action is already engaged, so repeated commands produce
    /// no coil chatter.
    pub fn apply(&mut self, action: LiftAction) {
        if action == self.engaged {
            return;
        }
        match action {
            LiftAction::Stop => {
                hw_init::gpio_write(self.up_gpio, false);
                hw_init::gpio_write(self.down_gpio, false);
            }
            LiftAction::Raise => {
                hw_init::gpio_write(self.down_gpio, false);
                hw_init::gpio_write(self.up_gpio, true);
            }
            LiftAction::Lower => {
                hw_init::gpio_write(self.up_gpio, false);
                hw_init::gpio_write(self.down_gpio, true);
            }
        }
        self.engaged = action;
    }

    /// Release both coils.
    pub fn all_off(&mut self) {
        self.apply(LiftAction::Stop);
    }

    /// Which action is currently engaged.
    pub fn engaged(&self) -> LiftAction {
        self.engaged
    }

    pub fn is_moving(&self) -> bool {
        self.engaged != LiftAction::Stop
    }
}
