//! GPIO / peripheral pin assignments for the V-Lift pod board (XIAO ESP32-C6).
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! ```text
//!         vBatt in - A0 - 0      13 - 5V
//!    Top sensor in - D1 - 1      12 - GND
//! Bottom sensor in - D2 - 2      11 - 3.3V
//!           Up LED - D3 - 3      10 - D10 - Up button
//!          I2C SDA -    - 4       9 - D9  - Down button
//!          I2C SCL -    - 5       8 - D8  - Up relay
//!         Down LED - D6 - 6       7 - D7  - Down relay
//! ```

// ---------------------------------------------------------------------------
// Battery monitoring (ADC1)
// ---------------------------------------------------------------------------

/// Battery voltage through the resistor divider — A0 / ADC1 channel 0.
pub const BATTERY_ADC_GPIO: i32 = 0;
/// ADC1 channel number for the battery pin.
pub const BATTERY_ADC_CHANNEL: u32 = 0;

// ---------------------------------------------------------------------------
// Position sensors (wet-contact, digital HIGH on contact)
// ---------------------------------------------------------------------------

/// Top-of-travel contact sensor.
pub const TOP_SENSOR_GPIO: i32 = 1;
/// Bottom-of-travel contact sensor.
pub const BOT_SENSOR_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Relays (active HIGH, drive the lift motor up / down)
// ---------------------------------------------------------------------------

/// Raise relay coil.
pub const UP_RELAY_GPIO: i32 = 8;
/// Lower relay coil.
pub const DOWN_RELAY_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// Indicator LEDs
// ---------------------------------------------------------------------------

/// Lit while the pod is raising.
pub const UP_LED_GPIO: i32 = 3;
/// Lit while the pod is lowering.
pub const DOWN_LED_GPIO: i32 = 6;

// ---------------------------------------------------------------------------
// User buttons (active-low momentary switches with pull-ups)
// ---------------------------------------------------------------------------

pub const UP_BUTTON_GPIO: i32 = 10;
pub const DOWN_BUTTON_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// I²C bus (OLED status display, handled outside the control core)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 4;
pub const I2C_SCL_GPIO: i32 = 5;
