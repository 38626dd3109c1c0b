//! Sensor subsystem — battery ADC conversion and position-sensor reads.
//!
//! The conversion math lives here as pure functions; the raw samples come
//! through [`InputPort`](crate::app::ports::InputPort) so the domain layer
//! never touches the ADC or GPIO directly.

pub mod battery;
pub mod position;
