//! Configuration types
//!
//! Read-only inputs to the pulse core. These are set up by the
//! configuration subsystem before motion starts and never change while a
//! segment is in flight.

pub mod motor;

pub use motor::{MotorConfig, Polarity, PowerMode};
