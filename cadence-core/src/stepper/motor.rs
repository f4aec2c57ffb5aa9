//! Motor pin bundles
//!
//! A motor is a set of six output capabilities. Boards with fewer than
//! the full motor count leave the step slot as a null capability (see
//! `cadence_hal::gpio`); the scanner skips such motors entirely.

use cadence_hal::OutputPin;

use crate::config::PowerMode;

/// The output pins backing one motor slot
///
/// `ms0`/`ms1` select the driver's microstep mode and `vref` trims its
/// current reference; they are carried here so a board can wire them, but
/// the core does not drive them yet.
#[derive(Debug)]
pub struct MotorPins<P: OutputPin> {
    /// Step line, active high; may be a null capability
    pub step: P,
    /// Direction line
    pub dir: P,
    /// Driver enable line, active low
    pub enable: P,
    /// Microstep mode select 0
    pub ms0: P,
    /// Microstep mode select 1
    pub ms1: P,
    /// Current reference
    pub vref: P,
}

/// One motor slot: pins plus the configuration the pulse generator needs
/// at interrupt time
#[derive(Debug)]
pub struct Motor<P: OutputPin> {
    pub(crate) pins: MotorPins<P>,
    pub(crate) power_mode: PowerMode,
}

impl<P: OutputPin> Motor<P> {
    pub(crate) fn new(pins: MotorPins<P>, power_mode: PowerMode) -> Self {
        Self { pins, power_mode }
    }
}
