//! Per-motor configuration
//!
//! One [`MotorConfig`] per motor slot. Polarity is consumed by segment
//! preparation (it flips the staged direction bit); the power mode is
//! consumed by the pulse generator at end-of-segment.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Direction-signal polarity for one motor
///
/// `Reversed` swaps the meaning of the direction line so that wiring or
/// mechanics can invert an axis without touching the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Polarity {
    #[default]
    Normal,
    Reversed,
}

/// Holding-current policy for one motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PowerMode {
    /// Keep the driver energized between segments
    #[default]
    AlwaysOn,
    /// Drop the enable line whenever the motor has no segment running
    IdleWhenStopped,
}

/// Per-motor configuration
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotorConfig {
    /// Direction-signal polarity
    pub polarity: Polarity,
    /// Holding-current policy
    pub power_mode: PowerMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let cfg = MotorConfig::default();
        assert_eq!(cfg.polarity, Polarity::Normal);
        assert_eq!(cfg.power_mode, PowerMode::AlwaysOn);
    }
}
