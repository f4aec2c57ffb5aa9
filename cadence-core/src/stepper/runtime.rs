//! DDA runtime state
//!
//! The run-time half of the double-buffered pipeline. Everything here is
//! owned by the highest interrupt priority: the DDA handler mutates it on
//! every tick, the loader rewrites it only while the DDA timer is stopped.

use super::MAGIC;

/// Runtime state for one motor
#[derive(Debug, Clone, Copy)]
pub struct RuntimeMotor {
    /// Total steps for the segment times the substep factor
    pub(crate) phase_increment: i32,
    /// DDA phase angle accumulator; a crossing above zero emits a pulse
    pub(crate) phase_accumulator: i32,
    /// Pulses emitted since init (diagnostic)
    pub(crate) step_count_diagnostic: u32,
}

/// Run-time singleton owned by the step generation handler
#[derive(Debug)]
pub struct Runtime<const M: usize> {
    pub(crate) magic_start: u16,
    /// Remaining ticks in the current segment; zero means idle
    pub(crate) timer_ticks_downcount: i32,
    /// Accumulator threshold for the loaded segment (ticks times the
    /// substep factor)
    pub(crate) timer_ticks_x_substeps: i32,
    pub(crate) m: [RuntimeMotor; M],
}

impl<const M: usize> Runtime<M> {
    pub(crate) fn new() -> Self {
        Self {
            magic_start: MAGIC,
            timer_ticks_downcount: 0,
            timer_ticks_x_substeps: 0,
            m: [RuntimeMotor {
                phase_increment: 0,
                phase_accumulator: 0,
                step_count_diagnostic: 0,
            }; M],
        }
    }

    /// Zero every motor's increment so the DDA idles all axes without
    /// branching
    pub(crate) fn clear_increments(&mut self) {
        for motor in self.m.iter_mut() {
            motor.phase_increment = 0;
        }
    }
}
