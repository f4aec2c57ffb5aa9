//! Segment staging buffer
//!
//! The stage is the prep-time half of the double-buffered pipeline: the
//! executor fills it with the next segment's integer parameters, the
//! loader copies it into the runtime. A single ownership word
//! ([`StageOwner`]) arbitrates between the two sides; see the module
//! documentation on [`crate::stepper`] for the priority rules that make
//! this sufficient.

use crate::config::Polarity;

use super::{COUNTER_RESET_FACTOR, DDA_SUBSTEPS, EPSILON, FREQUENCY_DDA, FREQUENCY_DWELL, MAGIC};

/// Which side of the pipeline may touch the stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StageOwner {
    /// The executor is filling the stage
    Exec,
    /// The stage is ready for the loader
    Loader,
}

/// Kind of move currently staged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MoveType {
    /// Nothing to do at load time (boot state, M-code placeholders)
    #[default]
    Null,
    /// An accelerated-line segment
    Line,
    /// A timed pause with no step output
    Dwell,
}

/// Step direction for one motor, after polarity correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// Errors returned by [`Stage::prep_line`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrepError {
    /// The stage was not owned by the executor; pipeline protocol was
    /// violated and the caller must not retry until it regains ownership
    InternalError,
    /// The requested duration was non-finite or below the resolvable
    /// minimum; the segment should be discarded
    ZeroLengthMove,
}

/// Staged per-motor parameters
#[derive(Debug, Clone, Copy)]
pub struct StageMotor {
    /// Steps times the substep factor for this segment
    pub(crate) phase_increment: u32,
    /// Direction line state, polarity already applied
    pub(crate) dir: Direction,
}

/// Prep-time singleton written by the executor chain, read by the loader
#[derive(Debug)]
pub struct Stage<const M: usize> {
    pub(crate) magic_start: u16,
    pub(crate) move_type: MoveType,
    pub(crate) exec_state: StageOwner,
    /// Set when the velocity step from the previous segment is large
    /// enough that the stale accumulators must be reseeded at load
    pub(crate) counter_reset_flag: bool,
    /// Tick count of the previous segment, for the velocity-jump test
    pub(crate) prev_ticks: u32,
    /// DDA or dwell ticks for the staged move
    pub(crate) timer_ticks: u32,
    /// DDA ticks scaled by the substep factor
    pub(crate) timer_ticks_x_substeps: u32,
    pub(crate) m: [StageMotor; M],
    /// Read-only per-motor direction polarity, copied in at init
    polarity: [Polarity; M],
}

impl<const M: usize> Stage<M> {
    pub(crate) fn new(polarity: [Polarity; M]) -> Self {
        Self {
            magic_start: MAGIC,
            move_type: MoveType::Null,
            exec_state: StageOwner::Exec,
            counter_reset_flag: false,
            prev_ticks: 0,
            timer_ticks: 0,
            timer_ticks_x_substeps: 0,
            m: [StageMotor {
                phase_increment: 0,
                dir: Direction::Forward,
            }; M],
            polarity,
        }
    }

    /// Prepare an accelerated-line segment for the loader
    ///
    /// Does the float-to-integer math on the next pulse segment so the
    /// load itself is a plain copy. Works in joint space (motors) and in
    /// steps, not length units.
    ///
    /// # Arguments
    /// - `steps`: signed relative motion per motor, fractional values
    ///   allowed
    /// - `microseconds`: how long the segment should run
    pub fn prep_line(&mut self, steps: [f32; M], microseconds: f32) -> Result<(), PrepError> {
        // Trap conditions that would prevent queuing the line.
        if self.exec_state != StageOwner::Exec {
            return Err(PrepError::InternalError);
        }
        if !microseconds.is_finite() || microseconds < EPSILON {
            return Err(PrepError::ZeroLengthMove);
        }
        self.counter_reset_flag = false;

        for i in 0..M {
            let reversed = steps[i].is_sign_negative() ^ (self.polarity[i] == Polarity::Reversed);
            self.m[i].dir = if reversed {
                Direction::Reverse
            } else {
                Direction::Forward
            };
            self.m[i].phase_increment =
                round_to_u32(micromath::F32Ext::abs(steps[i]) * DDA_SUBSTEPS as f32);
        }
        self.timer_ticks = round_to_u32((microseconds / 1_000_000.0) * FREQUENCY_DDA as f32);
        // Integer multiply of the already-rounded tick count; scaling the
        // float through the substep factor accumulates position error.
        self.timer_ticks_x_substeps = self.timer_ticks.saturating_mul(DDA_SUBSTEPS);

        // Anti-stall measure in case the change in velocity between
        // segments is too great.
        if self.timer_ticks.saturating_mul(COUNTER_RESET_FACTOR) < self.prev_ticks {
            self.counter_reset_flag = true;
        }
        self.prev_ticks = self.timer_ticks;
        self.move_type = MoveType::Line;
        Ok(())
    }

    /// Stage a timed pause with no step output
    pub fn prep_dwell(&mut self, microseconds: f32) {
        self.move_type = MoveType::Dwell;
        self.timer_ticks = round_to_u32((microseconds / 1_000_000.0) * FREQUENCY_DWELL as f32);
    }

    /// Stage a well-typed no-op so the loader always has something to
    /// consume
    ///
    /// Used for M-codes, tool and spindle changes.
    pub fn prep_null(&mut self) {
        self.move_type = MoveType::Null;
    }

    /// Current owner of the stage
    pub fn owner(&self) -> StageOwner {
        self.exec_state
    }
}

/// Round a non-negative float to the nearest integer tick count
fn round_to_u32(value: f32) -> u32 {
    micromath::F32Ext::round(value) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: usize = 6;

    fn stage() -> Stage<M> {
        Stage::new([Polarity::Normal; M])
    }

    #[test]
    fn line_is_staged_in_integer_form() {
        let mut sp = stage();
        sp.prep_line([100.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1000.0).unwrap();

        assert_eq!(sp.move_type, MoveType::Line);
        assert_eq!(sp.timer_ticks, 200);
        assert_eq!(sp.timer_ticks_x_substeps, 2000);
        assert_eq!(sp.m[0].phase_increment, 1000);
        assert_eq!(sp.m[0].dir, Direction::Forward);
        for i in 1..M {
            assert_eq!(sp.m[i].phase_increment, 0);
        }
    }

    #[test]
    fn fractional_steps_round_to_nearest_substep() {
        let mut sp = stage();
        sp.prep_line([1.26, 0.0, 0.0, 0.0, 0.0, 0.0], 1000.0).unwrap();
        assert_eq!(sp.m[0].phase_increment, 13);
    }

    #[test]
    fn negative_steps_reverse_direction() {
        let mut sp = stage();
        sp.prep_line([-50.0, 25.0, 0.0, 0.0, 0.0, 0.0], 500.0).unwrap();
        assert_eq!(sp.m[0].dir, Direction::Reverse);
        assert_eq!(sp.m[0].phase_increment, 500);
        assert_eq!(sp.m[1].dir, Direction::Forward);
    }

    #[test]
    fn polarity_flips_the_direction_bit() {
        let mut polarity = [Polarity::Normal; M];
        polarity[0] = Polarity::Reversed;
        polarity[1] = Polarity::Reversed;
        let mut sp = Stage::new(polarity);

        sp.prep_line([10.0, -10.0, 10.0, 0.0, 0.0, 0.0], 1000.0).unwrap();
        assert_eq!(sp.m[0].dir, Direction::Reverse);
        assert_eq!(sp.m[1].dir, Direction::Forward);
        assert_eq!(sp.m[2].dir, Direction::Forward);
    }

    #[test]
    fn zero_length_moves_are_rejected() {
        let mut sp = stage();
        let steps = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];

        assert_eq!(sp.prep_line(steps, 0.0), Err(PrepError::ZeroLengthMove));
        assert_eq!(sp.prep_line(steps, EPSILON / 2.0), Err(PrepError::ZeroLengthMove));
        assert_eq!(sp.prep_line(steps, f32::NAN), Err(PrepError::ZeroLengthMove));
        assert_eq!(sp.prep_line(steps, f32::INFINITY), Err(PrepError::ZeroLengthMove));

        // The stage must be untouched by a rejected segment.
        assert_eq!(sp.move_type, MoveType::Null);
        assert_eq!(sp.timer_ticks, 0);
        assert_eq!(sp.m[0].phase_increment, 0);
    }

    #[test]
    fn prep_requires_exec_ownership() {
        let mut sp = stage();
        sp.exec_state = StageOwner::Loader;

        let err = sp.prep_line([1.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1000.0);
        assert_eq!(err, Err(PrepError::InternalError));
        assert_eq!(sp.move_type, MoveType::Null);
        assert_eq!(sp.m[0].phase_increment, 0);
    }

    #[test]
    fn velocity_jump_sets_counter_reset() {
        let mut sp = stage();
        sp.prep_line([10.0, 0.0, 0.0, 0.0, 0.0, 0.0], 10_000.0).unwrap();
        assert!(!sp.counter_reset_flag);
        assert_eq!(sp.prev_ticks, 2000);

        // Ten times faster than the previous segment.
        sp.prep_line([10.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1000.0).unwrap();
        assert!(sp.counter_reset_flag);
        assert_eq!(sp.prev_ticks, 200);
    }

    #[test]
    fn modest_speedup_keeps_accumulators() {
        let mut sp = stage();
        sp.prep_line([10.0, 0.0, 0.0, 0.0, 0.0, 0.0], 2000.0).unwrap();
        // Half the duration: below the reset threshold.
        sp.prep_line([10.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1000.0).unwrap();
        assert!(!sp.counter_reset_flag);
    }

    #[test]
    fn slowdown_never_resets() {
        let mut sp = stage();
        sp.prep_line([10.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1000.0).unwrap();
        sp.prep_line([10.0, 0.0, 0.0, 0.0, 0.0, 0.0], 10_000.0).unwrap();
        assert!(!sp.counter_reset_flag);
    }

    #[test]
    fn dwell_uses_the_dwell_timebase() {
        let mut sp = stage();
        sp.prep_dwell(5000.0);
        assert_eq!(sp.move_type, MoveType::Dwell);
        assert_eq!(sp.timer_ticks, 5);
    }

    #[test]
    fn null_is_just_a_type_change() {
        let mut sp = stage();
        sp.prep_line([10.0, 0.0, 0.0, 0.0, 0.0, 0.0], 1000.0).unwrap();
        sp.prep_null();
        assert_eq!(sp.move_type, MoveType::Null);
        // Parameters from the previous line are stale but harmless; the
        // loader ignores everything but the type for a null move.
        assert_eq!(sp.timer_ticks, 200);
    }
}
