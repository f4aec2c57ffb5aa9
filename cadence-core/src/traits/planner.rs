//! Planner callback trait
//!
//! The pulse core never computes motion; it asks the planner for the next
//! segment from the exec interrupt and the planner answers by staging one.

use crate::stepper::Stage;

/// Outcome of one planner callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExecStatus {
    /// A segment was staged (`prep_line`, `prep_dwell` or `prep_null` was
    /// called); ownership of the stage passes to the loader
    Planned,
    /// Nothing to plan; the stage stays with the executor
    Noop,
}

/// Source of motion segments
///
/// Implemented by the motion planner. `exec_move` runs in the exec
/// software interrupt (the lowest priority level of the pipeline) and must
/// call exactly one of the staging operations on `stage` before returning
/// [`ExecStatus::Planned`], or none of them and return
/// [`ExecStatus::Noop`].
pub trait MovePlanner<const M: usize> {
    /// Produce the next segment, if any
    fn exec_move(&mut self, stage: &mut Stage<M>) -> ExecStatus;
}
