//! Core abstraction traits
//!
//! These traits define the interface between the pulse core and the
//! layers around it. Hardware capabilities live in `cadence-hal`; this
//! module holds the traits the core consumes from the layers above it,
//! currently the planner callback.

pub mod planner;

pub use planner::{ExecStatus, MovePlanner};
