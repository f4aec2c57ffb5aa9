//! Board-agnostic stepper pulse generation core
//!
//! This crate contains the motion-core logic that does not depend on
//! specific hardware implementations:
//!
//! - The DDA step-pulse generator and its runtime state
//! - The exec/load segment pipeline and its staging buffer
//! - Segment preparation (`prep_line` / `prep_dwell` / `prep_null`)
//! - The planner callback trait
//! - Per-motor configuration type definitions
//!
//! Hardware is reached exclusively through the `cadence-hal` capability
//! traits; the chip layer dispatches the interrupt bodies defined here at
//! the priorities documented on the [`stepper`] module.

#![no_std]
#![deny(unsafe_code)]

pub mod config;
pub mod stepper;
pub mod traits;
