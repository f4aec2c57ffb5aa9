//! Cadence Hardware Abstraction Layer
//!
//! This crate defines the hardware capability traits consumed by the
//! portable motion core (`cadence-core`). Chip-specific HALs implement
//! them on top of their GPIO and timer peripherals.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application / board firmware           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  cadence-core (pulse generation)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  cadence-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  chip HAL (pins, timer channels)        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Digital output capability, possibly unwired
//! - [`timer::IntervalTimer`] - Periodic/software-triggered interrupt timer

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod timer;

// Re-export key traits at crate root for convenience
pub use gpio::{NullPin, OutputPin};
pub use timer::{InterruptMode, InterruptPriority, IntervalTimer, TimerMode};
