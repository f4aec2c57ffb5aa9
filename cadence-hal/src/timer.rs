//! Timer channel abstractions
//!
//! The motion core owns four timer channels: two running at fixed rates
//! (pulse generation, dwell) and two that never free-run but whose
//! interrupt slots are pended by software to defer work across priority
//! levels. One trait covers both uses.

/// Counting mode for a timer channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Count up to the match value, fire, reset to zero
    UpToMatch,
    /// Count up to the match value, then back down (center-aligned)
    UpDownToMatch,
}

/// What causes the channel's interrupt to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    /// Fire on counter overflow/match
    OnOverflow,
    /// Fire only when pended via [`IntervalTimer::set_interrupt_pending`]
    OnSoftwareTrigger,
}

/// Interrupt priority slot, highest first
///
/// Relative ordering is what matters: a handler can only be preempted by
/// a strictly higher slot, and same-slot handlers never nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InterruptPriority {
    Highest,
    High,
    Medium,
    Low,
    Lowest,
}

/// A hardware timer channel with an interrupt line
///
/// Implementations map this onto a chip timer/counter channel and its
/// NVIC (or equivalent) interrupt slot.
pub trait IntervalTimer {
    /// Configure counting mode and overflow frequency in Hz
    fn set_mode_and_frequency(&mut self, mode: TimerMode, hz: u32);

    /// Configure the interrupt cause and its priority slot
    fn set_interrupts(&mut self, mode: InterruptMode, priority: InterruptPriority);

    /// Start the counter
    fn start(&mut self);

    /// Stop the counter
    fn stop(&mut self);

    /// Acknowledge the pending interrupt cause
    ///
    /// Called first thing in every handler; on most chips this is a
    /// status-register read or write-one-to-clear.
    fn clear_interrupt_cause(&mut self);

    /// Pend this channel's interrupt from software
    ///
    /// The handler runs when the channel's priority slot becomes the
    /// highest active one, exactly as if the counter had fired.
    fn set_interrupt_pending(&mut self);
}
