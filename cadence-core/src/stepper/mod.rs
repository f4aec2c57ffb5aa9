//! Stepper pulse generation
//!
//! Translates pre-planned motion segments (per motor, a signed number of
//! fractional steps to execute over a duration in microseconds) into
//! precisely timed step pulses on up to [`MOTORS`] independent outputs,
//! while the following segment is prepared in parallel so the generator
//! never stalls between segments.
//!
//! # Pipeline
//!
//! Three data structures are involved, each confined to one execution
//! level:
//!
//! | structure          | written by        | runs at              |
//! |--------------------|-------------------|----------------------|
//! | planner buffers    | planner           | main loop            |
//! | [`Stage`]          | exec interrupt    | lowest IRQ priority  |
//! | [`Runtime`]        | loader + DDA      | highest IRQ priority |
//!
//! Per segment the flow is: the exec software interrupt asks the planner
//! for a move and the planner stages it ([`Stage::prep_line`]); the load
//! software interrupt copies the stage into the runtime and arms the
//! direction and enable lines; the DDA timer interrupt drains the runtime
//! one tick at a time; end-of-segment invokes the loader directly, which
//! in turn re-requests the executor. A pipeline depth of two (one segment
//! running, one staged) keeps the DDA from ever waiting on arithmetic.
//!
//! # Priority as lock
//!
//! There are no locks and no atomics here; the interrupt priority scheme
//! itself is the synchronization. The contract the dispatching layer
//! must uphold:
//!
//! - [`StepperCore::dda_isr`] and [`StepperCore::dwell_isr`] run at the
//!   highest priority and never preempt each other.
//! - [`StepperCore::exec_isr`] runs at a strictly lower priority than
//!   [`StepperCore::load_isr`].
//! - The loader runs either from the DDA handler itself at
//!   end-of-segment or from its software slot, which is only ever pended
//!   while the DDA timer is stopped, so the runtime is never observed
//!   half-written.
//! - [`Stage`] is handed between executor and loader through the single
//!   ownership word; each side touches the stage only while it owns it.
//!
//! On targets without nestable software interrupts the exec body may be
//! polled from the main loop instead, as long as the stage-to-runtime
//! copy masks the DDA interrupt.

pub mod motor;
pub mod runtime;
pub mod stage;

pub use motor::{Motor, MotorPins};
pub use runtime::{Runtime, RuntimeMotor};
pub use stage::{Direction, MoveType, PrepError, Stage, StageMotor, StageOwner};

use cadence_hal::{InterruptMode, InterruptPriority, IntervalTimer, OutputPin, TimerMode};

use crate::config::{MotorConfig, PowerMode};
use crate::traits::{ExecStatus, MovePlanner};

/// Motor count of the reference board
///
/// Everything in this module is parametric over `M`; this is the value
/// the shipped hardware uses.
pub const MOTORS: usize = 6;

/// DDA substep scaling factor
///
/// Multiplies both the per-motor increment and the accumulator threshold,
/// buying sub-pulse timing resolution without changing the pulse count.
pub const DDA_SUBSTEPS: u32 = 10;

/// Step pulse generation rate in Hz
pub const FREQUENCY_DDA: u32 = 200_000;

/// Dwell countdown rate in Hz
pub const FREQUENCY_DWELL: u32 = 1_000;

/// Nominal rate for the software-interrupt timers in Hz
///
/// These timers never free-run; they exist to own their interrupt
/// priority slots and are fired by software.
pub const FREQUENCY_SGI: u32 = 100_000;

/// A segment this many times shorter than its predecessor forces an
/// accumulator reseed at load (anti-stall heuristic)
pub const COUNTER_RESET_FACTOR: u32 = 4;

/// Smallest representable segment duration in microseconds
pub const EPSILON: f32 = 0.000_01;

/// Memory-integrity sentinel installed in both singletons at init
pub const MAGIC: u16 = 0xC0DA;

/// The four timer channels the core owns
#[derive(Debug)]
pub struct PulseTimers<T: IntervalTimer> {
    /// Step pulse generation, highest priority
    pub dda: T,
    /// Dwell countdown, highest priority
    pub dwell: T,
    /// Software-triggered load slot; low priority, but only ever pended
    /// while the generator is idle
    pub load: T,
    /// Software-triggered exec slot, lowest priority
    pub exec: T,
}

/// The stepper pulse generation core
///
/// Owns the double-buffered segment pipeline, the per-motor pin bundles
/// and the four timer channels. Interrupt bodies are plain methods; the
/// platform layer dispatches them at the priorities documented on this
/// module.
#[derive(Debug)]
pub struct StepperCore<P: OutputPin, T: IntervalTimer, const M: usize = MOTORS> {
    run: Runtime<M>,
    stage: Stage<M>,
    motors: [Motor<P>; M],
    /// Board-wide enable line, active low
    shared_enable: P,
    /// Optional scope probe bracketing the DDA handler
    timing_probe: Option<P>,
    timers: PulseTimers<T>,
}

impl<P: OutputPin, T: IntervalTimer, const M: usize> StepperCore<P, T, M> {
    /// Initialize the stepper subsystem
    ///
    /// Zeroes both pipeline singletons, installs the integrity sentinels,
    /// hands the stage to the executor and configures all four timer
    /// channels. Interrupts must be enabled by the caller once every
    /// subsystem init has run; nothing starts counting until the first
    /// segment is loaded.
    pub fn new(
        motors: [MotorPins<P>; M],
        config: [MotorConfig; M],
        shared_enable: P,
        mut timers: PulseTimers<T>,
    ) -> Self {
        timers
            .dda
            .set_mode_and_frequency(TimerMode::UpToMatch, FREQUENCY_DDA);
        timers
            .dda
            .set_interrupts(InterruptMode::OnOverflow, InterruptPriority::Highest);

        timers
            .dwell
            .set_mode_and_frequency(TimerMode::UpToMatch, FREQUENCY_DWELL);
        timers
            .dwell
            .set_interrupts(InterruptMode::OnOverflow, InterruptPriority::Highest);

        timers
            .load
            .set_mode_and_frequency(TimerMode::UpToMatch, FREQUENCY_SGI);
        timers
            .load
            .set_interrupts(InterruptMode::OnSoftwareTrigger, InterruptPriority::Low);

        timers
            .exec
            .set_mode_and_frequency(TimerMode::UpToMatch, FREQUENCY_SGI);
        timers
            .exec
            .set_interrupts(InterruptMode::OnSoftwareTrigger, InterruptPriority::Lowest);

        let polarity = config.map(|c| c.polarity);
        let mut slot = 0;
        let motors = motors.map(|pins| {
            let motor = Motor::new(pins, config[slot].power_mode);
            slot += 1;
            motor
        });

        Self {
            run: Runtime::new(),
            stage: Stage::new(polarity),
            motors,
            shared_enable,
            timing_probe: None,
            timers,
        }
    }

    /// Attach a scope probe pin that is driven low on DDA entry and high
    /// on exit, for measuring handler occupancy
    pub fn attach_timing_probe(&mut self, pin: P) {
        self.timing_probe = Some(pin);
    }

    /// DDA timer interrupt body, the inner loop
    ///
    /// Must complete within one DDA tick. Runs only while a segment is
    /// loaded; a motor with a zero increment idles without branching out
    /// of the scan.
    pub fn dda_isr(&mut self) {
        self.timers.dda.clear_interrupt_cause();
        if let Some(probe) = self.timing_probe.as_mut() {
            probe.set_low();
        }

        let threshold = self.run.timer_ticks_x_substeps;
        for (state, motor) in self.run.m.iter_mut().zip(self.motors.iter_mut()) {
            if motor.pins.step.is_null() {
                continue;
            }
            state.phase_accumulator += state.phase_increment;
            if state.phase_accumulator > 0 {
                state.phase_accumulator -= threshold;
                motor.pins.step.set_high();
                #[cfg(any(test, feature = "step-diagnostics"))]
                {
                    state.step_count_diagnostic = state.step_count_diagnostic.wrapping_add(1);
                }
            }
        }
        // Blanket clear: pulse width is the set-to-clear distance within
        // this handler, identical for every motor count.
        for motor in self.motors.iter_mut() {
            motor.pins.step.set_low();
        }

        self.run.timer_ticks_downcount -= 1;
        if self.run.timer_ticks_downcount == 0 {
            // Power down motors that don't hold torque between segments.
            for motor in self.motors.iter_mut() {
                if motor.power_mode == PowerMode::IdleWhenStopped {
                    motor.pins.enable.set_high();
                }
            }
            self.disable();
            self.load_move();
        }

        if let Some(probe) = self.timing_probe.as_mut() {
            probe.set_high();
        }
    }

    /// Dwell timer interrupt body
    ///
    /// Counts the pause down with no step output, then hands off to the
    /// loader.
    pub fn dwell_isr(&mut self) {
        self.timers.dwell.clear_interrupt_cause();
        self.run.timer_ticks_downcount -= 1;
        if self.run.timer_ticks_downcount == 0 {
            self.timers.dwell.stop();
            self.load_move();
        }
    }

    /// Request a planner callback on the exec interrupt
    ///
    /// Dropped silently unless the executor owns the stage; the loader
    /// re-requests after it consumes the previous segment.
    pub fn request_exec(&mut self) {
        if self.stage.exec_state == StageOwner::Exec {
            self.timers.exec.set_interrupt_pending();
        }
    }

    /// Exec software interrupt body
    ///
    /// Runs the planner callback and, if a segment was staged, passes
    /// stage ownership to the loader. Must only be dispatched at a level
    /// below the DDA.
    pub fn exec_isr(&mut self, planner: &mut impl MovePlanner<M>) {
        self.timers.exec.clear_interrupt_cause();
        if self.stage.exec_state == StageOwner::Exec {
            match planner.exec_move(&mut self.stage) {
                ExecStatus::Planned => {
                    self.stage.exec_state = StageOwner::Loader;
                    self.request_load();
                }
                ExecStatus::Noop => self.stage.prep_null(),
            }
        }
    }

    /// Fire the load software interrupt if the generator is idle
    ///
    /// While a segment is still running there is no point interrupting:
    /// the DDA handler itself invokes the loader at end-of-segment.
    fn request_load(&mut self) {
        if self.run.timer_ticks_downcount == 0 {
            self.timers.load.set_interrupt_pending();
        }
    }

    /// Load software interrupt body
    pub fn load_isr(&mut self) {
        self.timers.load.clear_interrupt_cause();
        self.load_move();
    }

    /// Copy the staged move into the runtime and arm the hardware
    ///
    /// Only callable from the same or higher priority as the DDA and
    /// dwell handlers; the runtime is rewritten here while the timers are
    /// stopped.
    fn load_move(&mut self) {
        match self.stage.move_type {
            MoveType::Line => {
                self.run.timer_ticks_downcount = self.stage.timer_ticks as i32;
                self.run.timer_ticks_x_substeps = self.stage.timer_ticks_x_substeps as i32;
                let downcount = self.run.timer_ticks_downcount;

                for i in 0..M {
                    let state = &mut self.run.m[i];
                    state.phase_increment = self.stage.m[i].phase_increment as i32;
                    if self.stage.counter_reset_flag {
                        // Compensate for out-of-range pulse phasing: seed
                        // exactly one tick's worth below the threshold.
                        state.phase_accumulator = -downcount;
                    }
                    if state.phase_increment != 0 {
                        match self.stage.m[i].dir {
                            Direction::Forward => self.motors[i].pins.dir.set_low(),
                            Direction::Reverse => self.motors[i].pins.dir.set_high(),
                        }
                        self.motors[i].pins.enable.set_low();
                    }
                    // A motor with zero steps keeps its direction line
                    // and stays unpowered so idle power modes work.
                }
                self.enable();
            }
            MoveType::Dwell => {
                self.run.timer_ticks_downcount = self.stage.timer_ticks as i32;
                self.timers.dwell.start();
            }
            MoveType::Null => {}
        }

        self.stage.exec_state = StageOwner::Exec;
        self.request_exec();
    }

    /// Start the steppers: shared enable on (active low), DDA running
    pub fn enable(&mut self) {
        self.shared_enable.set_low();
        self.timers.dda.start();
    }

    /// Stop the steppers
    ///
    /// Stops the DDA timer, drops the shared and per-motor enable lines
    /// and zeroes every increment so a stray tick moves nothing. Also the
    /// external fault path: safe to call at any time from any level at or
    /// above the DDA.
    pub fn disable(&mut self) {
        self.timers.dda.stop();
        self.shared_enable.set_high();
        for motor in self.motors.iter_mut() {
            motor.pins.enable.set_high();
        }
        self.run.clear_increments();
    }

    /// Whether motors are running or a dwell is counting down
    pub fn is_busy(&self) -> bool {
        self.run.timer_ticks_downcount != 0
    }

    /// Set the microstep mode for one motor driver
    ///
    /// The mode is validated by the caller (1, 2, 4 or 8). Not driven to
    /// hardware yet.
    // TODO: drive ms0/ms1 here once the mode-pin truth table for the
    // reference driver board is confirmed.
    pub fn set_microsteps(&mut self, motor: usize, microstep_mode: u8) {
        let _ = (motor, microstep_mode);
    }

    /// Runtime memory-integrity sentinel
    pub fn runtime_magic(&self) -> u16 {
        self.run.magic_start
    }

    /// Stage memory-integrity sentinel
    pub fn stage_magic(&self) -> u16 {
        self.stage.magic_start
    }

    /// Pulses emitted on one motor since init
    ///
    /// Counts only when the `step-diagnostics` feature is compiled in
    /// (tests always count); reads zero otherwise.
    pub fn step_count(&self, motor: usize) -> u32 {
        self.run.m[motor].step_count_diagnostic
    }
}
