//! Stepper motion driver abstraction.
//!
//! Defines the [`MotionDriver`] trait the controller moves the blind through,
//! the [`AbortCheck`] hook that lets a running move be cancelled between two
//! step pulses, and [`StepDirDriver`], an implementation for STEP/DIR/ENABLE
//! stepper drivers (A4988, DRV8825, TMC2208 in standalone mode) on top of
//! `embedded-hal` pins and delays.

use crate::time::{TimeDuration, TimeInstant, TimeSource};
use crate::types::{Direction, HardwareConfig, PulseTiming};
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Errors reported by a motion driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverFault {
    /// A control line could not be driven.
    Io,
}

impl core::fmt::Display for DriverFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DriverFault::Io => write!(f, "stepper control line could not be driven"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverFault {}

/// Result of a [`MotionDriver::step_for`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepOutcome {
    /// Ran for the full duration.
    Completed { pulses: u32 },

    /// Cancelled by the abort check before the duration elapsed.
    Aborted { pulses: u32 },

    /// Driver was disabled, no pulse was emitted.
    NotMoved,
}

/// Cancellation hook consulted by [`MotionDriver::step_for`].
pub trait AbortCheck {
    /// Called once before the first pulse of a move.
    fn arm(&mut self) {}

    /// Called before every pulse. Returning `true` stops the move.
    ///
    /// Runs inside the pulse loop, so it must not block.
    fn should_abort(&mut self) -> bool;
}

/// Abort check that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverAbort;

impl AbortCheck for NeverAbort {
    fn should_abort(&mut self) -> bool {
        false
    }
}

/// Adapts a closure into an [`AbortCheck`].
pub struct AbortFn<F: FnMut() -> bool>(pub F);

impl<F: FnMut() -> bool> AbortCheck for AbortFn<F> {
    fn should_abort(&mut self) -> bool {
        (self.0)()
    }
}

/// Stop request shared with an interrupt handler.
///
/// Put it in a `static`, call [`StopFlag::request`] from the IR receiver
/// interrupt when SHUTDOWN is decoded, and pass `&FLAG` as the abort check.
/// Arming clears any request left over from before the move started.
#[derive(Debug, Default)]
pub struct StopFlag {
    requested: AtomicBool,
}

impl StopFlag {
    pub const fn new() -> Self {
        Self {
            requested: AtomicBool::new(false),
        }
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::Release);
    }

    pub fn clear(&self) {
        self.requested.store(false, Ordering::Release);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

impl AbortCheck for &StopFlag {
    fn arm(&mut self) {
        self.clear();
    }

    fn should_abort(&mut self) -> bool {
        self.is_requested()
    }
}

/// Trait for abstracting the stepper driver hardware.
///
/// Implement this for your driver, or use [`StepDirDriver`] for plain
/// STEP/DIR/ENABLE boards.
pub trait MotionDriver {
    /// Energizes the motor coils.
    fn enable(&mut self) -> Result<(), DriverFault>;

    /// De-energizes the motor coils.
    fn disable(&mut self) -> Result<(), DriverFault>;

    /// Returns true while the coils are energized.
    fn is_enabled(&self) -> bool;

    /// Sets the level of the direction line for subsequent pulses.
    fn set_direction(&mut self, direction: Direction) -> Result<(), DriverFault>;

    /// Emits step pulses for `duration_ms`, blocking the caller.
    ///
    /// `abort` is checked before every pulse. A disabled driver returns
    /// [`StepOutcome::NotMoved`] without pulsing.
    fn step_for<A: AbortCheck>(
        &mut self,
        duration_ms: u32,
        abort: A,
    ) -> Result<StepOutcome, DriverFault>;

    /// Stops the motor immediately.
    fn halt(&mut self) -> Result<(), DriverFault> {
        self.disable()
    }
}

/// STEP/DIR/ENABLE stepper driver.
///
/// Pulses are timed with a blocking [`DelayNs`]; elapsed run time is measured
/// with a [`TimeSource`] so that the time spent in the abort check does not
/// stretch the move.
///
/// # Type Parameters
/// * `'t` - Lifetime of the time source reference
/// * `STEP`, `DIR`, `EN` - Output pins
/// * `D` - Delay provider
/// * `I` - Time instant type
/// * `T` - Time source implementation type
pub struct StepDirDriver<'t, STEP, DIR, EN, D, I, T>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
    I: TimeInstant,
    T: TimeSource<I>,
{
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
    time_source: &'t T,
    timing: PulseTiming,
    enable_active_low: bool,
    enabled: bool,
    direction: Direction,
    _instant: PhantomData<I>,
}

impl<'t, STEP, DIR, EN, D, I, T> StepDirDriver<'t, STEP, DIR, EN, D, I, T>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
    I: TimeInstant,
    T: TimeSource<I>,
{
    /// Creates a disabled driver with STEP low and DIR at `Normal`.
    ///
    /// Pulse shape and ENABLE polarity come from `hardware`; a pulse width
    /// not below the period is clamped.
    pub fn new(
        step: STEP,
        dir: DIR,
        enable: EN,
        delay: D,
        time_source: &'t T,
        hardware: &HardwareConfig,
    ) -> Result<Self, DriverFault> {
        let mut driver = Self {
            step,
            dir,
            enable,
            delay,
            time_source,
            timing: hardware.pulse.normalized(),
            enable_active_low: hardware.enable_active_low,
            enabled: false,
            direction: Direction::Normal,
            _instant: PhantomData,
        };

        driver.step.set_low().map_err(|_| DriverFault::Io)?;
        driver.write_enable(false)?;
        driver.set_direction(Direction::Normal)?;
        Ok(driver)
    }

    /// Current pulse shape.
    pub fn timing(&self) -> PulseTiming {
        self.timing
    }

    /// Current direction line level.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Releases the pins and the delay.
    pub fn release(self) -> (STEP, DIR, EN, D) {
        (self.step, self.dir, self.enable, self.delay)
    }

    fn write_enable(&mut self, on: bool) -> Result<(), DriverFault> {
        let high = on != self.enable_active_low;
        let result = if high {
            self.enable.set_high()
        } else {
            self.enable.set_low()
        };
        result.map_err(|_| DriverFault::Io)
    }

    fn pulse(&mut self) -> Result<(), DriverFault> {
        self.step.set_high().map_err(|_| DriverFault::Io)?;
        self.delay.delay_us(self.timing.pulse_width_us);
        self.step.set_low().map_err(|_| DriverFault::Io)?;
        self.delay.delay_us(self.timing.low_time_us());
        Ok(())
    }
}

impl<'t, STEP, DIR, EN, D, I, T> MotionDriver for StepDirDriver<'t, STEP, DIR, EN, D, I, T>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
    I: TimeInstant,
    T: TimeSource<I>,
{
    fn enable(&mut self) -> Result<(), DriverFault> {
        self.write_enable(true)?;
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DriverFault> {
        // Mark disabled first so a failing pin never leaves us pulsing.
        self.enabled = false;
        self.write_enable(false)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), DriverFault> {
        let result = match direction {
            Direction::Normal => self.dir.set_high(),
            Direction::Reversed => self.dir.set_low(),
        };
        result.map_err(|_| DriverFault::Io)?;
        self.direction = direction;
        Ok(())
    }

    fn step_for<A: AbortCheck>(
        &mut self,
        duration_ms: u32,
        mut abort: A,
    ) -> Result<StepOutcome, DriverFault> {
        if !self.enabled {
            debug!("step_for while disabled");
            return Ok(StepOutcome::NotMoved);
        }

        abort.arm();
        let start = self.time_source.now();
        let mut pulses: u32 = 0;

        loop {
            let elapsed = self.time_source.now().duration_since(start);
            if elapsed.as_millis() >= duration_ms as u64 {
                return Ok(StepOutcome::Completed { pulses });
            }

            if abort.should_abort() {
                return Ok(StepOutcome::Aborted { pulses });
            }

            self.pulse()?;
            pulses = pulses.saturating_add(1);
        }
    }

    fn halt(&mut self) -> Result<(), DriverFault> {
        let step = self.step.set_low().map_err(|_| DriverFault::Io);
        self.disable()?;
        step
    }
}
