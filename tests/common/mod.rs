//! Shared test infrastructure for roller-blind integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use core::cell::Cell;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin};
use roller_blind::{
    AbortCheck, Direction, DriverFault, MemoryStorage, MotionDriver, StepOutcome, Storage,
    StorageError, StopFlag, TimeDuration, TimeInstant, TimeSource,
};
use std::rc::Rc;

// ============================================================================
// Mock Time Types
// ============================================================================

/// Mock duration type for testing (wraps microseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestDuration(pub u64);

impl TimeDuration for TestDuration {
    fn as_millis(&self) -> u64 {
        self.0 / 1000
    }
}

/// Mock instant type for testing (microseconds since start)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TestInstant(pub u64);

impl TimeInstant for TestInstant {
    type Duration = TestDuration;

    fn duration_since(&self, earlier: Self) -> Self::Duration {
        TestDuration(self.0 - earlier.0)
    }
}

/// Mock time source with controllable time advancement
pub struct MockTimeSource {
    current_time: Cell<TestInstant>,
}

impl MockTimeSource {
    pub fn new() -> Self {
        Self {
            current_time: Cell::new(TestInstant(0)),
        }
    }

    /// Advance time by the given number of microseconds
    pub fn advance_us(&self, us: u64) {
        let current = self.current_time.get();
        self.current_time.set(TestInstant(current.0 + us));
    }

    pub fn now_us(&self) -> u64 {
        self.current_time.get().0
    }
}

impl TimeSource<TestInstant> for MockTimeSource {
    fn now(&self) -> TestInstant {
        self.current_time.get()
    }
}

// ============================================================================
// Mock Pins and Delay
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Observable state of a mock pin, shared between the test and the driver
#[derive(Default)]
pub struct PinProbe {
    pub high: Cell<bool>,
    pub rising_edges: Cell<u32>,
    pub writes: Cell<u32>,
    pub fail: Cell<bool>,
}

/// Output pin that records its level and counts rising edges
pub struct MockPin {
    probe: Rc<PinProbe>,
}

impl MockPin {
    pub fn new() -> (Self, Rc<PinProbe>) {
        let probe = Rc::new(PinProbe::default());
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }

    fn write(&mut self, high: bool) -> Result<(), MockPinError> {
        if self.probe.fail.get() {
            return Err(MockPinError);
        }
        if high && !self.probe.high.get() {
            self.probe.rising_edges.set(self.probe.rising_edges.get() + 1);
        }
        self.probe.high.set(high);
        self.probe.writes.set(self.probe.writes.get() + 1);
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}

/// Delay that advances the mock clock instead of sleeping
///
/// Optionally raises a stop flag once the clock passes `trigger_at_us`,
/// standing in for the IR receiver interrupt.
pub struct MockDelay<'a> {
    clock: &'a MockTimeSource,
    trigger: Option<(&'a StopFlag, u64)>,
}

impl<'a> MockDelay<'a> {
    pub fn new(clock: &'a MockTimeSource) -> Self {
        Self {
            clock,
            trigger: None,
        }
    }

    pub fn with_trigger(clock: &'a MockTimeSource, flag: &'a StopFlag, at_us: u64) -> Self {
        Self {
            clock,
            trigger: Some((flag, at_us)),
        }
    }

    fn advance(&mut self, us: u64) {
        self.clock.advance_us(us);
        if let Some((flag, at_us)) = self.trigger {
            if self.clock.now_us() >= at_us {
                flag.request();
                self.trigger = None;
            }
        }
    }
}

impl DelayNs for MockDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        self.advance(ns as u64 / 1000);
    }

    fn delay_us(&mut self, us: u32) {
        self.advance(us as u64);
    }
}

// ============================================================================
// Mock Motion Driver
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    Enable,
    Disable,
    SetDirection(Direction),
    StepFor(u32),
    Halt,
}

/// Where the mock driver should report a fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Enable,
    SetDirection,
    /// Fault after this many pulses
    StepFor(u32),
}

/// Motion driver that records every call and emits one pulse per millisecond
pub struct MockDriver {
    enabled: bool,
    calls: heapless::Vec<DriverCall, 32>,
    fail: Option<FailPoint>,
    /// Pretend the enable line is broken: `enable()` succeeds but has no effect
    stuck_disabled: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            enabled: false,
            calls: heapless::Vec::new(),
            fail: None,
            stuck_disabled: false,
        }
    }

    pub fn failing_at(fail: FailPoint) -> Self {
        Self {
            fail: Some(fail),
            ..Self::new()
        }
    }

    pub fn stuck_disabled() -> Self {
        Self {
            stuck_disabled: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn record(&mut self, call: DriverCall) {
        let _ = self.calls.push(call);
    }
}

impl MotionDriver for MockDriver {
    fn enable(&mut self) -> Result<(), DriverFault> {
        self.record(DriverCall::Enable);
        if self.fail == Some(FailPoint::Enable) {
            return Err(DriverFault::Io);
        }
        self.enabled = !self.stuck_disabled;
        Ok(())
    }

    fn disable(&mut self) -> Result<(), DriverFault> {
        self.record(DriverCall::Disable);
        self.enabled = false;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_direction(&mut self, direction: Direction) -> Result<(), DriverFault> {
        self.record(DriverCall::SetDirection(direction));
        if self.fail == Some(FailPoint::SetDirection) {
            return Err(DriverFault::Io);
        }
        Ok(())
    }

    fn step_for<A: AbortCheck>(
        &mut self,
        duration_ms: u32,
        mut abort: A,
    ) -> Result<StepOutcome, DriverFault> {
        self.record(DriverCall::StepFor(duration_ms));
        if !self.enabled {
            return Ok(StepOutcome::NotMoved);
        }

        abort.arm();
        for pulses in 0..duration_ms {
            if let Some(FailPoint::StepFor(at)) = self.fail {
                if pulses == at {
                    return Err(DriverFault::Io);
                }
            }
            if abort.should_abort() {
                return Ok(StepOutcome::Aborted { pulses });
            }
        }
        Ok(StepOutcome::Completed {
            pulses: duration_ms,
        })
    }

    fn halt(&mut self) -> Result<(), DriverFault> {
        self.record(DriverCall::Halt);
        self.enabled = false;
        Ok(())
    }
}

// ============================================================================
// Abort Helpers
// ============================================================================

/// Aborts on the n-th check (0-based), counting every check
pub struct CountdownAbort<'a> {
    pub fire_at: u32,
    pub checks: &'a Cell<u32>,
}

impl AbortCheck for CountdownAbort<'_> {
    fn should_abort(&mut self) -> bool {
        let n = self.checks.get();
        self.checks.set(n + 1);
        n >= self.fire_at
    }
}

// ============================================================================
// Storage Helpers
// ============================================================================

/// Storage whose reads and writes can be made to fail
pub struct FlakyStorage {
    pub inner: MemoryStorage<16>,
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: u32,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self {
            inner: MemoryStorage::new(),
            fail_reads: false,
            fail_writes: false,
            writes: 0,
        }
    }
}

impl Storage for FlakyStorage {
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), StorageError> {
        if self.fail_reads {
            return Err(StorageError::Read);
        }
        self.inner.read(offset, buf)
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Write);
        }
        self.writes += 1;
        self.inner.write(offset, data)
    }
}
