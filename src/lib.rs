#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`BlindController`**: State machine turning remote buttons into timed moves
//! - **`ButtonCode`** / **`IrKeymap`**: Decoding of raw NEC `(address, command)` frames
//! - **`IrSource`**: Trait to implement for your IR receiver (a `heapless::Deque` works out of the box)
//! - **`MotionDriver`**: Trait to implement for your stepper driver, or use `StepDirDriver`
//! - **`AbortCheck`** / **`StopFlag`**: Cancellation of a running move between two step pulses
//! - **`Storage`**: Trait to implement for your EEPROM or flash
//! - **`ConfigStore`**: Persists the travel duration and direction flag on top of `Storage`
//! - **`TimeSource`**: Trait to implement for your timing system
//!
//! Pin numbers, the remote address and the pulse shape live in `HardwareConfig`,
//! which the board bring-up code hands to the collaborators at startup.

mod fmt;

pub mod time;
pub mod types;
pub mod command;
pub mod storage;
pub mod driver;
pub mod controller;

pub use command::{ButtonCode, IrEvent, IrKeymap, IrSource, interpret};
pub use controller::{BlindController, Outcome};
pub use driver::{
    AbortCheck, AbortFn, DriverFault, MotionDriver, NeverAbort, StepDirDriver, StepOutcome,
    StopFlag,
};
pub use storage::{ConfigStore, MemoryStorage, Storage, StorageError, StorageLayout};
pub use time::{TimeDuration, TimeInstant, TimeSource};
pub use types::{
    Configuration, DEFAULT_IR_ADDRESS, DEFAULT_NUDGE_DURATION_MS, DEFAULT_TRAVEL_DURATION_MS,
    Direction, HardwareConfig, MotionState, PulseTiming,
};
