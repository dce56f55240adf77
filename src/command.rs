//! Remote button decoding.
//!
//! Maps raw NEC `(address, command)` pairs delivered by the IR decoder to
//! [`ButtonCode`]s. The default table matches the handset shipped with the
//! blind:
//!
//! ```text
//!          [ VOL+ ]          0x01 - Up
//!   [ |<< ] [ > ] [ >>| ]    0x04 - Left, 0x05 - Shutdown, 0x06 - Right
//!          [ VOL- ]          0x09 - Down
//!
//!   [ ST/REPT ]  0x0E - Set
//!   [ 9 ]        0x1A - Direction
//! ```
//!
//! Frames from any other address are `Unknown`.

use crate::types::DEFAULT_IR_ADDRESS;
use heapless::Deque;

/// Decoded remote button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonCode {
    /// Open the blind (full travel).
    Up,
    /// Close the blind (full travel).
    Down,
    /// Nudge in the opening direction.
    Left,
    /// Nudge in the closing direction.
    Right,
    /// Stop any motion in progress.
    Shutdown,
    /// Toggle the direction flag.
    Set,
    /// Toggle the direction flag.
    Direction,
    /// Foreign remote or unmapped key.
    Unknown,
}

/// One frame reported by the IR decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrEvent {
    pub address: u16,
    pub command: u8,

    /// NEC auto-repeat frame sent while a key is held.
    pub repeat: bool,
}

impl IrEvent {
    /// Creates a fresh (non-repeat) key press.
    #[inline]
    pub fn new(address: u16, command: u8) -> Self {
        Self {
            address,
            command,
            repeat: false,
        }
    }

    /// Creates an auto-repeat frame.
    #[inline]
    pub fn repeat(address: u16, command: u8) -> Self {
        Self {
            address,
            command,
            repeat: true,
        }
    }
}

/// Command codes for one remote handset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrKeymap {
    pub address: u16,
    pub up: u8,
    pub down: u8,
    pub left: u8,
    pub right: u8,
    pub shutdown: u8,
    pub set: u8,
    pub direction: u8,
}

impl IrKeymap {
    /// Keymap of the stock handset.
    pub const DEFAULT: IrKeymap = IrKeymap {
        address: DEFAULT_IR_ADDRESS,
        up: 0x01,
        down: 0x09,
        left: 0x04,
        right: 0x06,
        shutdown: 0x05,
        set: 0x0E,
        direction: 0x1A,
    };

    /// Same key codes, different handset address.
    pub const fn with_address(self, address: u16) -> Self {
        IrKeymap { address, ..self }
    }

    /// Maps a raw frame to a button.
    ///
    /// Total and side-effect free. When two buttons share a code the one
    /// listed first in [`ButtonCode`] wins.
    pub fn interpret(&self, address: u16, command: u8) -> ButtonCode {
        if address != self.address {
            return ButtonCode::Unknown;
        }

        match command {
            c if c == self.up => ButtonCode::Up,
            c if c == self.down => ButtonCode::Down,
            c if c == self.left => ButtonCode::Left,
            c if c == self.right => ButtonCode::Right,
            c if c == self.shutdown => ButtonCode::Shutdown,
            c if c == self.set => ButtonCode::Set,
            c if c == self.direction => ButtonCode::Direction,
            _ => ButtonCode::Unknown,
        }
    }

    /// Maps an event to a button, ignoring its repeat flag.
    #[inline]
    pub fn interpret_event(&self, event: &IrEvent) -> ButtonCode {
        self.interpret(event.address, event.command)
    }

    /// Reverse lookup; `None` for `Unknown`.
    pub fn code_for(&self, button: ButtonCode) -> Option<u8> {
        match button {
            ButtonCode::Up => Some(self.up),
            ButtonCode::Down => Some(self.down),
            ButtonCode::Left => Some(self.left),
            ButtonCode::Right => Some(self.right),
            ButtonCode::Shutdown => Some(self.shutdown),
            ButtonCode::Set => Some(self.set),
            ButtonCode::Direction => Some(self.direction),
            ButtonCode::Unknown => None,
        }
    }
}

impl Default for IrKeymap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Interprets a raw frame against the stock handset keymap.
#[inline]
pub fn interpret(address: u16, command: u8) -> ButtonCode {
    IrKeymap::DEFAULT.interpret(address, command)
}

/// Non-blocking supplier of decoded IR frames.
pub trait IrSource {
    /// Returns the next pending frame, if any.
    fn poll_event(&mut self) -> Option<IrEvent>;
}

/// Frames pushed by the receiver interrupt, drained by the control loop.
impl<const N: usize> IrSource for Deque<IrEvent, N> {
    fn poll_event(&mut self) -> Option<IrEvent> {
        self.pop_front()
    }
}
