//! Persistent configuration storage.
//!
//! Provides the [`Storage`] trait for byte-addressed non-volatile memory
//! (EEPROM, emulated EEPROM on flash, FRAM) and [`ConfigStore`], which keeps
//! the blind's [`Configuration`] in a small fixed layout on top of it.
//!
//! # Layout
//!
//! ```text
//! base + 0   marker            1 byte   0xA5 once initialized
//! base + 1   travel duration   4 bytes  little endian milliseconds
//! base + 5   direction flag    1 byte   1 = normal, 0 = reversed
//! ```
//!
//! Every field is written with a single [`Storage::write`] call. There is no
//! transaction across fields.

use crate::types::{Configuration, DEFAULT_TRAVEL_DURATION_MS};

/// Marker byte identifying an initialized layout (layout version 1).
pub const INIT_MARKER: u8 = 0xA5;

/// Errors reported by persistent storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Reading a field failed.
    Read,

    /// Writing a field failed.
    Write,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StorageError::Read => write!(f, "persistent storage read failed"),
            StorageError::Write => write!(f, "persistent storage write failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StorageError {}

/// Trait for abstracting byte-addressed persistent memory.
///
/// Implement this on top of your EEPROM or flash driver. A single `write`
/// call is expected to either land completely or leave the old bytes intact.
pub trait Storage {
    /// Fills `buf` with the bytes starting at `offset`.
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Stores `data` starting at `offset`.
    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), StorageError>;
}

impl<S: Storage + ?Sized> Storage for &mut S {
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), StorageError> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(offset, data)
    }
}

/// RAM-backed storage, erased (`0xFF`) on creation.
#[derive(Debug, Clone)]
pub struct MemoryStorage<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> MemoryStorage<N> {
    /// Creates an erased storage.
    pub fn new() -> Self {
        Self { bytes: [0xFF; N] }
    }

    /// Raw contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(offset: u16, len: usize) -> Option<core::ops::Range<usize>> {
        let start = offset as usize;
        let end = start.checked_add(len)?;
        (end <= N).then_some(start..end)
    }
}

impl<const N: usize> Default for MemoryStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Storage for MemoryStorage<N> {
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), StorageError> {
        let range = Self::range(offset, buf.len()).ok_or(StorageError::Read)?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), StorageError> {
        let range = Self::range(offset, data.len()).ok_or(StorageError::Write)?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}

/// Where the configuration lives inside the storage address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StorageLayout {
    pub base: u16,
}

impl StorageLayout {
    /// Total bytes used by the layout.
    pub const SIZE: u16 = 6;

    pub const fn new(base: u16) -> Self {
        Self { base }
    }

    #[inline]
    pub const fn marker_offset(&self) -> u16 {
        self.base
    }

    /// `None` if the field would lie past the end of the address space.
    #[inline]
    pub const fn travel_duration_offset(&self) -> Option<u16> {
        self.base.checked_add(1)
    }

    /// `None` if the field would lie past the end of the address space.
    #[inline]
    pub const fn direction_offset(&self) -> Option<u16> {
        self.base.checked_add(Self::SIZE - 1)
    }
}

/// Loads and saves the blind configuration.
pub struct ConfigStore<S: Storage> {
    storage: S,
    layout: StorageLayout,
}

impl<S: Storage> ConfigStore<S> {
    /// Creates a store using the layout at offset 0.
    pub fn new(storage: S) -> Self {
        Self::with_layout(storage, StorageLayout::default())
    }

    pub fn with_layout(storage: S, layout: StorageLayout) -> Self {
        Self { storage, layout }
    }

    /// Reads the configuration, initializing the storage on first boot.
    ///
    /// On first boot (marker absent) the defaults are written field by field
    /// and the marker last, so an interrupted initialization is retried on
    /// the next boot.
    ///
    /// # Returns
    /// * `Ok(config)` - Persisted or freshly written values, `initialized` set
    /// * `Err` - A field could not be read, or first boot writes failed
    pub fn load(&mut self) -> Result<Configuration, StorageError> {
        let mut marker = [0u8; 1];
        self.storage.read(self.layout.marker_offset(), &mut marker)?;

        if marker[0] != INIT_MARKER {
            let config = Configuration::default();
            info!("no persisted configuration, writing defaults");
            self.save_travel_duration(config.travel_duration_ms)?;
            self.save_direction(config.normal_direction)?;
            self.storage
                .write(self.layout.marker_offset(), &[INIT_MARKER])?;
            return Ok(Configuration {
                initialized: true,
                ..config
            });
        }

        let duration_offset = self
            .layout
            .travel_duration_offset()
            .ok_or(StorageError::Read)?;
        let direction_offset = self.layout.direction_offset().ok_or(StorageError::Read)?;

        let mut duration = [0u8; 4];
        self.storage.read(duration_offset, &mut duration)?;
        let mut direction = [0u8; 1];
        self.storage.read(direction_offset, &mut direction)?;

        let travel_duration_ms = match u32::from_le_bytes(duration) {
            0 | u32::MAX => DEFAULT_TRAVEL_DURATION_MS,
            ms => ms,
        };

        Ok(Configuration {
            travel_duration_ms,
            normal_direction: direction[0] != 0,
            initialized: true,
            ..Configuration::default()
        })
    }

    /// Persists the full-travel duration.
    pub fn save_travel_duration(&mut self, ms: u32) -> Result<(), StorageError> {
        let offset = self
            .layout
            .travel_duration_offset()
            .ok_or(StorageError::Write)?;
        self.storage.write(offset, &ms.to_le_bytes())
    }

    /// Persists the direction flag.
    pub fn save_direction(&mut self, normal: bool) -> Result<(), StorageError> {
        let offset = self.layout.direction_offset().ok_or(StorageError::Write)?;
        self.storage.write(offset, &[normal as u8])
    }

    pub fn layout(&self) -> StorageLayout {
        self.layout
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }
}
