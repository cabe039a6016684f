//! FlashDriver port - secondary (driven) port for raw flash access.
//!
//! This port is everything the block device adapter needs from a flash
//! driver: read, program and sector erase at linear byte addresses. Each
//! backend (embedded-storage NOR, async NOR, simulated RAM part) implements
//! it once; the backend is picked when the system is assembled.

use crate::domain::FlashAddress;

/// Static description of a flash part.
///
/// Used only to check a [`Geometry`](lfs_block_device::Geometry) against the
/// part before any I/O. The adapter never derives its geometry from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashInfo {
    /// Addressable bytes.
    pub capacity: u64,
    /// Read granularity in bytes.
    pub read_size: u32,
    /// Program granularity in bytes.
    pub program_size: u32,
    /// Smallest erasable sector in bytes.
    pub erase_size: u32,
}

/// Port for raw flash operations.
///
/// Every call blocks until the part has finished. Implementations perform
/// no retries; a failure is reported through [`FlashDriver::Error`] and the
/// caller decides what it means.
///
/// ```text
/// ┌─────────────────────┐
/// │  FlashBlockDevice   │
/// └──────────┬──────────┘
///            │ depends on
///            ▼
/// ┌─────────────────────┐
/// │  FlashDriver Port   │  ◄── This trait
/// └──────────┬──────────┘
///            │ implemented by
///            ▼
/// ┌─────────────────────┐
/// │  NorFlashDriver     │
/// │  RamFlash, ...      │
/// └─────────────────────┘
/// ```
pub trait FlashDriver {
    /// The driver's own error type.
    type Error: core::fmt::Debug;

    /// Describe the part.
    fn info(&self) -> FlashInfo;

    /// Read `buffer.len()` bytes starting at `address`.
    fn read(&mut self, address: FlashAddress, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Program `data` starting at `address`.
    ///
    /// The region must have been erased since it was last programmed.
    fn program(&mut self, address: FlashAddress, data: &[u8]) -> Result<(), Self::Error>;

    /// Sector-erase `length` bytes starting at `address`.
    ///
    /// `address` and `length` are multiples of [`FlashInfo::erase_size`].
    fn erase(&mut self, address: FlashAddress, length: u32) -> Result<(), Self::Error>;
}

impl<T: FlashDriver + ?Sized> FlashDriver for &mut T {
    type Error = T::Error;

    #[inline]
    fn info(&self) -> FlashInfo {
        (**self).info()
    }

    #[inline]
    fn read(&mut self, address: FlashAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(address, buffer)
    }

    #[inline]
    fn program(&mut self, address: FlashAddress, data: &[u8]) -> Result<(), Self::Error> {
        (**self).program(address, data)
    }

    #[inline]
    fn erase(&mut self, address: FlashAddress, length: u32) -> Result<(), Self::Error> {
        (**self).erase(address, length)
    }
}
