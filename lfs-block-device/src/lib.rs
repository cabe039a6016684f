//! Block device contract for littlefs-style filesystems.
//!
//! This crate provides the [`BlockDevice`] trait that a copy-on-write
//! filesystem uses to reach its storage, the fixed [`Geometry`] it is
//! mounted with, and the [`Error`] vocabulary block operations report.
//!
//! # Features
//!
//! - `no_std` compatible by default
//! - Synchronous, blocking operations (one round-trip per call)
//! - Integer status codes matching littlefs (`LFS_ERR_*`) via [`status`]
//!
//! # Example
//!
//! ```ignore
//! use lfs_block_device::{BlockDevice, Error, Geometry};
//!
//! struct MyDevice {
//!     geometry: Geometry,
//! }
//!
//! impl BlockDevice for MyDevice {
//!     fn geometry(&self) -> &Geometry {
//!         &self.geometry
//!     }
//!
//!     fn read(&mut self, block: u32, offset: u32, buffer: &mut [u8]) -> Result<(), Error> {
//!         // Read implementation
//!         Ok(())
//!     }
//!
//!     fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), Error> {
//!         Ok(())
//!     }
//!
//!     fn erase(&mut self, block: u32) -> Result<(), Error> {
//!         Ok(())
//!     }
//!
//!     fn sync(&mut self) -> Result<(), Error> {
//!         Ok(())
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

mod geometry;

pub use geometry::{Geometry, GeometryBuilder, GeometryError};

/// Status code for a successful operation (`LFS_ERR_OK`).
pub const STATUS_OK: i32 = 0;

/// Errors a block device reports to the filesystem.
///
/// The filesystem treats the two variants differently: [`Error::Invalid`]
/// fails the current attempt only, while [`Error::Corrupt`] tells it to stop
/// trusting the block and relocate its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The operation failed or was not valid for this device.
    Invalid,
    /// The block can no longer be relied on.
    Corrupt,
}

impl Error {
    /// The littlefs integer code for this error.
    ///
    /// ```
    /// use lfs_block_device::Error;
    ///
    /// assert_eq!(Error::Invalid.code(), -22);
    /// assert_eq!(Error::Corrupt.code(), -84);
    /// ```
    #[inline]
    pub const fn code(self) -> i32 {
        match self {
            Error::Invalid => -22,
            Error::Corrupt => -84,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Invalid => write!(f, "Invalid block device operation"),
            Error::Corrupt => write!(f, "Block is corrupt"),
        }
    }
}

impl core::error::Error for Error {}

/// Collapse an operation result into a littlefs status code.
///
/// `Ok(())` becomes [`STATUS_OK`], errors become [`Error::code`].
#[inline]
pub fn status(result: Result<(), Error>) -> i32 {
    match result {
        Ok(()) => STATUS_OK,
        Err(e) => e.code(),
    }
}

/// A block device as seen by the filesystem.
///
/// Blocks are the filesystem's erase unit. All addresses are zero indexed:
/// `block` counts erase units and `offset` counts bytes inside that block.
///
/// Every call is a single blocking round-trip. The filesystem serializes
/// calls on one device and never calls these methods concurrently.
///
/// <div class="warning"><b>NOTE to implementors</b>: a region must be erased
/// before it is programmed. Implementations are not required to verify this.</div>
pub trait BlockDevice {
    /// The geometry the filesystem is mounted with.
    fn geometry(&self) -> &Geometry;

    /// Read `buffer.len()` bytes starting at `offset` inside `block`.
    fn read(&mut self, block: u32, offset: u32, buffer: &mut [u8]) -> Result<(), Error>;

    /// Program `data` at `offset` inside a previously erased `block`.
    ///
    /// `offset` and `data.len()` must be multiples of the geometry's program
    /// alignment.
    fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), Error>;

    /// Erase a whole block.
    ///
    /// May return [`Error::Corrupt`] if the block should be considered bad.
    fn erase(&mut self, block: u32) -> Result<(), Error>;

    /// Flush any state the device holds on the host side.
    fn sync(&mut self) -> Result<(), Error>;
}

impl<T: BlockDevice + ?Sized> BlockDevice for &mut T {
    #[inline]
    fn geometry(&self) -> &Geometry {
        (**self).geometry()
    }

    #[inline]
    fn read(&mut self, block: u32, offset: u32, buffer: &mut [u8]) -> Result<(), Error> {
        (**self).read(block, offset, buffer)
    }

    #[inline]
    fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), Error> {
        (**self).program(block, offset, data)
    }

    #[inline]
    fn erase(&mut self, block: u32) -> Result<(), Error> {
        (**self).erase(block)
    }

    #[inline]
    fn sync(&mut self) -> Result<(), Error> {
        (**self).sync()
    }
}
