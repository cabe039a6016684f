//! Serial NOR flash block device for littlefs-style filesystems.
//!
//! A copy-on-write filesystem talks to storage in `(block, offset)` terms
//! and expects erase-before-program semantics. This crate turns a raw NOR
//! flash driver into that block device: it translates addresses, checks
//! every request against the [`Geometry`], and maps driver failures onto the
//! filesystem's two error codes.
//!
//! # Architecture
//!
//! ## Domain Layer (`domain`)
//! - **Value Objects**: `FlashAddress`
//! - **Services**: `physical_address`, the block-to-address translator
//! - **Ports**: `FlashDriver` interface, `FlashInfo`
//!
//! ## Adapter Layer (`adapters`)
//! - **`FlashBlockDevice`**: Implements `BlockDevice` using a `FlashDriver`
//! - **`NorFlashDriver`**, **`BlockingNorFlashDriver`**, **`RamFlash`**: driver backends
//!
//! # Quick Start
//!
//! ```
//! use lfs_flash_adapter::{BlockDevice, Error, FlashBlockDevice, Geometry, RamFlash};
//!
//! let geometry = Geometry::builder()
//!     .block_size(4096)
//!     .block_count(16)
//!     .build()
//!     .unwrap();
//!
//! let mut flash = RamFlash::new(64 * 1024, 4096);
//! let mut device = FlashBlockDevice::new(&mut flash, geometry).unwrap();
//!
//! device.erase(3).unwrap();
//! device.program(3, 0, b"littlefs").unwrap();
//!
//! let mut buf = [0u8; 8];
//! device.read(3, 0, &mut buf).unwrap();
//! assert_eq!(&buf, b"littlefs");
//! assert_eq!(device.erase(16), Err(Error::Invalid));
//! ```
//!
//! # Error Mapping
//!
//! A failed read or program is `Invalid`; a failed erase is `Corrupt`, which
//! tells the filesystem to retire the block. `sync` always succeeds and
//! never touches the flash.
//!
//! # Features
//!
//! - `embedded-storage` (default): `NorFlashDriver` over blocking `NorFlash`
//! - `embedded-storage-async`: `BlockingNorFlashDriver` over async `NorFlash`
//! - `alloc` (default): the simulated `RamFlash` part
//! - `log`: Enable logging support
//! - `defmt`: Enable defmt logging for embedded

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

// MUST be the first module listed
mod fmt;

pub mod adapters;
pub mod domain;

pub use domain::{FlashAddress, FlashDriver, FlashInfo, physical_address};

pub use adapters::{AdapterError, FlashBlockDevice};

#[cfg(feature = "embedded-storage")]
pub use adapters::NorFlashDriver;

#[cfg(feature = "embedded-storage-async")]
pub use adapters::BlockingNorFlashDriver;

#[cfg(feature = "alloc")]
pub use adapters::{ERASED, FlashStats, Operation, RamFlash, RamFlashError};

// Re-export the contract so users can depend on this crate alone
pub use lfs_block_device::{
    BlockDevice, Error, Geometry, GeometryBuilder, GeometryError, STATUS_OK, status,
};
