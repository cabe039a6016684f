//! Adapter layer - Concrete implementations on both sides of the port.
//!
//! Upward, [`FlashBlockDevice`] implements the filesystem's `BlockDevice`
//! contract. Downward, each driver backend implements the
//! [`FlashDriver`](crate::domain::FlashDriver) port for one kind of part.
//!
//! # Hexagonal Architecture
//!
//! ```text
//!     ┌──────────────────────────────────┐
//!     │  Filesystem (BlockDevice)        │
//!     └────────────┬─────────────────────┘
//!                  │
//!                  │ calls
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │      Adapter Layer               │  ◄── This module
//!     │  - FlashBlockDevice              │
//!     └────────────┬─────────────────────┘
//!                  │
//!                  │ uses
//!                  ▼
//!     ┌──────────────────────────────────┐
//!     │  FlashDriver (port)              │
//!     │  - NorFlashDriver                │
//!     │  - BlockingNorFlashDriver        │
//!     │  - RamFlash                      │
//!     └──────────────────────────────────┘
//! ```
//!
//! # Available Adapters
//!
//! - **`FlashBlockDevice`**: Implements `BlockDevice` over any `FlashDriver`
//! - **`NorFlashDriver`**: Blocking `embedded-storage` NOR flash (requires `embedded-storage`)
//! - **`BlockingNorFlashDriver`**: Async NOR flash, blocked on per call (requires `embedded-storage-async`)
//! - **`RamFlash`**: Simulated NOR part in memory (requires `alloc`)

mod error;
mod flash_block_device;

#[cfg(any(feature = "embedded-storage", feature = "embedded-storage-async"))]
mod window;

#[cfg(feature = "embedded-storage")]
mod nor_flash_driver;

#[cfg(feature = "embedded-storage-async")]
mod blocking_nor_flash_driver;

#[cfg(feature = "alloc")]
mod ram_flash;

pub use error::AdapterError;
pub use flash_block_device::FlashBlockDevice;

#[cfg(feature = "embedded-storage")]
pub use nor_flash_driver::NorFlashDriver;

#[cfg(feature = "embedded-storage-async")]
pub use blocking_nor_flash_driver::BlockingNorFlashDriver;

#[cfg(feature = "alloc")]
pub use ram_flash::{ERASED, FlashStats, Operation, RamFlash, RamFlashError};
