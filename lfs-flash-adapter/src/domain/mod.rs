//! Domain layer - address translation and the flash driver port.
//!
//! Nothing in here talks to hardware:
//! - **Value Objects**: `FlashAddress`
//! - **Translation**: `physical_address`
//! - **Ports**: `FlashDriver`
//!
//! The geometry itself lives in `lfs-block-device`, because the filesystem
//! is mounted with it.

pub mod address;
pub mod ports;

pub use address::{FlashAddress, physical_address};
pub use ports::{FlashDriver, FlashInfo};
