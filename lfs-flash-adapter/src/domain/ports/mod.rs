//! Ports define the interfaces between the adapter and the outside world.
//!
//! The adapter has one driven port: the flash driver it forwards block
//! operations to. The driving side is the filesystem's
//! [`BlockDevice`](lfs_block_device::BlockDevice) contract.

mod flash_driver;

pub use flash_driver::{FlashDriver, FlashInfo};
