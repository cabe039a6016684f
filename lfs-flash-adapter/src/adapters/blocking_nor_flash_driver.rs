//! Async NOR flash driver backend.
//!
//! Many HAL flash drivers (QSPI peripherals with DMA, embassy-based parts)
//! only offer the `embedded-storage-async` traits. The filesystem calls the
//! block device synchronously, so each call here is driven to completion
//! with [`embassy_futures::block_on`] before returning.

use embassy_futures::block_on;
use embedded_storage_async::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};

use super::window::Window;
use crate::domain::{FlashAddress, FlashDriver, FlashInfo};

/// [`FlashDriver`] that blocks on an `embedded-storage-async` NOR flash.
///
/// Like [`NorFlashDriver`](super::NorFlashDriver), addresses are relative
/// to `base` and errors are reported as their [`NorFlashErrorKind`].
pub struct BlockingNorFlashDriver<F> {
    flash: F,
    window: Window,
}

impl<F: NorFlash> BlockingNorFlashDriver<F> {
    /// Wrap a flash, using the whole part.
    pub fn new(flash: F) -> Self {
        Self::with_base(flash, 0)
    }

    /// Wrap a flash, using the part from `base` onwards.
    ///
    /// # Panics
    ///
    /// Panics if `base` is not sector-aligned or lies beyond the part.
    pub fn with_base(flash: F, base: u32) -> Self {
        let window = Window::new(base, F::ERASE_SIZE, flash.capacity());
        Self { flash, window }
    }

    /// Get the window start.
    pub fn base(&self) -> u32 {
        self.window.base()
    }

    /// Get a reference to the wrapped flash.
    pub fn inner(&self) -> &F {
        &self.flash
    }

    /// Consume the driver and return the wrapped flash.
    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: NorFlash> FlashDriver for BlockingNorFlashDriver<F> {
    type Error = NorFlashErrorKind;

    fn info(&self) -> FlashInfo {
        self.window.info(
            self.flash.capacity(),
            F::READ_SIZE,
            F::WRITE_SIZE,
            F::ERASE_SIZE,
        )
    }

    fn read(&mut self, address: FlashAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let offset = self
            .window
            .absolute(address)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        block_on(self.flash.read(offset, buffer)).map_err(|e| e.kind())
    }

    fn program(&mut self, address: FlashAddress, data: &[u8]) -> Result<(), Self::Error> {
        let offset = self
            .window
            .absolute(address)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        block_on(self.flash.write(offset, data)).map_err(|e| e.kind())
    }

    fn erase(&mut self, address: FlashAddress, length: u32) -> Result<(), Self::Error> {
        let (from, to) = self
            .window
            .range(address, length)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        block_on(self.flash.erase(from, to)).map_err(|e| e.kind())
    }
}
