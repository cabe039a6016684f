//! Address window shared by the NOR flash backends.
//!
//! Both `embedded-storage` backends expose the part from a sector-aligned
//! `base` onwards, so the filesystem sees a flat space starting at zero.

use crate::domain::{FlashAddress, FlashInfo};

/// The part of a NOR flash a backend exposes, starting at `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Window {
    base: u32,
}

impl Window {
    /// # Panics
    ///
    /// Panics if `base` is not sector-aligned or lies beyond the part.
    pub(super) fn new(base: u32, erase_size: usize, capacity: usize) -> Self {
        assert!(
            base as usize % erase_size.max(1) == 0,
            "base must be aligned to the erase size"
        );
        assert!(base as usize <= capacity, "base must lie inside the flash");
        Self { base }
    }

    pub(super) fn base(&self) -> u32 {
        self.base
    }

    /// Part address of `address`, or `None` past the 32-bit space.
    #[inline]
    pub(super) fn absolute(&self, address: FlashAddress) -> Option<u32> {
        FlashAddress::new(self.base)
            .checked_offset(address.value())
            .map(FlashAddress::value)
    }

    /// Part range `from..to` for `length` bytes at `address`.
    #[inline]
    pub(super) fn range(&self, address: FlashAddress, length: u32) -> Option<(u32, u32)> {
        let from = self.absolute(address)?;
        Some((from, from.checked_add(length)?))
    }

    /// Describe the windowed part from the NOR trait constants.
    pub(super) fn info(
        &self,
        capacity: usize,
        read_size: usize,
        write_size: usize,
        erase_size: usize,
    ) -> FlashInfo {
        FlashInfo {
            capacity: (capacity as u64).saturating_sub(u64::from(self.base)),
            read_size: read_size as u32,
            program_size: write_size as u32,
            erase_size: erase_size as u32,
        }
    }
}
