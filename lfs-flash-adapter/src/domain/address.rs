//! Address translation.
//!
//! The filesystem names storage as `(block, offset)`; the flash driver wants
//! one linear byte address. The layout is flat: block `n` starts at
//! `n * block_size` and nothing is remapped.

use core::fmt;
use lfs_block_device::Geometry;

/// A linear byte address in the flash part's own address space.
///
/// This value object keeps physical addresses from being mixed up with
/// block indices or in-block offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashAddress(u32);

impl FlashAddress {
    /// Create a new flash address.
    ///
    /// # Examples
    ///
    /// ```
    /// use lfs_flash_adapter::FlashAddress;
    ///
    /// let addr = FlashAddress::new(0x4_0000);
    /// assert_eq!(addr.value(), 262_144);
    /// ```
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the underlying u32 value.
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The address `by` bytes further on, or `None` past the 32-bit space.
    #[inline]
    pub const fn checked_offset(self, by: u32) -> Option<Self> {
        match self.0.checked_add(by) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for FlashAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for FlashAddress {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<FlashAddress> for u32 {
    fn from(addr: FlashAddress) -> Self {
        addr.value()
    }
}

/// Physical address of byte `offset` inside `block`.
///
/// Computes `block * block_size + offset`. The caller guarantees
/// `block < block_count` and `offset < block_size`; no bounds are checked
/// here. A validated [`Geometry`] fits in 32 bits, so in-range inputs never
/// overflow.
///
/// # Examples
///
/// ```
/// use lfs_block_device::Geometry;
/// use lfs_flash_adapter::physical_address;
///
/// let addr = physical_address(&Geometry::S25FL512S, 2, 32);
/// assert_eq!(addr.value(), 524_320);
/// ```
#[inline]
pub const fn physical_address(geometry: &Geometry, block: u32, offset: u32) -> FlashAddress {
    FlashAddress(block * geometry.block_size() + offset)
}
