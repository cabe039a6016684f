//! Geometry descriptor.
//!
//! The geometry is the fixed set of sizes and counts that describes the
//! storage device to the filesystem. It is validated once when built and
//! cannot be changed afterwards: changing it without reformatting
//! invalidates everything already on flash.

use core::fmt;

/// Lookahead size used when the builder is not given one.
const DEFAULT_LOOKAHEAD_SIZE: u32 = 16;

/// Rated erase cycles used when the builder is not given a limit.
const DEFAULT_ERASE_CYCLE_LIMIT: u32 = 500;

/// Validated, immutable device geometry.
///
/// All sizes are in bytes.
///
/// # Examples
///
/// ```
/// use lfs_block_device::Geometry;
///
/// let geometry = Geometry::builder()
///     .read_alignment(16)
///     .program_alignment(16)
///     .block_size(256 * 1024)
///     .block_count(256)
///     .build()
///     .unwrap();
///
/// assert_eq!(geometry.capacity(), 64 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    read_alignment: u32,
    program_alignment: u32,
    block_size: u32,
    block_count: u32,
    cache_size: u32,
    lookahead_size: u32,
    erase_cycle_limit: u32,
}

impl Geometry {
    /// Cypress S25FL512S: 64 MiB QSPI NOR with uniform 256 KiB sectors.
    ///
    /// One filesystem block per physical sector, 16 byte read/program
    /// granularity and a 500 cycle wear-leveling budget.
    pub const S25FL512S: Geometry = Geometry {
        read_alignment: 16,
        program_alignment: 16,
        block_size: 256 * 1024,
        block_count: 256,
        cache_size: 16,
        lookahead_size: 16,
        erase_cycle_limit: 500,
    };

    /// Start building a geometry.
    #[inline]
    pub const fn builder() -> GeometryBuilder {
        GeometryBuilder::new()
    }

    /// Minimum size of a read; also the granularity of the filesystem's
    /// read cache.
    #[inline]
    pub const fn read_alignment(&self) -> u32 {
        self.read_alignment
    }

    /// Offsets and lengths of program operations are multiples of this.
    #[inline]
    pub const fn program_alignment(&self) -> u32 {
        self.program_alignment
    }

    /// Size of one erasable block.
    #[inline]
    pub const fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Number of blocks on the device.
    #[inline]
    pub const fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Size of each cache buffer the filesystem allocates.
    #[inline]
    pub const fn cache_size(&self) -> u32 {
        self.cache_size
    }

    /// Size of the filesystem's block allocation lookahead buffer.
    #[inline]
    pub const fn lookahead_size(&self) -> u32 {
        self.lookahead_size
    }

    /// Erase cycles a block is rated for before the filesystem moves its
    /// metadata elsewhere. Not enforced by the block device.
    #[inline]
    pub const fn erase_cycle_limit(&self) -> u32 {
        self.erase_cycle_limit
    }

    /// Usable capacity in bytes (`block_size * block_count`).
    #[inline]
    pub const fn capacity(&self) -> u64 {
        self.block_size as u64 * self.block_count as u64
    }

    /// Check whether `block` names a block on this device.
    #[inline]
    pub const fn contains_block(&self, block: u32) -> bool {
        block < self.block_count
    }

    /// Check whether `len` bytes starting at `offset` stay inside one block.
    #[inline]
    pub const fn contains_range(&self, offset: u32, len: usize) -> bool {
        (offset as u64) + (len as u64) <= self.block_size as u64
    }
}

/// Builder for [`Geometry`].
///
/// Alignments default to 1, `cache_size` to the least common multiple of
/// the two alignments, `lookahead_size` to 16 and `erase_cycle_limit` to 500.
/// `block_size` and `block_count` have no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryBuilder {
    read_alignment: u32,
    program_alignment: u32,
    block_size: u32,
    block_count: u32,
    cache_size: Option<u32>,
    lookahead_size: u32,
    erase_cycle_limit: u32,
}

impl GeometryBuilder {
    /// Create a builder with the defaults described on the type.
    pub const fn new() -> Self {
        Self {
            read_alignment: 1,
            program_alignment: 1,
            block_size: 0,
            block_count: 0,
            cache_size: None,
            lookahead_size: DEFAULT_LOOKAHEAD_SIZE,
            erase_cycle_limit: DEFAULT_ERASE_CYCLE_LIMIT,
        }
    }

    /// Set the read alignment.
    pub const fn read_alignment(mut self, value: u32) -> Self {
        self.read_alignment = value;
        self
    }

    /// Set the program alignment.
    pub const fn program_alignment(mut self, value: u32) -> Self {
        self.program_alignment = value;
        self
    }

    /// Set the block size.
    pub const fn block_size(mut self, value: u32) -> Self {
        self.block_size = value;
        self
    }

    /// Set the block count.
    pub const fn block_count(mut self, value: u32) -> Self {
        self.block_count = value;
        self
    }

    /// Set the cache size.
    pub const fn cache_size(mut self, value: u32) -> Self {
        self.cache_size = Some(value);
        self
    }

    /// Set the lookahead size.
    pub const fn lookahead_size(mut self, value: u32) -> Self {
        self.lookahead_size = value;
        self
    }

    /// Set the rated erase cycle limit.
    pub const fn erase_cycle_limit(mut self, value: u32) -> Self {
        self.erase_cycle_limit = value;
        self
    }

    /// Validate the configuration and produce a [`Geometry`].
    ///
    /// # Errors
    ///
    /// Returns the first rule the configuration breaks.
    pub const fn build(self) -> Result<Geometry, GeometryError> {
        if self.read_alignment == 0 {
            return Err(GeometryError::Zero { field: "read_alignment" });
        }
        if self.program_alignment == 0 {
            return Err(GeometryError::Zero { field: "program_alignment" });
        }
        if self.block_size == 0 {
            return Err(GeometryError::Zero { field: "block_size" });
        }
        if self.block_count == 0 {
            return Err(GeometryError::Zero { field: "block_count" });
        }

        let cache_size = match self.cache_size {
            Some(size) => size,
            None => lcm(self.read_alignment, self.program_alignment),
        };
        if cache_size == 0 {
            return Err(GeometryError::Zero { field: "cache_size" });
        }
        if self.lookahead_size == 0 {
            return Err(GeometryError::Zero { field: "lookahead_size" });
        }

        if self.block_size % self.read_alignment != 0 {
            return Err(GeometryError::MisalignedBlockSize {
                block_size: self.block_size,
                alignment: self.read_alignment,
            });
        }
        if self.block_size % self.program_alignment != 0 {
            return Err(GeometryError::MisalignedBlockSize {
                block_size: self.block_size,
                alignment: self.program_alignment,
            });
        }

        if cache_size > self.block_size {
            return Err(GeometryError::CacheTooLarge {
                cache_size,
                block_size: self.block_size,
            });
        }
        if cache_size % self.read_alignment != 0
            || cache_size % self.program_alignment != 0
            || self.block_size % cache_size != 0
        {
            return Err(GeometryError::MisalignedCache { cache_size });
        }

        if self.lookahead_size > self.block_size {
            return Err(GeometryError::LookaheadTooLarge {
                lookahead_size: self.lookahead_size,
                block_size: self.block_size,
            });
        }
        if self.lookahead_size % 8 != 0 {
            return Err(GeometryError::MisalignedLookahead {
                lookahead_size: self.lookahead_size,
            });
        }

        // The end of the last block is an exclusive erase bound, so it must
        // itself be a 32-bit address.
        if self.block_size as u64 * self.block_count as u64 > u32::MAX as u64 {
            return Err(GeometryError::CapacityOverflow {
                block_size: self.block_size,
                block_count: self.block_count,
            });
        }

        Ok(Geometry {
            read_alignment: self.read_alignment,
            program_alignment: self.program_alignment,
            block_size: self.block_size,
            block_count: self.block_count,
            cache_size,
            lookahead_size: self.lookahead_size,
            erase_cycle_limit: self.erase_cycle_limit,
        })
    }
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

const fn lcm(a: u32, b: u32) -> u32 {
    let product = (a / gcd(a, b)) as u64 * b as u64;
    if product > u32::MAX as u64 {
        0
    } else {
        product as u32
    }
}

/// Errors that can occur when building a [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeometryError {
    /// A size or count that must be positive is zero.
    Zero {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Block size is not a multiple of a read or program alignment.
    MisalignedBlockSize {
        /// The requested block size.
        block_size: u32,
        /// The alignment it must be a multiple of.
        alignment: u32,
    },
    /// Cache is larger than a block.
    CacheTooLarge {
        /// The requested cache size.
        cache_size: u32,
        /// The block size.
        block_size: u32,
    },
    /// Cache is not a multiple of both alignments or does not divide the block size.
    MisalignedCache {
        /// The requested cache size.
        cache_size: u32,
    },
    /// Lookahead buffer is larger than a block.
    LookaheadTooLarge {
        /// The requested lookahead size.
        lookahead_size: u32,
        /// The block size.
        block_size: u32,
    },
    /// Lookahead buffer is not a multiple of 8 bytes.
    MisalignedLookahead {
        /// The requested lookahead size.
        lookahead_size: u32,
    },
    /// The device would be larger than the 32-bit address space.
    CapacityOverflow {
        /// The requested block size.
        block_size: u32,
        /// The requested block count.
        block_count: u32,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero { field } => write!(f, "{} cannot be zero", field),
            Self::MisalignedBlockSize {
                block_size,
                alignment,
            } => write!(
                f,
                "Block size {} must be a multiple of alignment {}",
                block_size, alignment
            ),
            Self::CacheTooLarge {
                cache_size,
                block_size,
            } => write!(
                f,
                "Cache size {} exceeds block size {}",
                cache_size, block_size
            ),
            Self::MisalignedCache { cache_size } => write!(
                f,
                "Cache size {} must be a multiple of both alignments and divide the block size",
                cache_size
            ),
            Self::LookaheadTooLarge {
                lookahead_size,
                block_size,
            } => write!(
                f,
                "Lookahead size {} exceeds block size {}",
                lookahead_size, block_size
            ),
            Self::MisalignedLookahead { lookahead_size } => write!(
                f,
                "Lookahead size {} must be a multiple of 8",
                lookahead_size
            ),
            Self::CapacityOverflow {
                block_size,
                block_count,
            } => write!(
                f,
                "{} blocks of {} bytes exceed the 32-bit address space",
                block_count, block_size
            ),
        }
    }
}

impl core::error::Error for GeometryError {}
