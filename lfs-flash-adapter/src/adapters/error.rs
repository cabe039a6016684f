//! Adapter construction errors.
//!
//! These are configuration errors. They are reported while assembling the
//! block device, before the first flash operation, never mid-operation.

use lfs_block_device::GeometryError;

/// Errors from assembling a [`FlashBlockDevice`](super::FlashBlockDevice).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdapterError {
    /// The geometry itself is inconsistent.
    Geometry(GeometryError),
    /// The geometry describes more bytes than the part has.
    CapacityExceeded {
        /// Bytes the geometry needs.
        required: u64,
        /// Bytes the part provides.
        available: u64,
    },
    /// Read alignment is finer than the part can read.
    ReadGranularity {
        /// Geometry read alignment.
        alignment: u32,
        /// Part read size.
        read_size: u32,
    },
    /// Program alignment is finer than the part can program.
    ProgramGranularity {
        /// Geometry program alignment.
        alignment: u32,
        /// Part program size.
        program_size: u32,
    },
    /// Block size is not a whole number of erase sectors.
    EraseGranularity {
        /// Geometry block size.
        block_size: u32,
        /// Part erase sector size.
        erase_size: u32,
    },
}

impl From<GeometryError> for AdapterError {
    fn from(err: GeometryError) -> Self {
        AdapterError::Geometry(err)
    }
}

impl core::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Geometry(e) => write!(f, "Invalid geometry: {}", e),
            Self::CapacityExceeded {
                required,
                available,
            } => write!(
                f,
                "Geometry needs {} bytes but the flash has {}",
                required, available
            ),
            Self::ReadGranularity {
                alignment,
                read_size,
            } => write!(
                f,
                "Read alignment {} is not a multiple of the flash read size {}",
                alignment, read_size
            ),
            Self::ProgramGranularity {
                alignment,
                program_size,
            } => write!(
                f,
                "Program alignment {} is not a multiple of the flash program size {}",
                alignment, program_size
            ),
            Self::EraseGranularity {
                block_size,
                erase_size,
            } => write!(
                f,
                "Block size {} is not a multiple of the flash erase size {}",
                block_size, erase_size
            ),
        }
    }
}

impl core::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            _ => None,
        }
    }
}
