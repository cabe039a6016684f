//! Simulated NOR flash held in RAM.
//!
//! Behaves like a serial NOR part as far as the block device can tell:
//! erased bytes read `0xFF`, programming can only clear bits, and erasing
//! wears the sector. Faults can be injected per operation to exercise the
//! error paths of code that sits above the driver.

use alloc::vec;
use alloc::vec::Vec;

use crate::domain::{FlashAddress, FlashDriver, FlashInfo};

/// Value of an erased byte.
pub const ERASED: u8 = 0xFF;

/// Driver operation, used to target fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// [`FlashDriver::read`].
    Read,
    /// [`FlashDriver::program`].
    Program,
    /// [`FlashDriver::erase`].
    Erase,
}

impl Operation {
    const fn index(self) -> usize {
        match self {
            Operation::Read => 0,
            Operation::Program => 1,
            Operation::Erase => 2,
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Program => write!(f, "program"),
            Operation::Erase => write!(f, "erase"),
        }
    }
}

/// Errors reported by [`RamFlash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RamFlashError {
    /// The access runs past the end of the part.
    OutOfBounds,
    /// The access is not aligned to the part's granularity.
    NotAligned,
    /// The part did not answer in time.
    Timeout,
    /// The bus transfer failed.
    Bus,
    /// The sector has reached its rated erase cycles.
    WornOut,
}

impl core::fmt::Display for RamFlashError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RamFlashError::OutOfBounds => write!(f, "Access out of bounds"),
            RamFlashError::NotAligned => write!(f, "Access not aligned"),
            RamFlashError::Timeout => write!(f, "Flash operation timed out"),
            RamFlashError::Bus => write!(f, "Flash bus error"),
            RamFlashError::WornOut => write!(f, "Sector worn out"),
        }
    }
}

impl core::error::Error for RamFlashError {}

/// Number of driver calls issued, whether or not they succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashStats {
    /// Calls to [`FlashDriver::read`].
    pub reads: u32,
    /// Calls to [`FlashDriver::program`].
    pub programs: u32,
    /// Calls to [`FlashDriver::erase`].
    pub erases: u32,
}

impl FlashStats {
    /// Total calls of any kind.
    pub fn total(&self) -> u32 {
        self.reads + self.programs + self.erases
    }
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    error: RamFlashError,
    sticky: bool,
}

/// A NOR flash part simulated in memory.
///
/// # Examples
///
/// ```
/// use lfs_flash_adapter::{FlashAddress, FlashDriver, RamFlash};
///
/// let mut flash = RamFlash::new(64 * 1024, 4096);
/// flash.program(FlashAddress::new(0), &[0x0F]).unwrap();
/// flash.program(FlashAddress::new(0), &[0xF1]).unwrap();
/// assert_eq!(flash.as_bytes()[0], 0x01);
/// ```
#[derive(Debug, Clone)]
pub struct RamFlash {
    data: Vec<u8>,
    erase_counts: Vec<u32>,
    read_size: u32,
    program_size: u32,
    erase_size: u32,
    endurance: Option<u32>,
    faults: [Option<Fault>; 3],
    stats: FlashStats,
}

impl RamFlash {
    /// Create an erased part of `capacity` bytes with `erase_size` sectors.
    ///
    /// Reads and programs have byte granularity until
    /// [`with_granularity`](Self::with_granularity) says otherwise.
    ///
    /// # Panics
    ///
    /// Panics if `erase_size` is zero or does not divide `capacity`.
    pub fn new(capacity: u32, erase_size: u32) -> Self {
        assert!(erase_size > 0, "erase size cannot be zero");
        assert!(
            capacity % erase_size == 0,
            "capacity must be a whole number of sectors"
        );
        Self {
            data: vec![ERASED; capacity as usize],
            erase_counts: vec![0; (capacity / erase_size) as usize],
            read_size: 1,
            program_size: 1,
            erase_size,
            endurance: None,
            faults: [None; 3],
            stats: FlashStats::default(),
        }
    }

    /// Set the read and program granularity.
    ///
    /// # Panics
    ///
    /// Panics if either size is zero or does not divide the erase size.
    pub fn with_granularity(mut self, read_size: u32, program_size: u32) -> Self {
        assert!(
            read_size > 0 && self.erase_size % read_size == 0,
            "read size must divide the erase size"
        );
        assert!(
            program_size > 0 && self.erase_size % program_size == 0,
            "program size must divide the erase size"
        );
        self.read_size = read_size;
        self.program_size = program_size;
        self
    }

    /// Wear sectors out after `cycles` erases.
    pub fn with_endurance(mut self, cycles: u32) -> Self {
        self.endurance = Some(cycles);
        self
    }

    /// Fail the next `operation` with `error`, then behave normally.
    pub fn fail_next(&mut self, operation: Operation, error: RamFlashError) {
        self.faults[operation.index()] = Some(Fault {
            error,
            sticky: false,
        });
    }

    /// Fail every `operation` with `error` until [`clear_faults`](Self::clear_faults).
    pub fn fail_always(&mut self, operation: Operation, error: RamFlashError) {
        self.faults[operation.index()] = Some(Fault {
            error,
            sticky: true,
        });
    }

    /// Remove every injected fault.
    pub fn clear_faults(&mut self) {
        self.faults = [None; 3];
    }

    /// Call counters.
    pub fn stats(&self) -> FlashStats {
        self.stats
    }

    /// Reset the call counters.
    pub fn reset_stats(&mut self) {
        self.stats = FlashStats::default();
    }

    /// How many times the sector holding `address` has been erased.
    ///
    /// Returns zero for addresses past the end of the part.
    pub fn erase_count(&self, address: FlashAddress) -> u32 {
        let sector = (address.value() / self.erase_size) as usize;
        self.erase_counts.get(sector).copied().unwrap_or(0)
    }

    /// Raw contents of the part.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn injected(&mut self, operation: Operation) -> Result<(), RamFlashError> {
        let slot = &mut self.faults[operation.index()];
        match *slot {
            Some(fault) => {
                if !fault.sticky {
                    *slot = None;
                }
                trace!("Injected {} fault: {}", operation, fault.error);
                Err(fault.error)
            }
            None => Ok(()),
        }
    }

    /// Byte range of an access, checked against granularity and bounds.
    fn span(&self, address: FlashAddress, len: usize, unit: u32) -> Result<(usize, usize), RamFlashError> {
        let start = address.value() as usize;
        if start % unit as usize != 0 || len % unit as usize != 0 {
            return Err(RamFlashError::NotAligned);
        }
        let end = start.checked_add(len).ok_or(RamFlashError::OutOfBounds)?;
        if end > self.data.len() {
            return Err(RamFlashError::OutOfBounds);
        }
        Ok((start, end))
    }
}

impl FlashDriver for RamFlash {
    type Error = RamFlashError;

    fn info(&self) -> FlashInfo {
        FlashInfo {
            capacity: self.data.len() as u64,
            read_size: self.read_size,
            program_size: self.program_size,
            erase_size: self.erase_size,
        }
    }

    fn read(&mut self, address: FlashAddress, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.stats.reads += 1;
        self.injected(Operation::Read)?;
        let (start, end) = self.span(address, buffer.len(), self.read_size)?;
        buffer.copy_from_slice(&self.data[start..end]);
        Ok(())
    }

    fn program(&mut self, address: FlashAddress, data: &[u8]) -> Result<(), Self::Error> {
        self.stats.programs += 1;
        self.injected(Operation::Program)?;
        let (start, end) = self.span(address, data.len(), self.program_size)?;
        for (cell, byte) in self.data[start..end].iter_mut().zip(data) {
            *cell &= *byte;
        }
        Ok(())
    }

    fn erase(&mut self, address: FlashAddress, length: u32) -> Result<(), Self::Error> {
        self.stats.erases += 1;
        self.injected(Operation::Erase)?;
        let (start, end) = self.span(address, length as usize, self.erase_size)?;

        let sectors = start / self.erase_size as usize..end / self.erase_size as usize;
        if let Some(limit) = self.endurance {
            if self.erase_counts[sectors.clone()].iter().any(|&n| n >= limit) {
                return Err(RamFlashError::WornOut);
            }
        }

        self.data[start..end].fill(ERASED);
        for count in &mut self.erase_counts[sectors] {
            *count += 1;
        }
        Ok(())
    }
}
