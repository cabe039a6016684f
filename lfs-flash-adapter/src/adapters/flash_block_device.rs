//! Block device adapter over a flash driver.
//!
//! Implements the filesystem's [`BlockDevice`] contract on top of the
//! [`FlashDriver`] port: translate `(block, offset)` to a flash address,
//! check the request against the geometry, call the driver, and map the
//! driver's result into the filesystem's error vocabulary.
//!
//! # Error mapping
//!
//! | Operation | Driver failure | Contract violation |
//! |-----------|----------------|--------------------|
//! | read      | `Invalid`      | `Invalid`          |
//! | program   | `Invalid`      | `Invalid`          |
//! | erase     | `Corrupt`      | `Invalid`          |
//! | sync      | never fails    |                    |
//!
//! Only a failed erase is reported as `Corrupt`, which is what makes the
//! filesystem retire the block. A failed program never is, even when it is
//! caused by wear: the driver's result does not say why it failed.

use lfs_block_device::{BlockDevice, Error, Geometry};

use super::error::AdapterError;
use crate::domain::{FlashAddress, FlashDriver, FlashInfo, physical_address};
use crate::fmt::Debug2Format;

/// Littlefs block device backed by a borrowed flash driver.
///
/// The adapter holds no state besides the geometry and the borrow: every
/// operation is one blocking driver call, with no caching and no retries.
///
/// # Type Parameters
///
/// - `D`: The flash driver (must implement [`FlashDriver`])
///
/// # Examples
///
/// ```ignore
/// use lfs_block_device::{BlockDevice, Geometry};
/// use lfs_flash_adapter::{FlashBlockDevice, NorFlashDriver};
///
/// let mut flash = NorFlashDriver::new(qspi_flash);
/// let mut device = FlashBlockDevice::new(&mut flash, Geometry::S25FL512S)?;
///
/// device.erase(5)?;
/// device.program(5, 0, &data)?;
/// ```
pub struct FlashBlockDevice<'a, D: ?Sized> {
    flash: &'a mut D,
    geometry: Geometry,
}

impl<'a, D: FlashDriver + ?Sized> FlashBlockDevice<'a, D> {
    /// Assemble a block device from a driver and a geometry.
    ///
    /// # Errors
    ///
    /// Fails if the geometry does not fit the part described by
    /// [`FlashDriver::info`]: too large, or read/program/erase units finer
    /// than the hardware supports. No flash operation is issued.
    pub fn new(flash: &'a mut D, geometry: Geometry) -> Result<Self, AdapterError> {
        let info = flash.info();
        check_fits(&geometry, &info).inspect_err(|e| {
            error!("Geometry rejected: {}", e);
        })?;

        debug!(
            "Flash block device: {} blocks of {} bytes, read {} program {}",
            geometry.block_count(),
            geometry.block_size(),
            geometry.read_alignment(),
            geometry.program_alignment()
        );

        Ok(Self { flash, geometry })
    }

    /// Get the geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Get a reference to the underlying driver.
    pub fn flash(&self) -> &D {
        &*self.flash
    }

    /// Get a mutable reference to the underlying driver.
    pub fn flash_mut(&mut self) -> &mut D {
        &mut *self.flash
    }

    /// Translate a request, rejecting anything outside one block.
    fn locate(&self, block: u32, offset: u32, len: usize) -> Result<FlashAddress, Error> {
        if !self.geometry.contains_block(block) {
            warn!(
                "Block {} out of range ({} blocks)",
                block,
                self.geometry.block_count()
            );
            return Err(Error::Invalid);
        }
        if !self.geometry.contains_range(offset, len) {
            warn!(
                "{} bytes at offset {} overrun block {}",
                len, offset, block
            );
            return Err(Error::Invalid);
        }
        Ok(physical_address(&self.geometry, block, offset))
    }
}

/// Check a geometry against the part it will run on.
fn check_fits(geometry: &Geometry, info: &FlashInfo) -> Result<(), AdapterError> {
    if geometry.capacity() > info.capacity {
        return Err(AdapterError::CapacityExceeded {
            required: geometry.capacity(),
            available: info.capacity,
        });
    }
    if geometry.read_alignment() % info.read_size.max(1) != 0 {
        return Err(AdapterError::ReadGranularity {
            alignment: geometry.read_alignment(),
            read_size: info.read_size,
        });
    }
    if geometry.program_alignment() % info.program_size.max(1) != 0 {
        return Err(AdapterError::ProgramGranularity {
            alignment: geometry.program_alignment(),
            program_size: info.program_size,
        });
    }
    if geometry.block_size() % info.erase_size.max(1) != 0 {
        return Err(AdapterError::EraseGranularity {
            block_size: geometry.block_size(),
            erase_size: info.erase_size,
        });
    }
    Ok(())
}

impl<D: FlashDriver + ?Sized> BlockDevice for FlashBlockDevice<'_, D> {
    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn read(&mut self, block: u32, offset: u32, buffer: &mut [u8]) -> Result<(), Error> {
        let address = self.locate(block, offset, buffer.len())?;
        if buffer.is_empty() {
            return Ok(());
        }

        trace!(
            "read block {} offset {} len {} at {}",
            block,
            offset,
            buffer.len(),
            address
        );

        self.flash.read(address, buffer).map_err(|e| {
            warn!(
                "Flash read failed: block {} at {}: {}",
                block,
                address,
                Debug2Format(&e)
            );
            Error::Invalid
        })
    }

    fn program(&mut self, block: u32, offset: u32, data: &[u8]) -> Result<(), Error> {
        let address = self.locate(block, offset, data.len())?;

        let alignment = self.geometry.program_alignment();
        if offset % alignment != 0 || data.len() % alignment as usize != 0 {
            warn!(
                "Unaligned program: offset {} len {} (alignment {})",
                offset,
                data.len(),
                alignment
            );
            return Err(Error::Invalid);
        }
        if data.is_empty() {
            return Ok(());
        }

        trace!(
            "program block {} offset {} len {} at {}",
            block,
            offset,
            data.len(),
            address
        );

        self.flash.program(address, data).map_err(|e| {
            warn!(
                "Flash program failed: block {} at {}: {}",
                block,
                address,
                Debug2Format(&e)
            );
            Error::Invalid
        })
    }

    fn erase(&mut self, block: u32) -> Result<(), Error> {
        let address = self.locate(block, 0, 0)?;
        let length = self.geometry.block_size();

        trace!("erase block {} at {} len {}", block, address, length);

        self.flash.erase(address, length).map_err(|e| {
            warn!(
                "Flash erase failed: block {} at {}: {}, reporting corrupt",
                block,
                address,
                Debug2Format(&e)
            );
            Error::Corrupt
        })
    }

    fn sync(&mut self) -> Result<(), Error> {
        // Every driver call has already completed; nothing is buffered here.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_SIZE: usize = 256;
    const BLOCKS: usize = 8;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum MockError {
        Timeout,
        Bus,
    }

    /// Driver that records every call and fails on demand.
    struct MockFlash {
        data: Vec<u8>,
        calls: Vec<(&'static str, u32, usize)>,
        fail_with: Option<MockError>,
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                data: vec![0xFF; BLOCK_SIZE * BLOCKS],
                calls: Vec::new(),
                fail_with: None,
            }
        }

        fn check(&self) -> Result<(), MockError> {
            match self.fail_with {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    impl FlashDriver for MockFlash {
        type Error = MockError;

        fn info(&self) -> FlashInfo {
            FlashInfo {
                capacity: self.data.len() as u64,
                read_size: 1,
                program_size: 4,
                erase_size: 128,
            }
        }

        fn read(&mut self, address: FlashAddress, buffer: &mut [u8]) -> Result<(), MockError> {
            self.calls.push(("read", address.value(), buffer.len()));
            self.check()?;
            let start = address.value() as usize;
            buffer.copy_from_slice(&self.data[start..start + buffer.len()]);
            Ok(())
        }

        fn program(&mut self, address: FlashAddress, data: &[u8]) -> Result<(), MockError> {
            self.calls.push(("program", address.value(), data.len()));
            self.check()?;
            let start = address.value() as usize;
            for (dst, src) in self.data[start..start + data.len()].iter_mut().zip(data) {
                *dst &= *src;
            }
            Ok(())
        }

        fn erase(&mut self, address: FlashAddress, length: u32) -> Result<(), MockError> {
            self.calls.push(("erase", address.value(), length as usize));
            self.check()?;
            let start = address.value() as usize;
            self.data[start..start + length as usize].fill(0xFF);
            Ok(())
        }
    }

    fn geometry() -> Geometry {
        Geometry::builder()
            .read_alignment(4)
            .program_alignment(16)
            .block_size(BLOCK_SIZE as u32)
            .block_count(BLOCKS as u32)
            .lookahead_size(8)
            .build()
            .unwrap()
    }

    #[test]
    fn test_round_trip() {
        let mut flash = MockFlash::new();
        let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

        device.erase(3).unwrap();
        device.program(3, 16, &[0x5A; 16]).unwrap();

        let mut buf = [0u8; 16];
        device.read(3, 16, &mut buf).unwrap();
        assert_eq!(buf, [0x5A; 16]);

        assert_eq!(
            flash.calls,
            vec![
                ("erase", 768, BLOCK_SIZE),
                ("program", 784, 16),
                ("read", 784, 16)
            ]
        );
    }

    #[test]
    fn test_unaligned_read_allowed() {
        let mut flash = MockFlash::new();
        let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

        let mut buf = [0u8; 3];
        device.read(1, 5, &mut buf).unwrap();
        assert_eq!(buf, [0xFF; 3]);
        assert_eq!(flash.calls, vec![("read", 261, 3)]);
    }

    #[test]
    fn test_read_failure_is_invalid() {
        let mut flash = MockFlash::new();
        flash.fail_with = Some(MockError::Bus);
        let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(device.read(0, 0, &mut buf), Err(Error::Invalid));
    }

    #[test]
    fn test_program_failure_is_invalid() {
        for cause in [MockError::Timeout, MockError::Bus] {
            let mut flash = MockFlash::new();
            flash.fail_with = Some(cause);
            let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

            assert_eq!(device.program(2, 0, &[0; 16]), Err(Error::Invalid));
        }
    }

    #[test]
    fn test_erase_failure_is_corrupt() {
        for cause in [MockError::Timeout, MockError::Bus] {
            let mut flash = MockFlash::new();
            flash.fail_with = Some(cause);
            let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

            assert_eq!(device.erase(5), Err(Error::Corrupt));
            assert_eq!(flash.calls, vec![("erase", 5 * BLOCK_SIZE as u32, BLOCK_SIZE)]);
        }
    }

    #[test]
    fn test_sync_touches_nothing() {
        let mut flash = MockFlash::new();
        flash.fail_with = Some(MockError::Bus);
        let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

        assert_eq!(device.sync(), Ok(()));
        assert!(flash.calls.is_empty());
    }

    #[test]
    fn test_out_of_range_rejected_without_io() {
        let mut flash = MockFlash::new();
        let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(device.read(BLOCKS as u32, 0, &mut buf), Err(Error::Invalid));
        assert_eq!(device.read(0, 248, &mut buf), Err(Error::Invalid));
        assert_eq!(device.read(0, u32::MAX, &mut buf), Err(Error::Invalid));
        assert_eq!(device.program(BLOCKS as u32, 0, &buf), Err(Error::Invalid));
        assert_eq!(device.program(0, 256, &buf), Err(Error::Invalid));
        assert_eq!(device.erase(BLOCKS as u32), Err(Error::Invalid));
        assert_eq!(device.erase(u32::MAX), Err(Error::Invalid));

        assert!(flash.calls.is_empty());
    }

    #[test]
    fn test_unaligned_program_rejected_without_io() {
        let mut flash = MockFlash::new();
        let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

        assert_eq!(device.program(0, 8, &[0; 16]), Err(Error::Invalid));
        assert_eq!(device.program(0, 0, &[0; 12]), Err(Error::Invalid));
        assert!(flash.calls.is_empty());
    }

    #[test]
    fn test_empty_transfers_skip_driver() {
        let mut flash = MockFlash::new();
        let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

        assert_eq!(device.read(0, 0, &mut []), Ok(()));
        assert_eq!(device.program(0, 0, &[]), Ok(()));
        assert!(flash.calls.is_empty());
    }

    #[test]
    fn test_geometry_checked_against_part() {
        let mut flash = MockFlash::new();

        let too_big = Geometry::builder()
            .block_size(BLOCK_SIZE as u32)
            .block_count(BLOCKS as u32 + 1)
            .lookahead_size(8)
            .build()
            .unwrap();
        assert_eq!(
            FlashBlockDevice::new(&mut flash, too_big).err(),
            Some(AdapterError::CapacityExceeded {
                required: (BLOCK_SIZE * (BLOCKS + 1)) as u64,
                available: (BLOCK_SIZE * BLOCKS) as u64,
            })
        );

        let fine_program = Geometry::builder()
            .program_alignment(2)
            .block_size(BLOCK_SIZE as u32)
            .block_count(BLOCKS as u32)
            .lookahead_size(8)
            .build()
            .unwrap();
        assert!(matches!(
            FlashBlockDevice::new(&mut flash, fine_program).err(),
            Some(AdapterError::ProgramGranularity { .. })
        ));

        let small_blocks = Geometry::builder()
            .program_alignment(16)
            .block_size(64)
            .block_count(BLOCKS as u32)
            .lookahead_size(8)
            .build()
            .unwrap();
        assert!(matches!(
            FlashBlockDevice::new(&mut flash, small_blocks).err(),
            Some(AdapterError::EraseGranularity { .. })
        ));

        assert!(flash.calls.is_empty());
    }

    #[test]
    fn test_driver_reachable_through_device() {
        let mut flash = MockFlash::new();
        let mut device = FlashBlockDevice::new(&mut flash, geometry()).unwrap();

        device.erase(1).unwrap();
        device.flash_mut().fail_with = Some(MockError::Timeout);
        assert_eq!(device.erase(1), Err(Error::Corrupt));

        device.flash_mut().fail_with = None;
        assert_eq!(device.erase(1), Ok(()));
        assert_eq!(device.flash().calls.len(), 3);
    }

    #[test]
    fn test_used_through_trait_object_driver() {
        let mut flash = MockFlash::new();
        let driver: &mut dyn FlashDriver<Error = MockError> = &mut flash;
        let mut device = FlashBlockDevice::new(driver, geometry()).unwrap();

        device.erase(0).unwrap();
        assert_eq!(device.geometry().block_count(), BLOCKS as u32);
        assert_eq!(device.flash().info().erase_size, 128);
    }
}
