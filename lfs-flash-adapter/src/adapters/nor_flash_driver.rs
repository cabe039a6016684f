//! NOR flash driver backend for embedded-storage traits
//!
//! This module wraps any blocking `embedded-storage` NOR flash and exposes
//! it through the [`FlashDriver`] port, so QSPI/SPI serial NOR drivers,
//! MCU internal flash and anything else implementing
//! [`NorFlash`](embedded_storage::nor_flash::NorFlash) can back a
//! filesystem.
//!
//! # Example
//!
//! ```ignore
//! use lfs_block_device::Geometry;
//! use lfs_flash_adapter::{FlashBlockDevice, NorFlashDriver};
//!
//! let qspi = MyQspiFlash::new(bus);
//! let mut flash = NorFlashDriver::new(qspi);
//! let device = FlashBlockDevice::new(&mut flash, Geometry::S25FL512S)?;
//! ```

use embedded_storage::nor_flash::{NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash};

use super::window::Window;
use crate::domain::{FlashAddress, FlashDriver, FlashInfo};

/// [`FlashDriver`] backed by an `embedded-storage` NOR flash.
///
/// Addresses are relative to `base`, so the filesystem can live in a
/// window of the part (for example after the firmware image) while still
/// seeing a flat address space starting at zero.
///
/// Driver errors are reported as their [`NorFlashErrorKind`].
pub struct NorFlashDriver<F> {
    flash: F,
    window: Window,
}

impl<F: NorFlash> NorFlashDriver<F> {
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

    /// Get a mutable reference to the wrapped flash.
    pub fn inner_mut(&mut self) -> &mut F {
        &mut self.flash
    }

    /// Consume the driver and return the wrapped flash.
    pub fn into_inner(self) -> F {
        self.flash
    }
}

impl<F: NorFlash> FlashDriver for NorFlashDriver<F> {
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
        self.flash.read(offset, buffer).map_err(|e| e.kind())
    }

    fn program(&mut self, address: FlashAddress, data: &[u8]) -> Result<(), Self::Error> {
        let offset = self
            .window
            .absolute(address)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        self.flash.write(offset, data).map_err(|e| e.kind())
    }

    fn erase(&mut self, address: FlashAddress, length: u32) -> Result<(), Self::Error> {
        let (from, to) = self
            .window
            .range(address, length)
            .ok_or(NorFlashErrorKind::OutOfBounds)?;
        self.flash.erase(from, to).map_err(|e| e.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_storage::nor_flash::ErrorType;
    use lfs_block_device::{BlockDevice, Error, Geometry, GeometryError};

    use crate::adapters::FlashBlockDevice;

    const SECTOR: usize = 4096;
    const SECTORS: usize = 16;

    /// Mock NOR flash for testing
    struct MockFlash {
        data: Vec<u8>,
        erase_ranges: Vec<(u32, u32)>,
        broken: bool,
    }

    impl MockFlash {
        fn new() -> Self {
            Self {
                data: vec![0xFF; SECTOR * SECTORS],
                erase_ranges: Vec::new(),
                broken: false,
            }
        }
    }

    #[derive(Debug)]
    enum MockFlashError {
        OutOfBounds,
        Broken,
    }

    impl NorFlashError for MockFlashError {
        fn kind(&self) -> NorFlashErrorKind {
            match self {
                MockFlashError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
                MockFlashError::Broken => NorFlashErrorKind::Other,
            }
        }
    }

    impl ErrorType for MockFlash {
        type Error = MockFlashError;
    }

    impl ReadNorFlash for MockFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            let end = start + bytes.len();
            if end > self.data.len() {
                return Err(MockFlashError::OutOfBounds);
            }
            bytes.copy_from_slice(&self.data[start..end]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.data.len()
        }
    }

    impl NorFlash for MockFlash {
        const WRITE_SIZE: usize = 4;
        const ERASE_SIZE: usize = SECTOR;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            self.erase_ranges.push((from, to));
            if self.broken {
                return Err(MockFlashError::Broken);
            }
            if to as usize > self.data.len() {
                return Err(MockFlashError::OutOfBounds);
            }
            self.data[from as usize..to as usize].fill(0xFF);
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            if self.broken {
                return Err(MockFlashError::Broken);
            }
            let start = offset as usize;
            let end = start + bytes.len();
            if end > self.data.len() {
                return Err(MockFlashError::OutOfBounds);
            }
            for (dst, src) in self.data[start..end].iter_mut().zip(bytes) {
                *dst &= *src;
            }
            Ok(())
        }
    }

    fn geometry(block_count: u32) -> Geometry {
        Geometry::builder()
            .read_alignment(4)
            .program_alignment(4)
            .block_size(SECTOR as u32)
            .block_count(block_count)
            .build()
            .unwrap()
    }

    #[test]
    fn test_info_from_traits() {
        let driver = NorFlashDriver::new(MockFlash::new());
        assert_eq!(
            driver.info(),
            FlashInfo {
                capacity: (SECTOR * SECTORS) as u64,
                read_size: 1,
                program_size: 4,
                erase_size: SECTOR as u32,
            }
        );

        let windowed = NorFlashDriver::with_base(MockFlash::new(), 4 * SECTOR as u32);
        assert_eq!(windowed.info().capacity, (12 * SECTOR) as u64);
    }

    #[test]
    fn test_block_device_round_trip() {
        let mut driver = NorFlashDriver::new(MockFlash::new());
        let mut device = FlashBlockDevice::new(&mut driver, geometry(16)).unwrap();

        device.erase(1).unwrap();
        device.program(1, 8, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();

        let mut buf = [0u8; 8];
        device.read(1, 8, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);

        let flash = driver.into_inner();
        assert_eq!(flash.erase_ranges, vec![(4096, 8192)]);
        assert_eq!(&flash.data[4096 + 8..4096 + 16], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_base_offset_applied() {
        let base = 8 * SECTOR as u32;
        let mut driver = NorFlashDriver::with_base(MockFlash::new(), base);
        let mut device = FlashBlockDevice::new(&mut driver, geometry(8)).unwrap();

        device.erase(0).unwrap();
        device.program(0, 0, &[0xAB; 4]).unwrap();

        assert_eq!(driver.base(), base);
        assert_eq!(driver.inner().erase_ranges, vec![(base, base + SECTOR as u32)]);
        assert_eq!(&driver.inner().data[base as usize..base as usize + 4], &[0xAB; 4]);
    }

    #[test]
    fn test_window_limits_geometry() {
        let mut driver = NorFlashDriver::with_base(MockFlash::new(), 8 * SECTOR as u32);
        assert!(FlashBlockDevice::new(&mut driver, geometry(9)).is_err());
    }

    #[test]
    fn test_failures_mapped() {
        let mut driver = NorFlashDriver::new(MockFlash::new());
        driver.inner_mut().broken = true;
        let mut device = FlashBlockDevice::new(&mut driver, geometry(16)).unwrap();

        assert_eq!(device.erase(5), Err(Error::Corrupt));
        assert_eq!(device.program(5, 0, &[0; 4]), Err(Error::Invalid));
    }

    #[test]
    fn test_driver_reports_kind() {
        let mut driver = NorFlashDriver::new(MockFlash::new());
        let mut buf = [0u8; 8];
        assert_eq!(
            driver.read(FlashAddress::new((SECTOR * SECTORS) as u32), &mut buf),
            Err(NorFlashErrorKind::OutOfBounds)
        );
        assert_eq!(
            driver.erase(FlashAddress::new(u32::MAX), SECTOR as u32),
            Err(NorFlashErrorKind::OutOfBounds)
        );
    }

    /// A 4 GiB part that only records erases.
    #[cfg(target_pointer_width = "64")]
    struct FullSpaceFlash {
        erases: Vec<(u32, u32)>,
    }

    #[cfg(target_pointer_width = "64")]
    impl ErrorType for FullSpaceFlash {
        type Error = MockFlashError;
    }

    #[cfg(target_pointer_width = "64")]
    impl ReadNorFlash for FullSpaceFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, _offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            bytes.fill(0xFF);
            Ok(())
        }

        fn capacity(&self) -> usize {
            1 << 32
        }
    }

    #[cfg(target_pointer_width = "64")]
    impl NorFlash for FullSpaceFlash {
        const WRITE_SIZE: usize = 1;
        const ERASE_SIZE: usize = 65536;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            self.erases.push((from, to));
            Ok(())
        }

        fn write(&mut self, _offset: u32, _bytes: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_largest_geometry_fits_4_gib_part() {
        let mut driver = NorFlashDriver::new(FullSpaceFlash { erases: Vec::new() });
        assert_eq!(driver.info().capacity, 1 << 32);

        let whole = Geometry::builder().block_size(65536).block_count(65536).build();
        assert!(matches!(whole, Err(GeometryError::CapacityOverflow { .. })));

        let geometry = Geometry::builder()
            .block_size(65536)
            .block_count(65535)
            .build()
            .unwrap();
        let mut device = FlashBlockDevice::new(&mut driver, geometry).unwrap();
        device.erase(65534).unwrap();
        assert_eq!(device.erase(65535), Err(Error::Invalid));

        assert_eq!(driver.inner().erases, vec![(0xFFFE_0000, 0xFFFF_0000)]);
    }

    #[test]
    #[should_panic(expected = "aligned to the erase size")]
    fn test_unaligned_base() {
        let _ = NorFlashDriver::with_base(MockFlash::new(), 0x100);
    }
}
