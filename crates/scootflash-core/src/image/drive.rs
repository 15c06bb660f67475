//! Drive-MCU flash image
//!
//! One contiguous buffer written to the flash base in a single probe
//! operation: bootloader at 0, driver firmware at 0x1000, data record at
//! the profile's data offset. Layout violations are rejected before any
//! output is allocated.

use crate::error::{Error, Result};
use crate::image::record::DataRecord;
use crate::registry::DeviceProfile;

/// Offset of the driver firmware inside the composed image.
pub const DRIVER_OFFSET: usize = 0x1000;

/// A composed full flash image for the drive MCU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashImage {
    bytes: Vec<u8>,
    data_offset: u32,
}

impl FlashImage {
    /// Image contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Image length: always `data_offset + record length`.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the image is empty (never true for composed images).
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Offset of the data record inside the image.
    pub fn data_offset(&self) -> u32 {
        self.data_offset
    }
}

/// Compose the drive-MCU flash image.
///
/// Fails with [`Error::LayoutOverflow`] if the bootloader spills into the
/// driver slot or the driver spills into the data region; no partial image
/// is produced in that case.
pub fn build_flash_image(
    profile: &DeviceProfile,
    bootloader: &[u8],
    driver: &[u8],
    record: &DataRecord,
) -> Result<FlashImage> {
    let data_offset = profile.data_record_offset() as usize;

    if bootloader.len() > DRIVER_OFFSET {
        return Err(Error::LayoutOverflow {
            what: "bootloader",
            len: bootloader.len(),
            max: DRIVER_OFFSET,
        });
    }
    if driver.len() > data_offset - DRIVER_OFFSET {
        return Err(Error::LayoutOverflow {
            what: "driver firmware",
            len: driver.len(),
            max: data_offset - DRIVER_OFFSET,
        });
    }

    let mut bytes = vec![0u8; data_offset + record.len()];
    bytes[..bootloader.len()].copy_from_slice(bootloader);
    bytes[DRIVER_OFFSET..DRIVER_OFFSET + driver.len()].copy_from_slice(driver);
    bytes[data_offset..].copy_from_slice(record.as_bytes());

    Ok(FlashImage {
        bytes,
        data_offset: data_offset as u32,
    })
}
