//! BLE-MCU write set
//!
//! The BLE MCU has no flash-write-to-address primitive; everything goes
//! through NVMC-mediated memory writes. This module assembles the ordered
//! list of (address, buffer) pairs for one flashing session and validates
//! word alignment up front, before the programmer issues anything.

use crate::error::{Error, Result};
use crate::registry::DeviceProfile;

/// Length of the advertising-name block.
pub const NAME_BLOCK_LEN: usize = 24;

/// Magic header of the name block.
const NAME_BLOCK_MAGIC: [u8; 2] = [0x55, 0xAA];

/// Offset of the name field inside the block.
const NAME_FIELD_OFFSET: usize = 8;

/// Length of the name field.
const NAME_FIELD_LEN: usize = 13;

/// What a write in the set carries; the programmer maps this to its
/// progress stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvmcWriteKind {
    /// Advertising-name block.
    NameBlock,
    /// Radio stack flashed at address 0.
    BaseImage,
    /// Main firmware image.
    Firmware,
    /// Bootloader stub.
    BootloaderStub,
}

/// One destination-addressed buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NvmcWrite {
    /// Destination address in BLE flash.
    pub addr: u32,
    /// Word-aligned payload.
    pub data: Vec<u8>,
    /// Payload classification.
    pub kind: NvmcWriteKind,
}

/// Ordered write set plus the UICR bootloader-address word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NvmcWriteSet {
    /// Value for the UICR bootloader-address word.
    pub bootloader_word: u32,
    writes: Vec<NvmcWrite>,
}

impl NvmcWriteSet {
    /// The writes, in issue order.
    pub fn writes(&self) -> &[NvmcWrite] {
        &self.writes
    }

    /// Total payload bytes across all writes.
    pub fn total_bytes(&self) -> usize {
        self.writes.iter().map(|w| w.data.len()).sum()
    }
}

/// Build the 24-byte advertising-name block.
///
/// Layout: `55 AA`, six zero bytes, 13-byte name field, zero padding. An
/// empty `device_name` falls back to the family default; a non-empty name
/// is truncated to the field length, never rejected.
pub fn build_name_block(profile: &DeviceProfile, device_name: &str) -> Vec<u8> {
    let mut block = vec![0u8; NAME_BLOCK_LEN];
    block[..2].copy_from_slice(&NAME_BLOCK_MAGIC);

    let name = if device_name.is_empty() {
        profile.default_ble_name()
    } else {
        device_name
    };
    let name = &name.as_bytes()[..name.len().min(NAME_FIELD_LEN)];
    block[NAME_FIELD_OFFSET..NAME_FIELD_OFFSET + name.len()].copy_from_slice(name);

    block
}

fn check_aligned(what: &'static str, data: &[u8]) -> Result<()> {
    if data.len() % 4 != 0 {
        return Err(Error::Misaligned {
            what,
            len: data.len(),
        });
    }
    Ok(())
}

/// Assemble the write set for one BLE flashing session.
///
/// Addresses and the UICR word come from the profile's NVMC layout. Every
/// buffer must be word-aligned; a misaligned buffer fails the whole build
/// before a single write is issued.
pub fn build_nvmc_write_set(
    profile: &DeviceProfile,
    base_image: &[u8],
    main_fw: &[u8],
    bootloader_stub: &[u8],
    device_name: &str,
) -> Result<NvmcWriteSet> {
    check_aligned("BLE base image", base_image)?;
    check_aligned("BLE firmware", main_fw)?;
    check_aligned("bootloader stub", bootloader_stub)?;

    let layout = profile.nvmc_layout();
    let writes = vec![
        NvmcWrite {
            addr: layout.name_block_addr,
            data: build_name_block(profile, device_name),
            kind: NvmcWriteKind::NameBlock,
        },
        NvmcWrite {
            addr: 0,
            data: base_image.to_vec(),
            kind: NvmcWriteKind::BaseImage,
        },
        NvmcWrite {
            addr: layout.firmware_addr,
            data: main_fw.to_vec(),
            kind: NvmcWriteKind::Firmware,
        },
        NvmcWrite {
            addr: layout.bootloader_stub_addr,
            data: bootloader_stub.to_vec(),
            kind: NvmcWriteKind::BootloaderStub,
        },
    ];

    Ok(NvmcWriteSet {
        bootloader_word: layout.bootloader_word,
        writes,
    })
}
