//! Device variant registry
//!
//! One static table maps every supported scooter model to its programming
//! parameters: flash layout, BLE memory map revision, bootloader selection
//! and stock firmware identifiers. Both programmers take all addresses and
//! register values from here; nothing is hard-coded at a call site.

use crate::error::{Error, Result};
use crate::fetch::BlobId;

/// Which MCU on the controller board is being programmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFamily {
    /// Motor controller, flashed directly through the probe.
    Drive,
    /// Radio MCU, programmed through the NVMC register protocol.
    Ble,
}

/// Silicon identity of the drive MCU.
///
/// Several scooter generations ship with clone silicon (GD32 on Xiaomi
/// boards, AT32 on Ninebot boards) that needs a matching bootloader build.
/// The override relabels which bootloader blob is selected; it never
/// changes any address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChipIdentity {
    /// Stock silicon, default bootloader.
    #[default]
    Standard,
    /// Clone silicon, alternate-vendor bootloader build.
    AlternateVendor,
}

/// Layout of one data-record template.
///
/// Field offsets are identical across templates; only the serial position
/// differs on the newer boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRecordTemplate {
    /// Template blob name under `data/`.
    pub name: &'static str,
    /// Total record length in bytes.
    pub len: usize,
    /// Offset of the zero-padded ASCII serial.
    pub serial_offset: usize,
    /// Reserved span for the serial, in bytes.
    pub serial_span: usize,
    /// Offset of the 32-bit little-endian odometer field (km x 1000).
    pub odometer_offset: usize,
    /// Offsets of the three byte-reversed UID words.
    pub uid_offsets: [usize; 3],
}

/// Standard data-record template.
pub const TEMPLATE_DEFAULT: DataRecordTemplate = DataRecordTemplate {
    name: "default",
    len: 0x200,
    serial_offset: 0x20,
    serial_span: 0x20,
    odometer_offset: 0x52,
    uid_offsets: [0x1B4, 0x1B8, 0x1BC],
};

/// Template for the 4 Pro generation: same fields, serial moved to 0xA8.
pub const TEMPLATE_4PRO: DataRecordTemplate = DataRecordTemplate {
    name: "4pro",
    len: 0x200,
    serial_offset: 0xA8,
    serial_span: 0x20,
    odometer_offset: 0x52,
    uid_offsets: [0x1B4, 0x1B8, 0x1BC],
};

/// BLE MCU memory map for one layout revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NvmcLayout {
    /// Destination of the main firmware image.
    pub firmware_addr: u32,
    /// Destination of the 24-byte name block.
    pub name_block_addr: u32,
    /// Destination of the bootloader stub.
    pub bootloader_stub_addr: u32,
    /// Value written to the UICR bootloader-address word.
    pub bootloader_word: u32,
}

/// Original BLE memory map.
pub const NVMC_LAYOUT_STANDARD: NvmcLayout = NvmcLayout {
    firmware_addr: 0x18000,
    name_block_addr: 0x3B400,
    bootloader_stub_addr: 0x3C000,
    bootloader_word: 0x0003_C000,
};

/// Revised (v2) BLE memory map used by the later Xiaomi boards.
pub const NVMC_LAYOUT_V2: NvmcLayout = NvmcLayout {
    firmware_addr: 0x1B000,
    name_block_addr: 0x3B800,
    bootloader_stub_addr: 0x3D000,
    bootloader_word: 0x0003_D000,
};

/// Drive-MCU data-record offset for the standard layout.
pub const DATA_OFFSET_STANDARD: u32 = 0xF800;
/// Drive-MCU data-record offset for the secondary-bootloader layout.
pub const DATA_OFFSET_SECONDARY: u32 = 0x1C000;

/// Programming parameters for one scooter model.
///
/// Profiles are immutable; `chip_identity` is the only field influenced by
/// the caller (through the override passed to [`profile_for`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Device id string, as selected by the operator.
    pub id: &'static str,
    /// Ninebot family: larger flash layout with the secondary bootloader.
    pub secondary_bootloader: bool,
    /// Revised BLE memory map.
    pub v2_data_layout: bool,
    /// Large data-record template (serial field relocated).
    pub large_data_template: bool,
    /// Resolved silicon identity for bootloader selection.
    pub chip_identity: ChipIdentity,
    /// Stock drive firmware path, if any exists for this model.
    pub drive_firmware: Option<&'static str>,
    /// Stock BLE firmware path, if any exists for this model.
    pub ble_firmware: Option<&'static str>,
}

impl DeviceProfile {
    /// Offset of the data record inside the composed drive flash image.
    pub fn data_record_offset(&self) -> u32 {
        if self.secondary_bootloader {
            DATA_OFFSET_SECONDARY
        } else {
            DATA_OFFSET_STANDARD
        }
    }

    /// The data-record template this model uses.
    pub fn data_template(&self) -> &'static DataRecordTemplate {
        if self.large_data_template {
            &TEMPLATE_4PRO
        } else {
            &TEMPLATE_DEFAULT
        }
    }

    /// BLE memory map for this model.
    pub fn nvmc_layout(&self) -> NvmcLayout {
        if self.v2_data_layout {
            NVMC_LAYOUT_V2
        } else {
            NVMC_LAYOUT_STANDARD
        }
    }

    /// Drive bootloader blob matching family and silicon identity.
    pub fn drive_bootloader(&self) -> BlobId {
        let name = match (self.secondary_bootloader, self.chip_identity) {
            (true, ChipIdentity::Standard) => "nb_DRV",
            (true, ChipIdentity::AlternateVendor) => "nb_DRV_AT32",
            (false, ChipIdentity::Standard) => "mi_DRV",
            (false, ChipIdentity::AlternateVendor) => "mi_DRV_GD32",
        };
        BlobId::DriveBootloader(name)
    }

    /// BLE base image (radio stack) for this model.
    pub fn ble_base_image(&self) -> BlobId {
        let name = if self.v2_data_layout {
            "mi_BLE_V2"
        } else if self.secondary_bootloader {
            "nb_BLE"
        } else {
            "mi_BLE"
        };
        BlobId::BleBaseImage(name)
    }

    /// BLE bootloader stub for this model's memory map.
    pub fn bootloader_stub(&self) -> BlobId {
        let name = if self.v2_data_layout {
            "boot-32k"
        } else {
            "boot-16k"
        };
        BlobId::BootloaderStub(name)
    }

    /// Data-record template blob for this model.
    pub fn data_template_blob(&self) -> BlobId {
        BlobId::DataTemplate(self.data_template().name)
    }

    /// Default BLE advertising name for this family.
    pub fn default_ble_name(&self) -> &'static str {
        if self.secondary_bootloader {
            "NBScooter0000"
        } else {
            "MIScooter0000"
        }
    }
}

struct ProfileEntry {
    id: &'static str,
    secondary_bootloader: bool,
    v2_data_layout: bool,
    large_data_template: bool,
    drive_firmware: Option<&'static str>,
    ble_firmware: Option<&'static str>,
}

macro_rules! entry {
    ($id:literal, nb: $nb:expr, v2: $v2:expr, large: $large:expr,
     drv: $drv:expr, ble: $ble:expr) => {
        ProfileEntry {
            id: $id,
            secondary_bootloader: $nb,
            v2_data_layout: $v2,
            large_data_template: $large,
            drive_firmware: $drv,
            ble_firmware: $ble,
        }
    };
}

#[rustfmt::skip]
static PROFILES: &[ProfileEntry] = &[
    // Ninebot family (secondary bootloader, large flash layout)
    entry!("esx",   nb: true,  v2: false, large: false, drv: Some("esx/DRV/1.6.4.bin"),            ble: Some("esx/BLE/1.1.0.bin")),
    entry!("max",   nb: true,  v2: false, large: false, drv: Some("max/DRV/1.6.13 (Compat).bin"),  ble: Some("max/BLE/1.1.7.bin")),
    entry!("g2",    nb: true,  v2: false, large: false, drv: Some("g2/DRV/1.7.0 (Compat).bin"),    ble: Some("g2/BLE/1.7.8.bin")),
    entry!("f",     nb: true,  v2: false, large: false, drv: Some("f/DRV/5.8.4 (Compat).bin"),     ble: Some("f/BLE/3.0.7.bin")),
    entry!("f2",    nb: true,  v2: false, large: false, drv: Some("f2/DRV/1.7.8 (Compat).bin"),    ble: Some("f2/BLE/5.6.6.bin")),
    entry!("e",     nb: true,  v2: false, large: false, drv: Some("e/DRV/2.7.1 (Compat).bin"),     ble: Some("e/BLE/2.1.3.bin")),
    entry!("4pro",  nb: true,  v2: false, large: true,  drv: Some("4pro/DRV/0.2.2 (Mod).bin"),     ble: Some("4pro/BLE/0.2.2 (Mod).bin")),
    // No stock firmware published for these two yet; an operator-supplied
    // image is required.
    entry!("g65",   nb: true,  v2: false, large: false, drv: None,                                 ble: None),
    entry!("e2pro", nb: true,  v2: false, large: false, drv: None,                                 ble: None),

    // Xiaomi family
    entry!("pro",   nb: false, v2: false, large: false, drv: Some("pro/DRV/1.7.1.bin"),            ble: Some("pro/BLE/0.9.0.bin")),
    entry!("pro2",  nb: false, v2: true,  large: false, drv: Some("pro2/DRV/2.5.2.bin"),           ble: Some("pro2/BLE/1.2.9.bin")),
    entry!("1s",    nb: false, v2: true,  large: false, drv: Some("1s/DRV/3.1.9 (Downgrade).bin"), ble: Some("1s/BLE/1.3.4.bin")),
    entry!("lite",  nb: false, v2: true,  large: false, drv: Some("lite/DRV/2.4.5 (Downgrade).bin"), ble: Some("lite/BLE/1.3.4.bin")),
    entry!("mi3",   nb: false, v2: true,  large: false, drv: Some("mi3/DRV/0.1.7.bin"),            ble: Some("mi3/BLE/1.5.2.bin")),
];

impl ProfileEntry {
    fn profile(&self, chip_identity: ChipIdentity) -> DeviceProfile {
        DeviceProfile {
            id: self.id,
            secondary_bootloader: self.secondary_bootloader,
            v2_data_layout: self.v2_data_layout,
            large_data_template: self.large_data_template,
            chip_identity,
            drive_firmware: self.drive_firmware,
            ble_firmware: self.ble_firmware,
        }
    }
}

/// Look up the profile for `device_id`, applying the silicon identity
/// override. Unknown ids are an error, never a default.
pub fn profile_for(device_id: &str, chip_identity: ChipIdentity) -> Result<DeviceProfile> {
    PROFILES
        .iter()
        .find(|e| e.id == device_id)
        .map(|e| e.profile(chip_identity))
        .ok_or_else(|| Error::UnknownDevice(device_id.to_string()))
}

/// All registered profiles with the standard silicon identity, for listing.
pub fn all_profiles() -> Vec<DeviceProfile> {
    PROFILES
        .iter()
        .map(|e| e.profile(ChipIdentity::Standard))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_device_is_an_error() {
        let err = profile_for("m365-turbo", ChipIdentity::Standard).unwrap_err();
        assert!(matches!(err, Error::UnknownDevice(id) if id == "m365-turbo"));
    }

    #[test]
    fn every_id_resolves_to_exactly_one_profile() {
        for profile in all_profiles() {
            let count = all_profiles().iter().filter(|p| p.id == profile.id).count();
            assert_eq!(count, 1, "duplicate profile for {}", profile.id);
        }
    }

    #[test]
    fn data_record_offset_follows_bootloader_layout() {
        let max = profile_for("max", ChipIdentity::Standard).unwrap();
        let pro = profile_for("pro", ChipIdentity::Standard).unwrap();
        assert_eq!(max.data_record_offset(), 0x1C000);
        assert_eq!(pro.data_record_offset(), 0xF800);
    }

    #[test]
    fn v2_models_use_revised_ble_layout() {
        let pro2 = profile_for("pro2", ChipIdentity::Standard).unwrap();
        let layout = pro2.nvmc_layout();
        assert_eq!(layout.firmware_addr, 0x1B000);
        assert_eq!(layout.name_block_addr, 0x3B800);
        assert_eq!(layout.bootloader_stub_addr, 0x3D000);
        assert_eq!(layout.bootloader_word, 0x0003_D000);
        assert_eq!(pro2.bootloader_stub(), BlobId::BootloaderStub("boot-32k"));

        let max = profile_for("max", ChipIdentity::Standard).unwrap();
        assert_eq!(max.nvmc_layout(), NVMC_LAYOUT_STANDARD);
        assert_eq!(max.bootloader_stub(), BlobId::BootloaderStub("boot-16k"));
    }

    #[test]
    fn chip_override_only_relabels_the_bootloader() {
        let std = profile_for("pro", ChipIdentity::Standard).unwrap();
        let alt = profile_for("pro", ChipIdentity::AlternateVendor).unwrap();
        assert_eq!(std.drive_bootloader(), BlobId::DriveBootloader("mi_DRV"));
        assert_eq!(
            alt.drive_bootloader(),
            BlobId::DriveBootloader("mi_DRV_GD32")
        );
        assert_eq!(std.data_record_offset(), alt.data_record_offset());
        assert_eq!(std.nvmc_layout(), alt.nvmc_layout());

        let nb = profile_for("max", ChipIdentity::AlternateVendor).unwrap();
        assert_eq!(nb.drive_bootloader(), BlobId::DriveBootloader("nb_DRV_AT32"));
    }

    #[test]
    fn base_image_selection_prefers_v2_over_family() {
        let pro2 = profile_for("pro2", ChipIdentity::Standard).unwrap();
        assert_eq!(pro2.ble_base_image(), BlobId::BleBaseImage("mi_BLE_V2"));
        let max = profile_for("max", ChipIdentity::Standard).unwrap();
        assert_eq!(max.ble_base_image(), BlobId::BleBaseImage("nb_BLE"));
        let pro = profile_for("pro", ChipIdentity::Standard).unwrap();
        assert_eq!(pro.ble_base_image(), BlobId::BleBaseImage("mi_BLE"));
    }

    #[test]
    fn large_template_moves_the_serial_field() {
        let fourpro = profile_for("4pro", ChipIdentity::Standard).unwrap();
        assert_eq!(fourpro.data_template().serial_offset, 0xA8);
        assert_eq!(fourpro.data_template().len, 0x200);
        let esx = profile_for("esx", ChipIdentity::Standard).unwrap();
        assert_eq!(esx.data_template().serial_offset, 0x20);
    }

    #[test]
    fn default_ble_name_carries_the_family_tag() {
        let max = profile_for("max", ChipIdentity::Standard).unwrap();
        assert_eq!(max.default_ble_name(), "NBScooter0000");
        let pro = profile_for("pro", ChipIdentity::Standard).unwrap();
        assert_eq!(pro.default_ble_name(), "MIScooter0000");
    }
}
