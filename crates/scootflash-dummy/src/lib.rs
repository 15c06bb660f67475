//! scootflash-dummy - In-memory scooter controller emulator
//!
//! This crate provides a dummy probe that emulates both target MCUs in
//! memory: drive flash behind the probe's flash loader, BLE flash behind
//! the NVMC register protocol, a UID region and the UICR. It's useful for
//! testing and development without real hardware, and for dry-running a
//! full flashing session.

use scootflash_core::probe::{DebugProbe, ProbeError, ProbeResult};
use scootflash_core::program::nvmc::{
    CONFIG_EEN, CONFIG_WEN, ERASEALL_START, NVMC_CONFIG, NVMC_ERASEALL, NVMC_READY, READY_VALUE,
    UICR_BOOTLOADER_ADDR,
};
use scootflash_core::program::swd::{UID_ADDR, UID_LEN};

/// BLE flash size emulated by the dummy (256 KiB, nRF51-class).
pub const BLE_FLASH_SIZE: usize = 256 * 1024;

/// Configuration for the dummy controller.
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// 96-bit UID returned from the UID region.
    pub uid: [u8; UID_LEN],
    /// Whether read protection is set (removal then succeeds).
    pub read_protected: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            uid: [
                0x78, 0x56, 0x34, 0x12, 0xF0, 0xDE, 0xBC, 0x9A, 0x21, 0x43, 0x65, 0x87,
            ],
            read_protected: true,
        }
    }
}

/// Dummy probe emulating one scooter controller board.
pub struct DummyProbe {
    config: DummyConfig,
    attached: bool,
    ble_flash: Vec<u8>,
    nvmc_config: u32,
    uicr_word: Option<[u8; 4]>,
    drive_image: Option<(u32, Vec<u8>)>,
    resets: Vec<bool>,
}

impl DummyProbe {
    /// Create a dummy controller with the given configuration.
    pub fn new(config: DummyConfig) -> Self {
        Self {
            config,
            attached: false,
            ble_flash: vec![0x00; BLE_FLASH_SIZE],
            nvmc_config: 0,
            uicr_word: None,
            drive_image: None,
            resets: Vec::new(),
        }
    }

    /// Create a dummy controller with the default configuration.
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Image handed to the flash loader, if a drive session ran.
    pub fn drive_image(&self) -> Option<(u32, &[u8])> {
        self.drive_image
            .as_ref()
            .map(|(base, data)| (*base, data.as_slice()))
    }

    /// A slice of emulated BLE flash.
    pub fn ble_flash(&self, addr: u32, len: usize) -> &[u8] {
        &self.ble_flash[addr as usize..addr as usize + len]
    }

    /// UICR bootloader word written during a BLE session.
    pub fn uicr_word(&self) -> Option<u32> {
        self.uicr_word.map(u32::from_le_bytes)
    }

    /// Reset pulses issued so far (true = halted).
    pub fn resets(&self) -> &[bool] {
        &self.resets
    }

    fn require_attached(&self) -> ProbeResult<()> {
        if self.attached {
            Ok(())
        } else {
            Err(ProbeError::NotAttached)
        }
    }
}

impl DebugProbe for DummyProbe {
    fn attach(&mut self) -> ProbeResult<()> {
        self.attached = true;
        Ok(())
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn reset(&mut self, halt: bool) -> ProbeResult<()> {
        self.require_attached()?;
        self.resets.push(halt);
        Ok(())
    }

    fn read_memory(&mut self, addr: u32, len: usize) -> ProbeResult<Vec<u8>> {
        self.require_attached()?;
        if addr == UID_ADDR && len == UID_LEN {
            return Ok(self.config.uid.to_vec());
        }
        let start = addr as usize;
        match self.ble_flash.get(start..start + len) {
            Some(slice) => Ok(slice.to_vec()),
            None => Err(ProbeError::Transport(format!(
                "read outside emulated memory at {addr:#010x}"
            ))),
        }
    }

    fn write_memory(&mut self, addr: u32, data: &[u8]) -> ProbeResult<()> {
        self.require_attached()?;
        if addr == UICR_BOOTLOADER_ADDR {
            let word: [u8; 4] = data
                .try_into()
                .map_err(|_| ProbeError::Transport("UICR write must be one word".into()))?;
            self.uicr_word = Some(word);
            return Ok(());
        }
        if self.nvmc_config != CONFIG_WEN {
            return Err(ProbeError::Transport(
                "NVMC write while writes are not enabled".into(),
            ));
        }
        let start = addr as usize;
        match self.ble_flash.get_mut(start..start + data.len()) {
            Some(slice) => {
                slice.copy_from_slice(data);
                Ok(())
            }
            None => Err(ProbeError::Transport(format!(
                "write outside emulated flash at {addr:#010x}"
            ))),
        }
    }

    fn read_register32(&mut self, addr: u32) -> ProbeResult<u32> {
        self.require_attached()?;
        match addr {
            NVMC_READY => Ok(READY_VALUE),
            NVMC_CONFIG => Ok(self.nvmc_config),
            _ => Ok(0),
        }
    }

    fn write_register32(&mut self, addr: u32, value: u32) -> ProbeResult<()> {
        self.require_attached()?;
        match addr {
            NVMC_CONFIG => {
                self.nvmc_config = value;
                Ok(())
            }
            NVMC_ERASEALL => {
                if value == ERASEALL_START && self.nvmc_config == CONFIG_EEN {
                    self.ble_flash.fill(0xFF);
                    Ok(())
                } else {
                    Err(ProbeError::Transport(
                        "erase-all without erase enable".into(),
                    ))
                }
            }
            _ => Ok(()),
        }
    }

    fn flash_write(&mut self, base: u32, data: &[u8]) -> ProbeResult<()> {
        self.require_attached()?;
        self.drive_image = Some((base, data.to_vec()));
        Ok(())
    }

    fn remove_read_protection(&mut self) -> ProbeResult<()> {
        self.require_attached()?;
        if self.config.read_protected {
            self.config.read_protected = false;
            Ok(())
        } else {
            // Mirrors real targets: lifting protection that isn't set
            // reports an error the session treats as a warning.
            Err(ProbeError::ProtectionRemoval)
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        log::debug!("dummy probe: skipping {ms} ms settle delay");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scootflash_core::error::Result;
    use scootflash_core::fetch::{BlobId, BlobSource};
    use scootflash_core::progress::NoProgress;
    use scootflash_core::registry::TargetFamily;
    use scootflash_core::session::{run_session, FlashRequest};

    struct TestBlobs;

    impl BlobSource for TestBlobs {
        fn fetch(&self, id: &BlobId) -> Result<Vec<u8>> {
            match id {
                BlobId::DriveBootloader(_) => Ok(vec![0xB0; 0x800]),
                BlobId::DriveFirmware(_) => Ok(vec![0xD0; 0x4000]),
                BlobId::DataTemplate(_) => Ok(vec![0x00; 0x200]),
                BlobId::BleBaseImage(_) => Ok(vec![0xA0; 0x1000]),
                BlobId::BleFirmware(_) => Ok(vec![0xF0; 0x800]),
                BlobId::BootloaderStub(_) => Ok(vec![0x50; 0x400]),
            }
        }
    }

    #[test]
    fn drive_session_composes_the_expected_image() {
        let mut probe = DummyProbe::new_default();
        let mut request = FlashRequest::new("pro", TargetFamily::Drive);
        request.serial = "12345/000000001".into();
        request.odometer_km = 12.0;
        let result = run_session(&mut probe, &TestBlobs, &request, &mut NoProgress);
        assert!(result.ok, "unexpected failure: {:?}", result.error);

        let (base, image) = probe.drive_image().expect("image was flashed");
        assert_eq!(base, 0x0800_0000);
        assert_eq!(image.len(), 0xF800 + 0x200);
        assert_eq!(&image[..4], &[0xB0; 4]);
        assert_eq!(&image[0x1000..0x1004], &[0xD0; 4]);
        // Data record: UID word 0 (0x12345678) stored byte-reversed.
        assert_eq!(&image[0xF800 + 0x1B4..0xF800 + 0x1B8], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(&image[0xF800 + 0x20..0xF800 + 0x2F], b"12345/000000001");
        assert_eq!(&image[0xF800 + 0x52..0xF800 + 0x56], &[0xE0, 0x2E, 0x00, 0x00]);
    }

    #[test]
    fn unprotected_target_yields_a_warning_but_succeeds() {
        let mut probe = DummyProbe::new(DummyConfig {
            read_protected: false,
            ..DummyConfig::default()
        });
        let mut request = FlashRequest::new("pro", TargetFamily::Drive);
        request.serial = "12345/000000001".into();
        let result = run_session(&mut probe, &TestBlobs, &request, &mut NoProgress);
        assert!(result.ok);
        assert!(result.warnings.iter().any(|w| w.contains("read protection")));
    }

    #[test]
    fn ble_session_places_every_buffer() {
        let mut probe = DummyProbe::new_default();
        let mut request = FlashRequest::new("pro2", TargetFamily::Ble);
        request.ble_name = "MyScooter".into();
        let result = run_session(&mut probe, &TestBlobs, &request, &mut NoProgress);
        assert!(result.ok, "unexpected failure: {:?}", result.error);

        // v2 layout addresses.
        let name_block = probe.ble_flash(0x3B800, 24);
        assert_eq!(&name_block[..2], &[0x55, 0xAA]);
        assert_eq!(&name_block[8..17], b"MyScooter");
        assert_eq!(probe.ble_flash(0x0, 4), &[0xA0; 4]);
        assert_eq!(probe.ble_flash(0x1B000, 4), &[0xF0; 4]);
        assert_eq!(probe.ble_flash(0x3D000, 4), &[0x50; 4]);
        assert_eq!(probe.uicr_word(), Some(0x0003_D000));
        // Erased flash everywhere nothing was written.
        assert_eq!(probe.ble_flash(0x30000, 4), &[0xFF; 4]);
        // Final reset releases the core.
        assert_eq!(probe.resets().last(), Some(&false));
    }

    #[test]
    fn ble_session_on_standard_layout_uses_legacy_addresses() {
        let mut probe = DummyProbe::new_default();
        let request = FlashRequest::new("max", TargetFamily::Ble);
        let result = run_session(&mut probe, &TestBlobs, &request, &mut NoProgress);
        assert!(result.ok, "unexpected failure: {:?}", result.error);
        let name_block = probe.ble_flash(0x3B400, 24);
        assert_eq!(&name_block[8..10], b"NB");
        assert_eq!(probe.ble_flash(0x18000, 4), &[0xF0; 4]);
        assert_eq!(probe.uicr_word(), Some(0x0003_C000));
    }

    #[test]
    fn operations_require_attachment() {
        let mut probe = DummyProbe::new_default();
        assert_eq!(probe.reset(false), Err(ProbeError::NotAttached));
        assert!(probe.read_memory(0, 4).is_err());
    }
}
