//! Drive-MCU flash programmer
//!
//! The drive MCU is programmed the direct way: halt, lift read protection,
//! read the hardware UID, compose the full image and hand it to the probe's
//! flash loader in one operation. Read-protection removal is the single
//! non-fatal step — a target that was never locked reports a failure there
//! and flashing still succeeds.

use crate::error::Result;
use crate::image::{build_data_record, build_data_record_seeded, build_flash_image, DataRecord};
use crate::probe::{DebugProbe, ProbeError};
use crate::program::Stage;
use crate::progress::FlashProgress;
use crate::registry::DeviceProfile;

/// System address of the 96-bit hardware UID.
pub const UID_ADDR: u32 = 0x1FFF_F7E8;

/// UID length in bytes.
pub const UID_LEN: usize = 12;

/// Base address of drive-MCU flash.
pub const DRIVE_FLASH_BASE: u32 = 0x0800_0000;

/// Inputs for one drive flashing run.
pub struct SwdInputs<'a> {
    /// Bootloader blob (placed at image offset 0).
    pub bootloader: &'a [u8],
    /// Driver firmware blob (placed at image offset 0x1000).
    pub driver: &'a [u8],
    /// Optional data-record template blob to seed the record from.
    pub data_template: Option<&'a [u8]>,
    /// Serial number for the data record; empty selects the default.
    pub serial: &'a str,
    /// Odometer reading in kilometers.
    pub odometer_km: f64,
}

/// State machine flashing the drive MCU through a probe.
pub struct SwdFlashProgrammer<'a, P: DebugProbe + ?Sized> {
    probe: &'a mut P,
    profile: &'a DeviceProfile,
    stage: Stage,
    protection_warning: bool,
}

impl<'a, P: DebugProbe + ?Sized> SwdFlashProgrammer<'a, P> {
    /// Create a programmer over an already-attached probe.
    pub fn new(probe: &'a mut P, profile: &'a DeviceProfile) -> Self {
        Self {
            probe,
            profile,
            stage: Stage::Reset,
            protection_warning: false,
        }
    }

    /// Stage the run is in, or stopped in.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether read-protection removal failed (non-fatal).
    pub fn protection_warning(&self) -> bool {
        self.protection_warning
    }

    /// Run the full sequence. On error the probe is left attached; the
    /// session layer owns detach.
    pub fn run(&mut self, inputs: &SwdInputs<'_>, progress: &mut dyn FlashProgress) -> Result<()> {
        self.stage = Stage::Reset;
        self.probe.reset(true)?;

        self.stage = Stage::RemoveProtection;
        if let Err(e) = self.probe.remove_read_protection() {
            // The target may already be unprotected; keep going.
            log::warn!("read protection removal failed ({e}); continuing");
            self.protection_warning = true;
        }
        self.probe.reset(false)?;

        self.stage = Stage::ReadUid;
        log::info!("reading UID from controller");
        let raw = self.probe.read_memory(UID_ADDR, UID_LEN)?;
        let uid = uid_words(&raw)?;
        log::info!("target UID: {}", format_uid(uid));

        self.stage = Stage::Compose;
        let record = self.compose_record(inputs, uid)?;
        let image = build_flash_image(self.profile, inputs.bootloader, inputs.driver, &record)?;
        log::info!(
            "composed {} byte image for {} (data record at {:#x})",
            image.len(),
            self.profile.id,
            image.data_offset()
        );

        self.stage = Stage::WriteFlash;
        progress.begin(image.len(), "flashing drive MCU");
        self.probe.flash_write(DRIVE_FLASH_BASE, image.as_bytes())?;
        progress.advance(image.len());
        progress.finish();

        self.stage = Stage::Run;
        self.probe.reset(false)?;

        self.stage = Stage::Done;
        Ok(())
    }

    fn compose_record(&self, inputs: &SwdInputs<'_>, uid: [u32; 3]) -> Result<DataRecord> {
        match inputs.data_template {
            Some(blob) => build_data_record_seeded(
                self.profile,
                blob,
                uid,
                inputs.serial,
                inputs.odometer_km,
            ),
            None => build_data_record(self.profile, uid, inputs.serial, inputs.odometer_km),
        }
    }
}

/// Split a raw UID read into three native little-endian words.
pub fn uid_words(raw: &[u8]) -> Result<[u32; 3]> {
    if raw.len() != UID_LEN {
        return Err(ProbeError::Transport(format!("short UID read: {} bytes", raw.len())).into());
    }
    let word = |i: usize| u32::from_le_bytes(raw[i * 4..i * 4 + 4].try_into().expect("4 bytes"));
    Ok([word(0), word(1), word(2)])
}

/// Human-readable UID, word-wise big-endian hex.
pub fn format_uid(uid: [u32; 3]) -> String {
    format!("{:08X}{:08X}{:08X}", uid[0], uid[1], uid[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uid_words_are_native_little_endian() {
        let raw = [
            0x78, 0x56, 0x34, 0x12, // 0x12345678
            0xF0, 0xDE, 0xBC, 0x9A, // 0x9ABCDEF0
            0x01, 0x02, 0x03, 0x04, // 0x04030201
        ];
        let uid = uid_words(&raw).unwrap();
        assert_eq!(uid, [0x1234_5678, 0x9ABC_DEF0, 0x0403_0201]);
        assert_eq!(format_uid(uid), "123456789ABCDEF004030201");
    }

    #[test]
    fn short_uid_read_is_a_probe_error() {
        let err = uid_words(&[0u8; 8]).unwrap_err();
        assert!(matches!(err, crate::Error::Probe(_)));
    }
}
