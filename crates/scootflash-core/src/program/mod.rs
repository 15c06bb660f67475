//! Programming state machines
//!
//! Two drivers, one per MCU family: [`swd::SwdFlashProgrammer`] writes a
//! composed image straight into drive-MCU flash; [`nvmc::NvmcProgrammer`]
//! sequences the BLE MCU's erase/write register protocol. Both record the
//! stage they are in so the session layer can report where a failed run
//! stopped.

pub mod nvmc;
pub mod swd;

use std::fmt;

/// Where a session is (or stopped) in the programming sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Registry lookup.
    Resolve,
    /// Blob retrieval.
    FetchBlobs,
    /// Probe attach.
    Attach,
    /// Reset into halt before programming.
    Reset,
    /// Drive: read-protection removal.
    RemoveProtection,
    /// Drive: UID read.
    ReadUid,
    /// Drive: image composition.
    Compose,
    /// Drive: full-image flash write.
    WriteFlash,
    /// BLE: erase enable.
    EnableErase,
    /// BLE: erase-all trigger.
    EraseAll,
    /// BLE: write enable.
    EnableWrite,
    /// BLE: UICR bootloader-address word.
    ConfigureBootloader,
    /// BLE: name block write.
    WriteNameBlock,
    /// BLE: base image write.
    WriteBaseImage,
    /// BLE: main firmware write.
    WriteFirmware,
    /// BLE: bootloader stub write.
    WriteBootloaderStub,
    /// Final reset back into the application.
    Run,
    /// Sequence completed.
    Done,
}

impl Stage {
    /// Whether reaching this stage implies the target may already have been
    /// mutated, so a failure can leave it partially programmed.
    pub fn mutates_target(self) -> bool {
        matches!(
            self,
            Stage::WriteFlash
                | Stage::EnableErase
                | Stage::EraseAll
                | Stage::EnableWrite
                | Stage::ConfigureBootloader
                | Stage::WriteNameBlock
                | Stage::WriteBaseImage
                | Stage::WriteFirmware
                | Stage::WriteBootloaderStub
                | Stage::Run
        )
    }

    /// Stable lowercase name for logs and results.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Resolve => "resolve",
            Stage::FetchBlobs => "fetch-blobs",
            Stage::Attach => "attach",
            Stage::Reset => "reset",
            Stage::RemoveProtection => "remove-protection",
            Stage::ReadUid => "read-uid",
            Stage::Compose => "compose",
            Stage::WriteFlash => "write-flash",
            Stage::EnableErase => "enable-erase",
            Stage::EraseAll => "erase-all",
            Stage::EnableWrite => "enable-write",
            Stage::ConfigureBootloader => "configure-bootloader",
            Stage::WriteNameBlock => "write-name-block",
            Stage::WriteBaseImage => "write-base-image",
            Stage::WriteFirmware => "write-firmware",
            Stage::WriteBootloaderStub => "write-bootloader-stub",
            Stage::Run => "run",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
