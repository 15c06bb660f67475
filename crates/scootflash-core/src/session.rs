//! Flashing session orchestration
//!
//! A session owns one probe for its whole duration: resolve the profile,
//! gather every blob, attach, run the family-specific programmer, detach.
//! Nothing touches hardware until registry lookup and blob resolution have
//! both succeeded, and the probe is detached exactly once no matter where
//! the inner machine stopped.

use crate::error::{Error, Result};
use crate::fetch::{BlobId, BlobSource};
use crate::image::{build_nvmc_write_set, NvmcWriteSet};
use crate::probe::DebugProbe;
use crate::program::nvmc::NvmcProgrammer;
use crate::program::swd::{SwdFlashProgrammer, SwdInputs};
use crate::program::Stage;
use crate::progress::FlashProgress;
use crate::registry::{profile_for, ChipIdentity, DeviceProfile, TargetFamily};

/// Everything the operator supplies for one flashing session.
#[derive(Debug, Clone)]
pub struct FlashRequest {
    /// Device id, resolved through the registry.
    pub device_id: String,
    /// Which MCU to program.
    pub family: TargetFamily,
    /// Silicon identity override for the drive bootloader.
    pub chip_identity: ChipIdentity,
    /// Serial number for the data record (drive); empty selects default.
    pub serial: String,
    /// Odometer reading in kilometers (drive).
    pub odometer_km: f64,
    /// BLE advertising name; empty selects the family default.
    pub ble_name: String,
    /// Operator-supplied firmware image replacing the stock blob.
    pub firmware_override: Option<Vec<u8>>,
}

impl FlashRequest {
    /// Request with default inputs for `device_id` and `family`.
    pub fn new(device_id: impl Into<String>, family: TargetFamily) -> Self {
        Self {
            device_id: device_id.into(),
            family,
            chip_identity: ChipIdentity::Standard,
            serial: String::new(),
            odometer_km: 0.0,
            ble_name: String::new(),
            firmware_override: None,
        }
    }
}

/// Outcome of one session.
#[derive(Debug)]
pub struct SessionResult {
    /// Whether the full sequence completed.
    pub ok: bool,
    /// Stage the session finished or stopped in.
    pub stage: Stage,
    /// The failure, when `ok` is false.
    pub error: Option<Error>,
    /// Non-fatal findings worth showing the operator.
    pub warnings: Vec<String>,
}

impl SessionResult {
    fn success(warnings: Vec<String>) -> Self {
        Self {
            ok: true,
            stage: Stage::Done,
            error: None,
            warnings,
        }
    }

    fn failure(stage: Stage, error: Error, mut warnings: Vec<String>) -> Self {
        if stage.mutates_target() {
            warnings.push(
                "the target may be partially programmed; do not power it on \
                 before a successful retry"
                    .to_string(),
            );
        }
        Self {
            ok: false,
            stage,
            error: Some(error),
            warnings,
        }
    }
}

enum PreparedTarget {
    Drive {
        bootloader: Vec<u8>,
        driver: Vec<u8>,
        data_template: Option<Vec<u8>>,
    },
    Ble {
        write_set: NvmcWriteSet,
    },
}

/// Run one complete flashing session.
///
/// The probe must be unattached on entry; it is detached again before this
/// returns, in every path that reached the hardware. A failure before
/// [`Stage::Attach`] performs no probe operation at all.
pub fn run_session(
    probe: &mut dyn DebugProbe,
    blobs: &dyn BlobSource,
    request: &FlashRequest,
    progress: &mut dyn FlashProgress,
) -> SessionResult {
    let mut warnings = Vec::new();

    let profile = match profile_for(&request.device_id, request.chip_identity) {
        Ok(profile) => profile,
        Err(e) => return SessionResult::failure(Stage::Resolve, e, warnings),
    };
    log::info!(
        "flashing {} ({:?} target)",
        profile.id,
        request.family
    );

    let prepared = match prepare_target(&profile, blobs, request, &mut warnings) {
        Ok(prepared) => prepared,
        Err(e) => {
            let stage = match e {
                Error::Misaligned { .. } | Error::OutOfBounds { .. } => Stage::Compose,
                _ => Stage::FetchBlobs,
            };
            return SessionResult::failure(stage, e, warnings);
        }
    };

    if let Err(e) = probe.attach() {
        probe.detach();
        return SessionResult::failure(Stage::Attach, e.into(), warnings);
    }

    let (stage, outcome) = match &prepared {
        PreparedTarget::Drive {
            bootloader,
            driver,
            data_template,
        } => {
            let inputs = SwdInputs {
                bootloader,
                driver,
                data_template: data_template.as_deref(),
                serial: &request.serial,
                odometer_km: request.odometer_km,
            };
            let mut programmer = SwdFlashProgrammer::new(&mut *probe, &profile);
            let outcome = programmer.run(&inputs, progress);
            if programmer.protection_warning() {
                warnings.push(
                    "read protection removal reported an error; if flashing \
                     completed, the target was already unprotected"
                        .to_string(),
                );
            }
            (programmer.stage(), outcome)
        }
        PreparedTarget::Ble { write_set } => {
            let mut programmer = NvmcProgrammer::new(&mut *probe);
            let outcome = programmer.run(write_set, progress);
            (programmer.stage(), outcome)
        }
    };

    probe.detach();

    match outcome {
        Ok(()) => {
            log::info!("flashing done");
            SessionResult::success(warnings)
        }
        Err(e) => {
            log::error!("flashing failed at {stage}: {e}");
            SessionResult::failure(stage, e, warnings)
        }
    }
}

/// Resolve the stock firmware blob or the operator override, rejecting
/// devices that have neither.
fn resolve_firmware(
    profile: &DeviceProfile,
    stock: Option<&'static str>,
    make_id: fn(&'static str) -> BlobId,
    blobs: &dyn BlobSource,
    request: &FlashRequest,
) -> Result<Vec<u8>> {
    if let Some(image) = &request.firmware_override {
        log::info!("using operator-supplied firmware image ({} bytes)", image.len());
        return Ok(image.clone());
    }
    match stock {
        Some(path) => blobs.fetch(&make_id(path)),
        None => Err(Error::FirmwareUnavailable {
            device: profile.id.to_string(),
        }),
    }
}

fn prepare_target(
    profile: &DeviceProfile,
    blobs: &dyn BlobSource,
    request: &FlashRequest,
    warnings: &mut Vec<String>,
) -> Result<PreparedTarget> {
    match request.family {
        TargetFamily::Drive => {
            let driver = resolve_firmware(
                profile,
                profile.drive_firmware,
                BlobId::DriveFirmware,
                blobs,
                request,
            )?;
            let bootloader = blobs.fetch(&profile.drive_bootloader())?;
            let data_template = match blobs.fetch(&profile.data_template_blob()) {
                Ok(blob) => Some(blob),
                Err(e) => {
                    log::warn!("data-record template unavailable ({e}); using a blank template");
                    warnings.push(format!(
                        "data-record template unavailable ({e}); record built on a blank template"
                    ));
                    None
                }
            };
            Ok(PreparedTarget::Drive {
                bootloader,
                driver,
                data_template,
            })
        }
        TargetFamily::Ble => {
            let main_fw = resolve_firmware(
                profile,
                profile.ble_firmware,
                BlobId::BleFirmware,
                blobs,
                request,
            )?;
            let base_image = blobs.fetch(&profile.ble_base_image())?;
            let stub = blobs.fetch(&profile.bootloader_stub())?;
            let write_set =
                build_nvmc_write_set(profile, &base_image, &main_fw, &stub, &request.ble_name)?;
            Ok(PreparedTarget::Ble { write_set })
        }
    }
}
