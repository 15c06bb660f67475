//! Flash command implementations

use indicatif::{ProgressBar, ProgressStyle};
use scootflash_core::fetch::FileBlobSource;
use scootflash_core::progress::FlashProgress;
use scootflash_core::registry::{ChipIdentity, TargetFamily};
use scootflash_core::session::{run_session, FlashRequest, SessionResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::probes;

/// Progress reporter using an indicatif progress bar
struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    fn new() -> Self {
        Self { current_bar: None }
    }
}

impl FlashProgress for IndicatifProgress {
    fn begin(&mut self, total_bytes: usize, phase: &'static str) {
        let pb = ProgressBar::new(total_bytes as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&format!(
                    "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                    phase
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }

    fn advance(&mut self, bytes_done: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(bytes_done as u64);
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message("done");
        }
    }
}

/// Run the flash-drive command
#[allow(clippy::too_many_arguments)]
pub fn run_flash_drive(
    probe_spec: &str,
    firmware_dir: &Path,
    device: &str,
    serial: &str,
    km: f64,
    alt_vendor: bool,
    firmware: Option<&Path>,
    delay: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = FlashRequest::new(device, TargetFamily::Drive);
    request.serial = serial.to_string();
    request.odometer_km = km;
    if alt_vendor {
        request.chip_identity = ChipIdentity::AlternateVendor;
    }
    request.firmware_override = firmware.map(read_firmware).transpose()?;

    run_flash(probe_spec, firmware_dir, request, delay)
}

/// Run the flash-ble command
pub fn run_flash_ble(
    probe_spec: &str,
    firmware_dir: &Path,
    device: &str,
    name: &str,
    firmware: Option<&Path>,
    delay: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut request = FlashRequest::new(device, TargetFamily::Ble);
    request.ble_name = name.to_string();
    request.firmware_override = firmware.map(read_firmware).transpose()?;

    run_flash(probe_spec, firmware_dir, request, delay)
}

fn run_flash(
    probe_spec: &str,
    firmware_dir: &Path,
    request: FlashRequest,
    delay: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let blobs = FileBlobSource::new(firmware_dir);
    let mut probe = probes::open_probe(probe_spec)?;

    countdown(delay);

    let mut progress = IndicatifProgress::new();
    let result = run_session(&mut probe, &blobs, &request, &mut progress);
    report(result)
}

fn read_firmware(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut file = File::open(path)
        .map_err(|e| format!("Failed to open firmware image {}: {}", path.display(), e))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    println!("Read {} bytes from {:?}", data.len(), path);
    Ok(data)
}

/// Count down before the first probe operation, so the operator can still
/// pull the plug on a target they picked by mistake.
fn countdown(seconds: u64) {
    for remaining in (1..=seconds).rev() {
        println!("Flashing in {}...", remaining);
        thread::sleep(Duration::from_secs(1));
    }
}

fn report(result: SessionResult) -> Result<(), Box<dyn std::error::Error>> {
    for warning in &result.warnings {
        log::warn!("{}", warning);
    }
    match result.error {
        None => {
            println!("Flashing complete!");
            Ok(())
        }
        Some(e) => Err(format!("Flashing failed at stage '{}': {}", result.stage, e).into()),
    }
}
