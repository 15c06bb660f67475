//! scootflash - Electric scooter controller flasher
//!
//! Reflashes the two MCUs on Xiaomi and Ninebot scooter controller boards
//! through a debug probe:
//! - **Drive MCU** (motor controller) - flashed directly through the
//!   probe's flash loader, with a freshly composed image carrying the
//!   bootloader, the driver firmware and a regenerated data record
//! - **BLE MCU** (dashboard radio) - programmed by driving its
//!   non-volatile memory controller registers by hand
//!
//! Device-specific layouts, bootloader selection and stock firmware
//! identifiers all come from the model registry in scootflash-core.

mod cli;
mod commands;
mod probes;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::FlashDrive {
            probe,
            device,
            serial,
            km,
            alt_vendor,
            firmware,
            delay,
        } => commands::run_flash_drive(
            &probe,
            &cli.firmware_dir,
            &device,
            &serial,
            km,
            alt_vendor,
            firmware.as_deref(),
            delay,
        ),
        Commands::FlashBle {
            probe,
            device,
            name,
            firmware,
            delay,
        } => commands::run_flash_ble(
            &probe,
            &cli.firmware_dir,
            &device,
            &name,
            firmware.as_deref(),
            delay,
        ),
        Commands::ListDevices => {
            commands::list_devices();
            Ok(())
        }
        Commands::ListProbes => {
            commands::list_probes();
            Ok(())
        }
    }
}
