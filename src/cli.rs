//! CLI argument parsing

use crate::probes;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the probe argument
fn probe_help() -> String {
    format!("Probe to use [available: {}]", probes::probe_names_short())
}

#[derive(Parser)]
#[command(name = "scootflash")]
#[command(author, version, about = "Electric scooter controller flasher", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to the firmware directory (bootloaders, stock images, templates)
    #[arg(long, global = true, default_value = "firmware")]
    pub firmware_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Flash the drive (motor controller) MCU
    FlashDrive {
        /// Probe to use
        #[arg(short, long, help = probe_help())]
        probe: String,

        /// Device model (see list-devices)
        #[arg(short, long)]
        device: String,

        /// Serial number written into the data record (default: 00000/000000000)
        #[arg(short, long, default_value = "")]
        serial: String,

        /// Odometer reading to preserve, in kilometers
        #[arg(long, default_value_t = 0.0)]
        km: f64,

        /// Target has alternate-vendor silicon (GD32/AT32 clone)
        #[arg(long)]
        alt_vendor: bool,

        /// Custom firmware image replacing the stock blob
        #[arg(short, long)]
        firmware: Option<PathBuf>,

        /// Countdown before touching the target, in seconds
        #[arg(long, default_value_t = 0)]
        delay: u64,
    },

    /// Flash the BLE (dashboard radio) MCU
    FlashBle {
        /// Probe to use
        #[arg(short, long, help = probe_help())]
        probe: String,

        /// Device model (see list-devices)
        #[arg(short, long)]
        device: String,

        /// Bluetooth advertising name (default: family standard name)
        #[arg(short, long, default_value = "")]
        name: String,

        /// Custom firmware image replacing the stock blob
        #[arg(short, long)]
        firmware: Option<PathBuf>,

        /// Countdown before touching the target, in seconds
        #[arg(long, default_value_t = 0)]
        delay: u64,
    },

    /// List supported scooter models
    ListDevices,

    /// List supported probes
    ListProbes,
}
