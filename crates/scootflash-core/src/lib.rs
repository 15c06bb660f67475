//! scootflash-core - Core library for scooter controller flashing
//!
//! This crate implements everything between "which scooter is this" and the
//! raw debug-probe operations:
//!
//! - a device variant [`registry`] mapping scooter models to programming
//!   parameters (memory layout, bootloader selection, firmware identifiers)
//! - the firmware [`image`] composer, producing byte-exact flash images and
//!   NVMC write sets from independently sourced binary blobs plus a
//!   per-device data record (serial, hardware UID, odometer)
//! - two [`program`]ming state machines: direct flash writes for the drive
//!   MCU, and the NVMC register protocol for the BLE MCU
//! - the [`session`] orchestrator tying the above together around a single
//!   exclusively-owned probe handle
//!
//! The probe transport itself is injected through the [`probe::DebugProbe`]
//! trait; firmware blobs are injected through [`fetch::BlobSource`].
//!
//! # Example
//!
//! ```ignore
//! use scootflash_core::fetch::FileBlobSource;
//! use scootflash_core::progress::NoProgress;
//! use scootflash_core::registry::TargetFamily;
//! use scootflash_core::session::{run_session, FlashRequest};
//!
//! let blobs = FileBlobSource::new("firmware");
//! let request = FlashRequest::new("pro2", TargetFamily::Ble);
//! let result = run_session(&mut probe, &blobs, &request, &mut NoProgress);
//! if !result.ok {
//!     eprintln!("failed at {}: {:?}", result.stage, result.error);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod fetch;
pub mod image;
pub mod probe;
pub mod program;
pub mod progress;
pub mod registry;
pub mod session;

pub use error::{Error, Result};
