//! Firmware blob retrieval
//!
//! Bootloaders, stock firmware images and data-record templates are
//! identified by [`BlobId`] and delivered by a [`BlobSource`]. The session
//! layer resolves every blob it needs before any hardware is touched, so a
//! failing source never leaves a target half-programmed.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Identifier of one binary blob needed during a flashing session.
///
/// The embedded name is a registry-provided identifier; [`BlobId::path`]
/// maps it to the conventional relative path inside a firmware directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobId {
    /// Drive-MCU bootloader (e.g. `mi_DRV`, `nb_DRV_AT32`).
    DriveBootloader(&'static str),
    /// Per-device drive firmware, stored as a relative path.
    DriveFirmware(&'static str),
    /// Data-record template (e.g. `default`, `4pro`).
    DataTemplate(&'static str),
    /// BLE base image: radio stack flashed at address 0.
    BleBaseImage(&'static str),
    /// Per-device BLE firmware, stored as a relative path.
    BleFirmware(&'static str),
    /// BLE bootloader stub (`boot-16k` / `boot-32k`).
    BootloaderStub(&'static str),
}

impl BlobId {
    /// Relative path of this blob inside a firmware directory.
    pub fn path(&self) -> PathBuf {
        match self {
            BlobId::DriveBootloader(name) | BlobId::BleBaseImage(name) => {
                PathBuf::from(format!("bootloader/{name}.bin"))
            }
            BlobId::BootloaderStub(name) => PathBuf::from(format!("bootloader/{name}")),
            BlobId::DataTemplate(name) => PathBuf::from(format!("data/{name}")),
            BlobId::DriveFirmware(path) | BlobId::BleFirmware(path) => PathBuf::from(path),
        }
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Source of firmware blobs.
///
/// Implementations may read from disk, an HTTP mirror, or memory; the core
/// only requires that a fetched buffer is complete.
pub trait BlobSource {
    /// Retrieve the blob identified by `id`.
    fn fetch(&self, id: &BlobId) -> Result<Vec<u8>>;
}

/// Blob source backed by a local firmware directory.
///
/// The directory follows the conventional layout: `bootloader/` for
/// bootloaders, base images and stubs, `data/` for record templates, and
/// per-device subdirectories for stock firmware.
pub struct FileBlobSource {
    root: PathBuf,
}

impl FileBlobSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory this source reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobSource for FileBlobSource {
    fn fetch(&self, id: &BlobId) -> Result<Vec<u8>> {
        let path = self.root.join(id.path());
        log::debug!("loading {} from {}", id, path.display());
        fs::read(&path).map_err(|e| Error::Fetch {
            id: id.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })
    }
}
