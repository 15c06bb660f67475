//! Error types for scootflash-core
//!
//! Composition errors (`OutOfBounds`, `Misaligned`, `LayoutOverflow`) are
//! raised before any byte reaches the target; hardware-stage errors
//! (`Probe`, `NvmcTimeout`) may leave the target partially programmed and
//! are reported as such by the session layer.

use thiserror::Error;

pub use crate::probe::ProbeError;

/// Core error type covering registry lookup, blob resolution, image
/// composition and the programming sequences.
#[derive(Debug, Error)]
pub enum Error {
    /// Device id has no entry in the variant registry.
    #[error("unknown device id {0:?}")]
    UnknownDevice(String),

    /// No stock firmware is registered for this device and no override
    /// image was supplied.
    #[error("no stock firmware available for {device}; supply your own image")]
    FirmwareUnavailable {
        /// Device id the lookup was for.
        device: String,
    },

    /// Blob source failed to deliver a required binary.
    #[error("failed to fetch {id}: {reason}")]
    Fetch {
        /// Identifier of the blob that was requested.
        id: String,
        /// Underlying failure description.
        reason: String,
    },

    /// A field write would exceed the bounds of its template span.
    #[error("{what} is {len} bytes but at most {max} fit at offset {offset:#x}")]
    OutOfBounds {
        /// What was being written.
        what: &'static str,
        /// Length of the offending input.
        len: usize,
        /// Maximum length the template reserves.
        max: usize,
        /// Template offset of the field.
        offset: usize,
    },

    /// Buffer length is not word-aligned; nothing was transmitted.
    #[error("{what} length {len} is not a multiple of 4")]
    Misaligned {
        /// Which buffer failed the check.
        what: &'static str,
        /// The offending length.
        len: usize,
    },

    /// A blob does not fit its slot in the composed flash image.
    #[error("{what} is {len} bytes but only {max} fit before the next region")]
    LayoutOverflow {
        /// Which blob overflowed.
        what: &'static str,
        /// Length of the offending blob.
        len: usize,
        /// Maximum length the layout allows.
        max: usize,
    },

    /// Transport or target fault reported by the probe. Fatal for the
    /// remaining sequence.
    #[error("probe error: {0}")]
    Probe(#[from] ProbeError),

    /// NVMC never reported ready within the poll bound. Fatal.
    #[error("NVMC not ready after {attempts} polls")]
    NvmcTimeout {
        /// Number of polls performed before giving up.
        attempts: u32,
    },
}

/// Result type alias using the core error type.
pub type Result<T> = core::result::Result<T, Error>;
