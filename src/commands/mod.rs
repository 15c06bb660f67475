//! CLI command implementations
//!
//! Flash commands assemble a [`scootflash_core::session::FlashRequest`]
//! from the parsed arguments and hand it to the session layer together
//! with an opened probe and a file-backed blob source. List commands only
//! read the static registry.

mod flash;
mod list;

pub use flash::{run_flash_ble, run_flash_drive};
pub use list::{list_devices, list_probes};
