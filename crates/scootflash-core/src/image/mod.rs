//! Firmware image composition
//!
//! Pure data transformation: raw blobs plus a device profile in, byte-exact
//! buffers ready for specific memory addresses out. Every invariant is
//! checked here, before anything reaches the probe.

mod drive;
mod nvmc;
mod record;

pub use drive::{build_flash_image, FlashImage, DRIVER_OFFSET};
pub use nvmc::{
    build_name_block, build_nvmc_write_set, NvmcWrite, NvmcWriteKind, NvmcWriteSet, NAME_BLOCK_LEN,
};
pub use record::{build_data_record, build_data_record_seeded, DataRecord, DEFAULT_SERIAL};
