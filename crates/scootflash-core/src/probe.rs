//! Debug probe contract
//!
//! The probe transport (USB enumeration, debug-port command encoding) lives
//! outside this crate. Programmers only see this trait; any implementation
//! that can move bytes and poke 32-bit registers over SWD can drive a
//! flashing session.

use thiserror::Error;

/// Faults reported by the probe transport or the target behind it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// Transport-level failure (USB, wire protocol, target unresponsive).
    #[error("transport error: {0}")]
    Transport(String),

    /// Operation was issued while no target is attached.
    #[error("no target attached")]
    NotAttached,

    /// The probe's flash-write primitive reported a failure.
    #[error("flash write failed at {addr:#010x}")]
    FlashWrite {
        /// Base address of the failed write.
        addr: u32,
    },

    /// Read-protection removal did not complete. The session layer treats
    /// this as a warning, not a fatal error: the target may simply already
    /// be unprotected.
    #[error("read protection removal did not complete")]
    ProtectionRemoval,
}

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// A hardware debug probe attached to one target MCU.
///
/// All addresses are 32-bit memory-mapped. A probe handle is exclusively
/// owned by the active flashing session for its duration; implementations
/// do not need to be thread safe.
pub trait DebugProbe {
    /// Attach to the target (enter debug state).
    fn attach(&mut self) -> ProbeResult<()>;

    /// Detach from the target. Must be safe to call on an unattached probe.
    fn detach(&mut self);

    /// Pulse reset; with `halt` the core stays halted after the reset.
    fn reset(&mut self, halt: bool) -> ProbeResult<()>;

    /// Read `len` bytes of target memory starting at `addr`.
    fn read_memory(&mut self, addr: u32, len: usize) -> ProbeResult<Vec<u8>>;

    /// Write bytes to target memory at `addr`.
    fn write_memory(&mut self, addr: u32, data: &[u8]) -> ProbeResult<()>;

    /// Read a 32-bit memory-mapped register.
    fn read_register32(&mut self, addr: u32) -> ProbeResult<u32>;

    /// Write a 32-bit memory-mapped register.
    fn write_register32(&mut self, addr: u32, value: u32) -> ProbeResult<()>;

    /// Program `data` into target flash at `base` as one logical operation
    /// (erase + write handled by the probe's flash loader).
    fn flash_write(&mut self, base: u32, data: &[u8]) -> ProbeResult<()>;

    /// Lift the flash read/write lock on the target, erasing option bytes
    /// as needed. Fails on targets that are already unprotected in a way
    /// the probe cannot distinguish from a real fault.
    fn remove_read_protection(&mut self) -> ProbeResult<()>;

    /// Block for the given number of milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

impl DebugProbe for Box<dyn DebugProbe> {
    fn attach(&mut self) -> ProbeResult<()> {
        (**self).attach()
    }

    fn detach(&mut self) {
        (**self).detach()
    }

    fn reset(&mut self, halt: bool) -> ProbeResult<()> {
        (**self).reset(halt)
    }

    fn read_memory(&mut self, addr: u32, len: usize) -> ProbeResult<Vec<u8>> {
        (**self).read_memory(addr, len)
    }

    fn write_memory(&mut self, addr: u32, data: &[u8]) -> ProbeResult<()> {
        (**self).write_memory(addr, data)
    }

    fn read_register32(&mut self, addr: u32) -> ProbeResult<u32> {
        (**self).read_register32(addr)
    }

    fn write_register32(&mut self, addr: u32, value: u32) -> ProbeResult<()> {
        (**self).write_register32(addr, value)
    }

    fn flash_write(&mut self, base: u32, data: &[u8]) -> ProbeResult<()> {
        (**self).flash_write(base, data)
    }

    fn remove_read_protection(&mut self) -> ProbeResult<()> {
        (**self).remove_read_protection()
    }

    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}
