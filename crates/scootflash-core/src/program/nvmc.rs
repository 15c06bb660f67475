//! BLE-MCU NVMC programmer
//!
//! The BLE MCU exposes no flash loader; its non-volatile memory controller
//! must be driven by hand: enable erase, erase all, enable write, then push
//! every buffer through word-aligned memory writes with a bounded ready
//! poll after each 1 KiB chunk. All addresses and the write-enable word
//! come from the composed [`NvmcWriteSet`], never from this module.

use crate::error::{Error, Result};
use crate::image::{NvmcWriteKind, NvmcWriteSet};
use crate::probe::DebugProbe;
use crate::program::Stage;
use crate::progress::FlashProgress;

/// NVMC READY status register.
pub const NVMC_READY: u32 = 0x4001_E400;
/// NVMC CONFIG register (erase/write enable).
pub const NVMC_CONFIG: u32 = 0x4001_E504;
/// NVMC ERASEALL trigger register.
pub const NVMC_ERASEALL: u32 = 0x4001_E50C;
/// UICR word holding the bootloader start address.
pub const UICR_BOOTLOADER_ADDR: u32 = 0x1000_1014;

/// CONFIG value enabling writes.
pub const CONFIG_WEN: u32 = 0x01;
/// CONFIG value enabling erase.
pub const CONFIG_EEN: u32 = 0x02;
/// READY register value once the controller is idle.
pub const READY_VALUE: u32 = 0x01;
/// ERASEALL trigger value.
pub const ERASEALL_START: u32 = 0x01;

/// Poll bound for [`NvmcProgrammer::wait_ready`]. Deliberately un-delayed:
/// a healthy controller answers well within this many round trips.
pub const READY_POLL_LIMIT: u32 = 200;

/// Chunk size for memory writes.
pub const WRITE_CHUNK: usize = 1024;

/// Settle time before the final reset. Without it the MCU misses the reset
/// pulse after the last write.
pub const RESET_SETTLE_MS: u32 = 1000;

/// State machine driving the NVMC register protocol.
pub struct NvmcProgrammer<'a, P: DebugProbe + ?Sized> {
    probe: &'a mut P,
    stage: Stage,
}

impl<'a, P: DebugProbe + ?Sized> NvmcProgrammer<'a, P> {
    /// Create a programmer over an already-attached probe.
    pub fn new(probe: &'a mut P) -> Self {
        Self {
            probe,
            stage: Stage::EnableErase,
        }
    }

    /// Stage the run is in, or stopped in.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Run the full erase/write sequence for `set`.
    pub fn run(&mut self, set: &NvmcWriteSet, progress: &mut dyn FlashProgress) -> Result<()> {
        log::info!("erasing BLE flash");
        self.stage = Stage::EnableErase;
        self.probe.write_register32(NVMC_CONFIG, CONFIG_EEN)?;
        self.wait_ready()?;

        self.stage = Stage::EraseAll;
        self.probe.write_register32(NVMC_ERASEALL, ERASEALL_START)?;
        self.wait_ready()?;

        self.stage = Stage::EnableWrite;
        self.probe.write_register32(NVMC_CONFIG, CONFIG_WEN)?;
        self.probe.reset(true)?;
        // The reset drops the enable; set it again before writing.
        self.probe.write_register32(NVMC_CONFIG, CONFIG_WEN)?;
        self.wait_ready()?;

        self.stage = Stage::ConfigureBootloader;
        self.probe
            .write_memory(UICR_BOOTLOADER_ADDR, &set.bootloader_word.to_le_bytes())?;
        self.wait_ready()?;

        log::info!("writing {} bytes to BLE flash", set.total_bytes());
        progress.begin(set.total_bytes(), "flashing BLE MCU");
        let mut written = 0usize;
        for write in set.writes() {
            self.stage = match write.kind {
                NvmcWriteKind::NameBlock => Stage::WriteNameBlock,
                NvmcWriteKind::BaseImage => Stage::WriteBaseImage,
                NvmcWriteKind::Firmware => Stage::WriteFirmware,
                NvmcWriteKind::BootloaderStub => Stage::WriteBootloaderStub,
            };
            log::debug!(
                "writing {} bytes at {:#07x} ({})",
                write.data.len(),
                write.addr,
                self.stage
            );
            self.write_chunked(write.addr, &write.data, &mut written, progress)?;
        }
        progress.finish();

        self.stage = Stage::Run;
        self.probe.delay_ms(RESET_SETTLE_MS);
        self.probe.reset(false)?;

        self.stage = Stage::Done;
        Ok(())
    }

    /// Poll READY up to [`READY_POLL_LIMIT`] times with no induced delay.
    fn wait_ready(&mut self) -> Result<()> {
        for _ in 0..READY_POLL_LIMIT {
            if self.probe.read_register32(NVMC_READY)? == READY_VALUE {
                return Ok(());
            }
        }
        Err(Error::NvmcTimeout {
            attempts: READY_POLL_LIMIT,
        })
    }

    /// Write `data` to `addr` in 1 KiB pieces, polling READY after each.
    /// Alignment is rechecked here so nothing is transmitted for a bad
    /// buffer even if it bypassed the set builder.
    fn write_chunked(
        &mut self,
        addr: u32,
        data: &[u8],
        written: &mut usize,
        progress: &mut dyn FlashProgress,
    ) -> Result<()> {
        if data.len() % 4 != 0 {
            return Err(Error::Misaligned {
                what: "NVMC write buffer",
                len: data.len(),
            });
        }
        for (i, chunk) in data.chunks(WRITE_CHUNK).enumerate() {
            self.probe
                .write_memory(addr + (i * WRITE_CHUNK) as u32, chunk)?;
            self.wait_ready()?;
            *written += chunk.len();
            progress.advance(*written);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::build_nvmc_write_set;
    use crate::probe::{ProbeError, ProbeResult};
    use crate::progress::NoProgress;
    use crate::registry::{profile_for, ChipIdentity};

    /// Mock probe recording every register/memory operation.
    struct MockProbe {
        ops: Vec<String>,
        ready_reads: u32,
        never_ready: bool,
        memory_writes: Vec<(u32, Vec<u8>)>,
        delays: Vec<u32>,
    }

    impl MockProbe {
        fn new() -> Self {
            Self {
                ops: Vec::new(),
                ready_reads: 0,
                never_ready: false,
                memory_writes: Vec::new(),
                delays: Vec::new(),
            }
        }
    }

    impl DebugProbe for MockProbe {
        fn attach(&mut self) -> ProbeResult<()> {
            Ok(())
        }

        fn detach(&mut self) {}

        fn reset(&mut self, halt: bool) -> ProbeResult<()> {
            self.ops.push(format!("reset(halt={halt})"));
            Ok(())
        }

        fn read_memory(&mut self, _addr: u32, _len: usize) -> ProbeResult<Vec<u8>> {
            Err(ProbeError::Transport("unexpected read".into()))
        }

        fn write_memory(&mut self, addr: u32, data: &[u8]) -> ProbeResult<()> {
            self.ops.push(format!("mem[{addr:#x}]<-{}", data.len()));
            self.memory_writes.push((addr, data.to_vec()));
            Ok(())
        }

        fn read_register32(&mut self, addr: u32) -> ProbeResult<u32> {
            assert_eq!(addr, NVMC_READY);
            self.ready_reads += 1;
            if self.never_ready {
                Ok(0)
            } else {
                Ok(READY_VALUE)
            }
        }

        fn write_register32(&mut self, addr: u32, value: u32) -> ProbeResult<()> {
            self.ops.push(format!("reg[{addr:#x}]<-{value:#x}"));
            Ok(())
        }

        fn flash_write(&mut self, _base: u32, _data: &[u8]) -> ProbeResult<()> {
            Err(ProbeError::Transport("unexpected flash_write".into()))
        }

        fn remove_read_protection(&mut self) -> ProbeResult<()> {
            Ok(())
        }

        fn delay_ms(&mut self, ms: u32) {
            self.delays.push(ms);
        }
    }

    fn write_set() -> NvmcWriteSet {
        let pro = profile_for("pro", ChipIdentity::Standard).unwrap();
        build_nvmc_write_set(&pro, &[0u8; 2048], &[1u8; 1028], &[2u8; 512], "").unwrap()
    }

    #[test]
    fn register_sequence_matches_the_protocol() {
        let mut probe = MockProbe::new();
        let set = write_set();
        NvmcProgrammer::new(&mut probe)
            .run(&set, &mut NoProgress)
            .unwrap();

        // Erase enable, erase all, double write enable around the halt.
        assert_eq!(probe.ops[0], "reg[0x4001e504]<-0x2");
        assert_eq!(probe.ops[1], "reg[0x4001e50c]<-0x1");
        assert_eq!(probe.ops[2], "reg[0x4001e504]<-0x1");
        assert_eq!(probe.ops[3], "reset(halt=true)");
        assert_eq!(probe.ops[4], "reg[0x4001e504]<-0x1");
        // UICR word, then the name block as the first payload.
        assert_eq!(probe.ops[5], "mem[0x10001014]<-4");
        assert_eq!(probe.ops[6], "mem[0x3b400]<-24");
        assert_eq!(*probe.ops.last().unwrap(), "reset(halt=false)");
    }

    #[test]
    fn uicr_word_is_little_endian() {
        let mut probe = MockProbe::new();
        let set = write_set();
        NvmcProgrammer::new(&mut probe)
            .run(&set, &mut NoProgress)
            .unwrap();
        let (addr, data) = &probe.memory_writes[0];
        assert_eq!(*addr, UICR_BOOTLOADER_ADDR);
        assert_eq!(data, &vec![0x00, 0xC0, 0x03, 0x00]);
    }

    #[test]
    fn buffers_are_split_into_1k_chunks_with_a_poll_after_each() {
        let mut probe = MockProbe::new();
        let set = write_set();
        NvmcProgrammer::new(&mut probe)
            .run(&set, &mut NoProgress)
            .unwrap();

        // 1028-byte firmware at 0x18000: one full chunk plus a 4-byte tail.
        let fw_writes: Vec<_> = probe
            .memory_writes
            .iter()
            .filter(|(addr, _)| (0x18000..0x1B000).contains(addr))
            .collect();
        assert_eq!(fw_writes.len(), 2);
        assert_eq!(fw_writes[0].0, 0x18000);
        assert_eq!(fw_writes[0].1.len(), 1024);
        assert_eq!(fw_writes[1].0, 0x18400);
        assert_eq!(fw_writes[1].1.len(), 4);

        // One ready poll per wait: 3 protocol waits + 1 UICR + chunks
        // (name 1, base 2, firmware 2, stub 1).
        assert_eq!(probe.ready_reads, 3 + 1 + 1 + 2 + 2 + 1);
    }

    #[test]
    fn never_ready_times_out_after_exactly_200_polls() {
        let mut probe = MockProbe::new();
        probe.never_ready = true;
        let set = write_set();
        let err = NvmcProgrammer::new(&mut probe)
            .run(&set, &mut NoProgress)
            .unwrap_err();
        assert!(matches!(err, Error::NvmcTimeout { attempts: 200 }));
        assert_eq!(probe.ready_reads, 200);
        // Timed out on the very first wait; nothing else was issued.
        assert_eq!(probe.ops.len(), 1);
    }

    #[test]
    fn settle_delay_precedes_the_final_reset() {
        let mut probe = MockProbe::new();
        let set = write_set();
        let mut programmer = NvmcProgrammer::new(&mut probe);
        programmer.run(&set, &mut NoProgress).unwrap();
        assert_eq!(programmer.stage(), Stage::Done);
        assert_eq!(probe.delays, vec![RESET_SETTLE_MS]);
    }

    #[test]
    fn probe_fault_stops_the_sequence() {
        struct FailingProbe {
            inner: MockProbe,
        }
        impl DebugProbe for FailingProbe {
            fn attach(&mut self) -> ProbeResult<()> {
                Ok(())
            }
            fn detach(&mut self) {}
            fn reset(&mut self, halt: bool) -> ProbeResult<()> {
                self.inner.reset(halt)
            }
            fn read_memory(&mut self, addr: u32, len: usize) -> ProbeResult<Vec<u8>> {
                self.inner.read_memory(addr, len)
            }
            fn write_memory(&mut self, _addr: u32, _data: &[u8]) -> ProbeResult<()> {
                Err(ProbeError::Transport("lost target".into()))
            }
            fn read_register32(&mut self, addr: u32) -> ProbeResult<u32> {
                self.inner.read_register32(addr)
            }
            fn write_register32(&mut self, addr: u32, value: u32) -> ProbeResult<()> {
                self.inner.write_register32(addr, value)
            }
            fn flash_write(&mut self, base: u32, data: &[u8]) -> ProbeResult<()> {
                self.inner.flash_write(base, data)
            }
            fn remove_read_protection(&mut self) -> ProbeResult<()> {
                Ok(())
            }
            fn delay_ms(&mut self, ms: u32) {
                self.inner.delay_ms(ms)
            }
        }

        let mut probe = FailingProbe {
            inner: MockProbe::new(),
        };
        let set = write_set();
        let mut programmer = NvmcProgrammer::new(&mut probe);
        let err = programmer.run(&set, &mut NoProgress).unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
        assert_eq!(programmer.stage(), Stage::ConfigureBootloader);
    }
}
