//! Progress reporting for long-running flash operations
//!
//! The programmers report byte-level progress through this trait so the CLI
//! can render a bar without the core crate depending on a terminal library.

/// Receiver for flash-write progress events.
pub trait FlashProgress {
    /// A phase moving `total_bytes` is starting.
    fn begin(&mut self, total_bytes: usize, phase: &'static str) {
        let _ = (total_bytes, phase);
    }

    /// `bytes_done` bytes of the current phase have been transferred.
    fn advance(&mut self, bytes_done: usize) {
        let _ = bytes_done;
    }

    /// The current phase finished.
    fn finish(&mut self) {}
}

/// No-op progress sink.
pub struct NoProgress;

impl FlashProgress for NoProgress {}
