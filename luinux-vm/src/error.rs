//! Runtime error taxonomy.

use thiserror::Error;

use luinux_asm::DecodeError;

/// Failure encountered while running a program.
///
/// None of these are recoverable mid-execution: `execute_all` propagates the
/// first one it sees via `?`. `TRAP` is deliberately not a variant here — it
/// is a cooperative pause, not a failure.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An instruction word didn't match any opcode.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A memory access fell outside the addressable 64 KiB range.
    #[error("address {addr:#06x} is out of range for a {size}-byte space")]
    OutOfRange {
        /// The offending address.
        addr: u32,
        /// The size of the space it was checked against.
        size: usize,
    },
    /// A new cycle began with leftover decode scratch from a prior one.
    #[error("cycle began with unclean decode scratch")]
    CycleUnclean,
    /// `SWM` executed with no NVRAM configured.
    #[error("SWM requires a configured NVRAM backing store")]
    NoNVRam,
    /// NVRAM file I/O failed on a caller-invoked path (construction or explicit `flush()`).
    #[error("NVRAM I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
