//! Fetch-decode-execute interpreter for the luinux 16-bit processor.
//!
//! Builds on the opcode tables and decode algorithm in `luinux-asm` to
//! drive a live register file and memory against a loaded program image.

mod error;
mod interpreter;
mod memory;
mod registers;

pub use error::RuntimeError;
pub use interpreter::{ExecutionOutcome, Phase, Processor};
pub use memory::{Memory, NvMemory};
pub use registers::RegisterFile;
