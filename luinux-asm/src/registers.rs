//! Register identity.
//!
//! The processor has 17 named 16-bit registers. Their ordinals are not
//! cosmetic: they are packed as 4-bit nibbles directly into instruction
//! words, and they address the register's storage inside the internal
//! 256-byte memory block (`ordinal * 2`).

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Identity of one of the processor's 17 registers.
///
/// Ordinals are fixed by the instruction encoding: `RAC=0 .. R11=16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum RegisterId {
    /// Accumulator. Implicit destination of the 2-arg indirect ALU variants.
    RAC = 0,
    /// Flags register.
    RFL = 1,
    /// Instruction pointer.
    RIP = 2,
    /// Stack pointer.
    RSP = 3,
    /// Base pointer.
    RBP = 4,
    R0 = 5,
    R1 = 6,
    R2 = 7,
    R3 = 8,
    R4 = 9,
    R5 = 10,
    R6 = 11,
    R7 = 12,
    R8 = 13,
    R9 = 14,
    R10 = 15,
    R11 = 16,
}

/// Number of addressable registers.
pub const REGISTER_COUNT: usize = 17;

impl RegisterId {
    /// All register identities, in ordinal order.
    pub const ALL: [RegisterId; REGISTER_COUNT] = [
        RegisterId::RAC,
        RegisterId::RFL,
        RegisterId::RIP,
        RegisterId::RSP,
        RegisterId::RBP,
        RegisterId::R0,
        RegisterId::R1,
        RegisterId::R2,
        RegisterId::R3,
        RegisterId::R4,
        RegisterId::R5,
        RegisterId::R6,
        RegisterId::R7,
        RegisterId::R8,
        RegisterId::R9,
        RegisterId::R10,
        RegisterId::R11,
    ];

    /// The register's ordinal, as packed into instruction words.
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// The register's offset in the internal 256-byte memory block.
    pub const fn memory_offset(self) -> u16 {
        (self.ordinal() as u16) * 2
    }

    /// Recover a register from a 4-bit operand nibble decoded out of an
    /// instruction word.
    pub fn from_ordinal(ordinal: u8) -> Option<RegisterId> {
        RegisterId::ALL.into_iter().find(|r| r.ordinal() == ordinal)
    }

    /// The mnemonic name used in assembly source (`"RAC"`, `"R0"`, ...).
    pub fn name(self) -> &'static str {
        match self {
            RegisterId::RAC => "RAC",
            RegisterId::RFL => "RFL",
            RegisterId::RIP => "RIP",
            RegisterId::RSP => "RSP",
            RegisterId::RBP => "RBP",
            RegisterId::R0 => "R0",
            RegisterId::R1 => "R1",
            RegisterId::R2 => "R2",
            RegisterId::R3 => "R3",
            RegisterId::R4 => "R4",
            RegisterId::R5 => "R5",
            RegisterId::R6 => "R6",
            RegisterId::R7 => "R7",
            RegisterId::R8 => "R8",
            RegisterId::R9 => "R9",
            RegisterId::R10 => "R10",
            RegisterId::R11 => "R11",
        }
    }
}

/// `register_name -> RegisterId`, used by the assembler to resolve operand
/// tokens.
pub static REGISTER_NAMES: Lazy<HashMap<&'static str, RegisterId>> = Lazy::new(|| {
    RegisterId::ALL.into_iter().map(|r| (r.name(), r)).collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_dense_and_match_offsets() {
        for (i, r) in RegisterId::ALL.into_iter().enumerate() {
            assert_eq!(r.ordinal(), i as u8);
            assert_eq!(r.memory_offset(), (i as u16) * 2);
        }
    }

    #[test]
    fn name_round_trips_through_the_table() {
        for r in RegisterId::ALL {
            assert_eq!(REGISTER_NAMES.get(r.name()), Some(&r));
        }
    }

    #[test]
    fn from_ordinal_round_trips() {
        for r in RegisterId::ALL {
            assert_eq!(RegisterId::from_ordinal(r.ordinal()), Some(r));
        }
        assert_eq!(RegisterId::from_ordinal(17), None);
    }
}
