//! The processor's flag register (`RFL`).
//!
//! Flags are bit positions within a 16-bit word, not a fixed-width struct,
//! so the representation is a [`bitflags`]-backed wrapper rather than a
//! `#[repr(u16)]` enum.

use bitflags::bitflags;

bitflags! {
    /// Bit positions of the `RFL` register.
    ///
    ///  15 .. 8         7      6      5      4         3     2          1      0
    ///  unused        Memory Except. Overflow Reserved Trap Negative  Carry   Zero
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Flags: u16 {
        /// Set by `TSTB`/`TSTB_M` to the tested bit; cleared otherwise by convention.
        const ZERO = 0x0001;
        /// Declared; no defined instruction currently sets it.
        const CARRY = 0x0002;
        /// Declared; no defined instruction currently sets it.
        const NEGATIVE = 0x0004;
        /// Set by `TRAP`; cleared only by the host between `execute_all` calls.
        const TRAP = 0x0008;
        /// Declared; no defined instruction currently sets it.
        const RESERVED = 0x0010;
        /// Declared; no defined instruction currently sets it (stack growth is unchecked).
        const STACK_OVERFLOW = 0x0020;
        /// Declared; no defined instruction currently sets it.
        const EXCEPTION = 0x0040;
        /// Toggled by `SWM`. When set, the processor's data memory is NVRAM instead of SRAM.
        const MEMORY = 0x0080;
    }
}

impl Flags {
    /// Read the flag register's raw 16-bit value, as stored in `RFL`.
    pub fn to_word(self) -> u16 {
        self.bits()
    }

    /// Reconstruct flags from the raw 16-bit value stored in `RFL`.
    ///
    /// Unrecognized bits are preserved rather than rejected: the flag
    /// register is just a word, and nothing stops a program from writing to
    /// it directly with `SET RFL, ...`.
    pub fn from_word(word: u16) -> Flags {
        Flags::from_bits_retain(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_raw_word() {
        let flags = Flags::ZERO | Flags::TRAP | Flags::MEMORY;
        assert_eq!(Flags::from_word(flags.to_word()), flags);
    }

    #[test]
    fn preserves_bits_outside_the_known_set() {
        let word = 0xFFFF;
        assert_eq!(Flags::from_word(word).to_word(), word);
    }
}
