//! Data movement and bit-test instructions: `MOV`, `LOAD`, `STOR`, `TSTB`.

use luinux_asm::{Flags, RegisterId};

use super::{Mode, Processor};
use crate::error::RuntimeError;

/// `MOV A, B` (and its `_RM/_MR/_MM` variants): `B <- A`. Destination is
/// the second operand.
pub(super) fn mov(
    proc: &mut Processor,
    a: RegisterId,
    b: RegisterId,
    mode_a: Mode,
    mode_b: Mode,
) -> Result<(), RuntimeError> {
    let value = proc.read_mode(mode_a, a)?;
    proc.write_mode(mode_b, b, value)
}

/// `LOAD R0, R1`: `R1 <- data_memory.read16(R0.read())`.
pub(super) fn load(proc: &mut Processor, r0: RegisterId, r1: RegisterId) -> Result<(), RuntimeError> {
    let value = proc.mem_read(r0)?;
    proc.reg_write(r1, value);
    Ok(())
}

/// `STOR R0, R1`: `data_memory.write16(R1.read(), R0.read())` — the value
/// of `R0` is stored at the address held in `R1`.
pub(super) fn stor(proc: &mut Processor, r0: RegisterId, r1: RegisterId) -> Result<(), RuntimeError> {
    let value = proc.reg_read(r0);
    proc.mem_write(r1, value)
}

/// `TSTB R0, R1` (and `TSTB_M`, which dereferences operand 1): set
/// `RFL.Zero` to the bit of `R1` at index `R0`.
pub(super) fn tstb(
    proc: &mut Processor,
    r0: RegisterId,
    r1: RegisterId,
    mode1: Mode,
) -> Result<(), RuntimeError> {
    let bit_index = proc.reg_read(r0) & 0xF;
    let value = proc.read_mode(mode1, r1)?;
    let bit = (value >> bit_index) & 1;

    let mut flags = proc.flags();
    flags.set(Flags::ZERO, bit != 0);
    proc.set_flags(flags);
    Ok(())
}
