//! `PUSH`/`POP` and their `_M` variants. The stack grows upward from
//! `0xFE00`; nothing here checks for overflow.

use luinux_asm::RegisterId;

use super::{Mode, Processor};
use crate::error::RuntimeError;

pub(super) fn push(proc: &mut Processor, r: RegisterId, mode: Mode) -> Result<(), RuntimeError> {
    let value = proc.read_mode(mode, r)?;
    let sp = proc.reg_read(RegisterId::RSP);
    proc.mem_write(RegisterId::RSP, value)?;
    proc.reg_write(RegisterId::RSP, sp.wrapping_add(2));
    Ok(())
}

pub(super) fn pop(proc: &mut Processor, r: RegisterId, mode: Mode) -> Result<(), RuntimeError> {
    let sp = proc.reg_read(RegisterId::RSP).wrapping_sub(2);
    proc.reg_write(RegisterId::RSP, sp);
    let value = proc.mem_read(RegisterId::RSP)?;
    proc.write_mode(mode, r, value)
}
