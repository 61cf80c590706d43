//! Branching instructions.

use luinux_asm::RegisterId;

use super::{Mode, Processor};
use crate::error::RuntimeError;

#[derive(Debug, Clone, Copy)]
pub(super) enum Cond {
    Zero,
    NonZero,
}

#[derive(Debug, Clone, Copy)]
pub(super) enum Cmp {
    Eq,
    Ne,
}

/// `JZ`/`JNZ` and their `_RM/_MR/_MM` variants: test operand 0, jump to
/// operand 1's value if the condition holds.
pub(super) fn branch_if(
    proc: &mut Processor,
    r_test: RegisterId,
    r_target: RegisterId,
    mode_test: Mode,
    mode_target: Mode,
    cond: Cond,
) -> Result<(), RuntimeError> {
    let tested = proc.read_mode(mode_test, r_test)?;
    let taken = match cond {
        Cond::Zero => tested == 0,
        Cond::NonZero => tested != 0,
    };
    if taken {
        let target = proc.read_mode(mode_target, r_target)?;
        proc.reg_write(RegisterId::RIP, target);
    }
    Ok(())
}

/// `JE`/`JNE`: compare operand 0 against `RAC`, jump to operand 1 on
/// equal/not-equal.
pub(super) fn compare_branch(
    proc: &mut Processor,
    r_test: RegisterId,
    r_target: RegisterId,
    cmp: Cmp,
) -> Result<(), RuntimeError> {
    let lhs = proc.reg_read(r_test);
    let rhs = proc.reg_read(RegisterId::RAC);
    let taken = match cmp {
        Cmp::Eq => lhs == rhs,
        Cmp::Ne => lhs != rhs,
    };
    if taken {
        let target = proc.reg_read(r_target);
        proc.reg_write(RegisterId::RIP, target);
    }
    Ok(())
}

/// `JMP <literal>`: unconditional, sets `RIP` directly.
pub(super) fn jump(proc: &mut Processor, literal: u16) -> Result<(), RuntimeError> {
    proc.reg_write(RegisterId::RIP, literal);
    Ok(())
}
