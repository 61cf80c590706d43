//! ALU instructions: the 3-arg register-only family and its 2-arg
//! indirect-addressing variants.

use luinux_asm::RegisterId;

use super::{Mode, Processor};
use crate::error::RuntimeError;

#[derive(Debug, Clone, Copy)]
pub(super) enum AluOp {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
}

fn apply(op: AluOp, a: u16, b: u16) -> u16 {
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Mul => a.wrapping_mul(b),
        // Division by zero is left to inherit Rust's own panic, exactly as
        // the source left it undefined.
        AluOp::Div => a / b,
        AluOp::And => a & b,
        AluOp::Or => a | b,
        AluOp::Xor => a ^ b,
    }
}

/// `op R0, R1, R2` -> `R2 <- R0 op R1`.
pub(super) fn alu3(
    proc: &mut Processor,
    op: AluOp,
    r0: RegisterId,
    r1: RegisterId,
    r2: RegisterId,
) -> Result<(), RuntimeError> {
    let a = proc.reg_read(r0);
    let b = proc.reg_read(r1);
    proc.reg_write(r2, apply(op, a, b));
    Ok(())
}

/// `op_XY R0, R1` -> `RAC <- op0(R0) op op1(R1)`, result always to the
/// accumulator.
pub(super) fn alu2(
    proc: &mut Processor,
    op: AluOp,
    mode0: Mode,
    mode1: Mode,
    r0: RegisterId,
    r1: RegisterId,
) -> Result<(), RuntimeError> {
    let a = proc.read_mode(mode0, r0)?;
    let b = proc.read_mode(mode1, r1)?;
    proc.reg_write(RegisterId::RAC, apply(op, a, b));
    Ok(())
}
