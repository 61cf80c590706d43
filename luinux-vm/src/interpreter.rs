//! Fetch-decode-execute loop and instruction dispatch.
//!
//! `Processor` owns every piece of state a running program can touch:
//! program memory, the bank-switched data memory (SRAM or NVRAM), the
//! register file, and the scratch left behind by the current cycle's
//! decode step. Instruction semantics live in the `alu`, `flow`,
//! `mem_ops`, `single`, `stack`, and `control` submodules; this module
//! only drives the cycle and dispatches.

mod alu;
mod control;
mod flow;
mod mem_ops;
mod single;
mod stack;

use luinux_asm::{decode_word, Flags, OpcodeId, RegisterId};

use crate::error::RuntimeError;
use crate::memory::{Memory, NvMemory};
use crate::registers::RegisterFile;

/// Initial stack pointer: the stack grows upward from here.
const INITIAL_RSP: u16 = 0xFE00;

/// Where the current cycle is in `fetch -> decode -> execute -> return`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Fetch,
    Decode,
    Execute,
    Halted,
}

/// Addressing mode of one operand: read/write the register directly, or
/// dereference it as an address into the active data memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Reg,
    Mem,
}

#[derive(Debug, Default, Clone)]
struct DecodeScratch {
    opcode: Option<OpcodeId>,
    operands: Vec<RegisterId>,
    literal: Option<u16>,
}

/// Outcome of running a program to the next stopping point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// `STOP` was reached; the processor will not execute further cycles.
    Halted,
    /// `TRAP` was reached; `RFL.Trap` is set and the host may resume by
    /// clearing it and calling `execute_all` again.
    Trapped,
}

/// The luinux processor: program memory, data memory, registers, and the
/// fetch-decode-execute cycle.
pub struct Processor {
    program: Memory,
    sram: Memory,
    nvram: Option<NvMemory>,
    registers: RegisterFile,
    scratch: DecodeScratch,
    phase: Phase,
}

impl Processor {
    /// Build a processor over a program image, with an optional NVRAM
    /// backing store. `RIP` starts at 0, `RSP` at [`INITIAL_RSP`].
    pub fn new(program: &[u8], nvram: Option<NvMemory>) -> Self {
        let mut registers = RegisterFile::new();
        registers.write(RegisterId::RSP, INITIAL_RSP);
        registers.write(RegisterId::RIP, 0);

        Processor {
            program: Memory::from_bytes(program.to_vec()),
            sram: Memory::new(),
            nvram,
            registers,
            scratch: DecodeScratch::default(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Run cycles until `STOP` halts the processor or `TRAP` sets the
    /// Trap flag. Call again after inspecting (and optionally clearing)
    /// the Trap flag to resume.
    pub fn execute_all(&mut self) -> Result<ExecutionOutcome, RuntimeError> {
        loop {
            self.cycle()?;
            if self.phase == Phase::Halted {
                return Ok(ExecutionOutcome::Halted);
            }
            if self.flags().contains(Flags::TRAP) {
                return Ok(ExecutionOutcome::Trapped);
            }
        }
    }

    #[tracing::instrument(name = "cycle", skip(self))]
    fn cycle(&mut self) -> Result<(), RuntimeError> {
        if self.scratch.opcode.is_some() {
            return Err(RuntimeError::CycleUnclean);
        }

        self.phase = Phase::Fetch;
        let word = self.fetch()?;

        self.phase = Phase::Decode;
        self.decode(word)?;

        self.phase = Phase::Execute;
        let opcode = self.scratch.opcode.expect("just decoded");
        tracing::trace!(?opcode, operands = ?self.scratch.operands, literal = ?self.scratch.literal, "cycle");
        self.execute(opcode)?;

        self.cleanup();
        Ok(())
    }

    fn fetch(&mut self) -> Result<u16, RuntimeError> {
        let rip = self.registers.read(RegisterId::RIP);
        let word = self.program.read16(rip)?;
        self.registers.write(RegisterId::RIP, rip.wrapping_add(2));
        Ok(word)
    }

    fn decode(&mut self, word: u16) -> Result<(), RuntimeError> {
        let decoded = decode_word(word)?;
        let literal = if luinux_asm::takes_literal(decoded.id) {
            Some(self.fetch()?)
        } else {
            None
        };
        self.scratch = DecodeScratch {
            opcode: Some(decoded.id),
            operands: decoded.operands,
            literal,
        };
        Ok(())
    }

    fn cleanup(&mut self) {
        self.scratch = DecodeScratch::default();
        if self.phase != Phase::Halted {
            self.phase = Phase::Idle;
        }
    }

    fn execute(&mut self, id: OpcodeId) -> Result<(), RuntimeError> {
        let ops = self.scratch.operands.clone();
        let literal = self.scratch.literal;
        use alu::AluOp;
        use flow::{Cmp, Cond};
        use Mode::{Mem, Reg};
        use OpcodeId::*;

        match id {
            Add => alu::alu3(self, AluOp::Add, ops[0], ops[1], ops[2]),
            Sub => alu::alu3(self, AluOp::Sub, ops[0], ops[1], ops[2]),
            Mul => alu::alu3(self, AluOp::Mul, ops[0], ops[1], ops[2]),
            Div => alu::alu3(self, AluOp::Div, ops[0], ops[1], ops[2]),
            And => alu::alu3(self, AluOp::And, ops[0], ops[1], ops[2]),
            Or => alu::alu3(self, AluOp::Or, ops[0], ops[1], ops[2]),
            Xor => alu::alu3(self, AluOp::Xor, ops[0], ops[1], ops[2]),

            AddRm => alu::alu2(self, AluOp::Add, Reg, Mem, ops[0], ops[1]),
            AddMr => alu::alu2(self, AluOp::Add, Mem, Reg, ops[0], ops[1]),
            AddMm => alu::alu2(self, AluOp::Add, Mem, Mem, ops[0], ops[1]),
            SubRm => alu::alu2(self, AluOp::Sub, Reg, Mem, ops[0], ops[1]),
            SubMr => alu::alu2(self, AluOp::Sub, Mem, Reg, ops[0], ops[1]),
            SubMm => alu::alu2(self, AluOp::Sub, Mem, Mem, ops[0], ops[1]),
            MulRm => alu::alu2(self, AluOp::Mul, Reg, Mem, ops[0], ops[1]),
            MulMr => alu::alu2(self, AluOp::Mul, Mem, Reg, ops[0], ops[1]),
            MulMm => alu::alu2(self, AluOp::Mul, Mem, Mem, ops[0], ops[1]),
            DivRm => alu::alu2(self, AluOp::Div, Reg, Mem, ops[0], ops[1]),
            DivMr => alu::alu2(self, AluOp::Div, Mem, Reg, ops[0], ops[1]),
            DivMm => alu::alu2(self, AluOp::Div, Mem, Mem, ops[0], ops[1]),
            AndRm => alu::alu2(self, AluOp::And, Reg, Mem, ops[0], ops[1]),
            AndMr => alu::alu2(self, AluOp::And, Mem, Reg, ops[0], ops[1]),
            AndMm => alu::alu2(self, AluOp::And, Mem, Mem, ops[0], ops[1]),
            OrRm => alu::alu2(self, AluOp::Or, Reg, Mem, ops[0], ops[1]),
            OrMr => alu::alu2(self, AluOp::Or, Mem, Reg, ops[0], ops[1]),
            OrMm => alu::alu2(self, AluOp::Or, Mem, Mem, ops[0], ops[1]),
            XorRm => alu::alu2(self, AluOp::Xor, Reg, Mem, ops[0], ops[1]),
            XorMr => alu::alu2(self, AluOp::Xor, Mem, Reg, ops[0], ops[1]),
            XorMm => alu::alu2(self, AluOp::Xor, Mem, Mem, ops[0], ops[1]),

            Jz => flow::branch_if(self, ops[0], ops[1], Reg, Reg, Cond::Zero),
            Jnz => flow::branch_if(self, ops[0], ops[1], Reg, Reg, Cond::NonZero),
            JzRm => flow::branch_if(self, ops[0], ops[1], Reg, Mem, Cond::Zero),
            JzMr => flow::branch_if(self, ops[0], ops[1], Mem, Reg, Cond::Zero),
            JzMm => flow::branch_if(self, ops[0], ops[1], Mem, Mem, Cond::Zero),
            JnzRm => flow::branch_if(self, ops[0], ops[1], Reg, Mem, Cond::NonZero),
            JnzMr => flow::branch_if(self, ops[0], ops[1], Mem, Reg, Cond::NonZero),
            JnzMm => flow::branch_if(self, ops[0], ops[1], Mem, Mem, Cond::NonZero),
            Je => flow::compare_branch(self, ops[0], ops[1], Cmp::Eq),
            Jne => flow::compare_branch(self, ops[0], ops[1], Cmp::Ne),
            Jmp => flow::jump(self, literal.expect("JMP always carries a literal")),

            Mov => mem_ops::mov(self, ops[0], ops[1], Reg, Reg),
            MovRm => mem_ops::mov(self, ops[0], ops[1], Reg, Mem),
            MovMr => mem_ops::mov(self, ops[0], ops[1], Mem, Reg),
            MovMm => mem_ops::mov(self, ops[0], ops[1], Mem, Mem),
            Load => mem_ops::load(self, ops[0], ops[1]),
            Stor => mem_ops::stor(self, ops[0], ops[1]),
            Tstb => mem_ops::tstb(self, ops[0], ops[1], Reg),
            TstbM => mem_ops::tstb(self, ops[0], ops[1], Mem),

            Setz => single::setz(self, ops[0], Reg),
            SetzM => single::setz(self, ops[0], Mem),
            Seto => single::seto(self, ops[0], Reg),
            SetoM => single::seto(self, ops[0], Mem),
            Set => single::set(self, ops[0], literal.expect("SET always carries a literal"), Reg),
            SetM => single::set(self, ops[0], literal.expect("SET_M always carries a literal"), Mem),
            Not => single::not(self, ops[0], Reg),
            NotM => single::not(self, ops[0], Mem),
            Shfr => single::shfr(self, ops[0], Reg),
            ShfrM => single::shfr(self, ops[0], Mem),
            Shfl => single::shfl(self, ops[0], Reg),
            ShflM => single::shfl(self, ops[0], Mem),
            Inc => single::inc(self, ops[0], Reg),
            IncM => single::inc(self, ops[0], Mem),
            Dec => single::dec(self, ops[0], Reg),
            DecM => single::dec(self, ops[0], Mem),

            Push => stack::push(self, ops[0], Reg),
            PushM => stack::push(self, ops[0], Mem),
            Pop => stack::pop(self, ops[0], Reg),
            PopM => stack::pop(self, ops[0], Mem),

            Nop => control::nop(self),
            Stop => control::stop(self),
            Trap => control::trap(self),
            Swm => control::swm(self),
        }
    }

    pub(crate) fn reg_read(&self, id: RegisterId) -> u16 {
        self.registers.read(id)
    }

    pub(crate) fn reg_write(&mut self, id: RegisterId, value: u16) {
        self.registers.write(id, value)
    }

    pub(crate) fn flags(&self) -> Flags {
        self.registers.flags()
    }

    pub(crate) fn set_flags(&mut self, flags: Flags) {
        self.registers.set_flags(flags)
    }

    pub(crate) fn set_halted(&mut self) {
        self.phase = Phase::Halted;
    }

    pub(crate) fn nvram_mut(&mut self) -> Option<&mut NvMemory> {
        self.nvram.as_mut()
    }

    fn data_memory(&self) -> Result<&Memory, RuntimeError> {
        if self.flags().contains(Flags::MEMORY) {
            self.nvram
                .as_deref()
                .ok_or(RuntimeError::NoNVRam)
        } else {
            Ok(&self.sram)
        }
    }

    fn data_memory_mut(&mut self) -> Result<&mut Memory, RuntimeError> {
        if self.flags().contains(Flags::MEMORY) {
            self.nvram
                .as_deref_mut()
                .ok_or(RuntimeError::NoNVRam)
        } else {
            Ok(&mut self.sram)
        }
    }

    /// Read `id`'s value directly from the register whose value is an
    /// address, dereferenced through the active data memory bank.
    pub(crate) fn mem_read(&self, id: RegisterId) -> Result<u16, RuntimeError> {
        let addr = self.reg_read(id);
        self.data_memory()?.read16(addr)
    }

    pub(crate) fn mem_write(&mut self, id: RegisterId, value: u16) -> Result<(), RuntimeError> {
        let addr = self.reg_read(id);
        self.data_memory_mut()?.write16(addr, value)
    }

    pub(crate) fn read_mode(&self, mode: Mode, reg: RegisterId) -> Result<u16, RuntimeError> {
        match mode {
            Mode::Reg => Ok(self.reg_read(reg)),
            Mode::Mem => self.mem_read(reg),
        }
    }

    pub(crate) fn write_mode(
        &mut self,
        mode: Mode,
        reg: RegisterId,
        value: u16,
    ) -> Result<(), RuntimeError> {
        match mode {
            Mode::Reg => {
                self.reg_write(reg, value);
                Ok(())
            }
            Mode::Mem => self.mem_write(reg, value),
        }
    }

    /// Direct access to SRAM, for hosts loading test fixtures before a run.
    pub fn sram_mut(&mut self) -> &mut Memory {
        &mut self.sram
    }

    pub fn sram(&self) -> &Memory {
        &self.sram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use luinux_asm::Assembler;

    fn run(source: &str) -> Processor {
        let program = Assembler::new().assemble(source).unwrap();
        let mut proc = Processor::new(&program, None);
        proc.execute_all().unwrap();
        proc
    }

    #[test]
    fn ten_iteration_loop_leaves_both_counters_at_ten() {
        let proc = run(
            "\
SET R0, 10
SET R10, 0
goto:R2
INC R10
SUB R0, R10, R1
JNZ R1, R2
STOP
",
        );
        assert_eq!(proc.reg_read(RegisterId::R0), 10);
        assert_eq!(proc.reg_read(RegisterId::R10), 10);
        assert_eq!(proc.phase(), Phase::Halted);
    }

    #[test]
    fn alu_sequence_computes_the_expected_result() {
        let proc = run(
            "\
SET R0, 2
SET R1, 3
SET R2, 5
SET R3, 6
ADD R0, R1, R10
MUL R10, R1, R10
SUB R10, R3, R10
DIV R10, R1, R10
STOP
",
        );
        assert_eq!(proc.reg_read(RegisterId::R10), 3);
    }

    #[test]
    fn indirect_dereference_reads_a_big_endian_word_from_sram() {
        let program = Assembler::new().assemble("LOAD R0, R1\nSTOP\n").unwrap();
        let mut proc = Processor::new(&program, None);
        proc.reg_write(RegisterId::R0, 0xDEAD);
        proc.sram_mut().write8(0xDEAD, 0xBE).unwrap();
        proc.sram_mut().write8(0xDEAE, 0xEF).unwrap();
        proc.execute_all().unwrap();
        assert_eq!(proc.reg_read(RegisterId::R1), 0xBEEF);
    }

    #[test]
    fn trap_pauses_without_clearing_the_flag_and_execute_all_resumes() {
        let program = Assembler::new().assemble("TRAP\nSTOP\n").unwrap();
        let mut proc = Processor::new(&program, None);

        let outcome = proc.execute_all().unwrap();
        assert_eq!(outcome, ExecutionOutcome::Trapped);
        assert!(proc.flags().contains(Flags::TRAP));

        let mut flags = proc.flags();
        flags.remove(Flags::TRAP);
        proc.set_flags(flags);

        let outcome = proc.execute_all().unwrap();
        assert_eq!(outcome, ExecutionOutcome::Halted);
    }

    #[test]
    fn swm_without_nvram_fails() {
        let program = Assembler::new().assemble("SWM\n").unwrap();
        let mut proc = Processor::new(&program, None);
        let err = proc.execute_all().unwrap_err();
        assert!(matches!(err, RuntimeError::NoNVRam));
    }

    #[test]
    fn and_r0_r1_r2_matches_the_known_encoding_through_execution() {
        let program = Assembler::new()
            .assemble("SET R0, h'f0f0\nSET R1, h'0ff0\nAND R0, R1, R2\nSTOP\n")
            .unwrap();
        let mut proc = Processor::new(&program, None);
        proc.execute_all().unwrap();
        assert_eq!(proc.reg_read(RegisterId::R2), 0x00f0);
    }
}
