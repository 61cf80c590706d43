//! Opcode identity and the variable-width pack/unpack algorithm.
//!
//! The opcode field of an instruction word is **not** fixed width: depending
//! on how many register operands a mnemonic takes, the opcode occupies the
//! high 16, 12, 8, or 4 bits of the word. [`Descriptor::value`] is always the
//! *unshifted* opcode number (e.g. `0x0` for `ADD`, `0x762` for `SET`); the
//! shift amount is derived from `arg_count`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::DecodeError;
use crate::registers::RegisterId;

/// Width in bits of one packed register operand.
pub const REGISTER_WIDTH_BITS: u32 = 4;

/// Identity of one of the ~70 instructions the processor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpcodeId {
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Jz,
    Jnz,
    Je,
    Jne,
    Mov,
    Load,
    Stor,
    Tstb,
    TstbM,
    AddRm,
    AddMr,
    AddMm,
    SubRm,
    SubMr,
    SubMm,
    MulRm,
    MulMr,
    MulMm,
    DivRm,
    DivMr,
    DivMm,
    AndRm,
    AndMr,
    AndMm,
    OrRm,
    OrMr,
    OrMm,
    XorRm,
    XorMr,
    XorMm,
    JzRm,
    JzMr,
    JzMm,
    JnzRm,
    JnzMr,
    JnzMm,
    MovRm,
    MovMr,
    MovMm,
    Setz,
    Seto,
    Set,
    Push,
    Pop,
    Not,
    Shfr,
    Shfl,
    Inc,
    Dec,
    SetzM,
    SetoM,
    SetM,
    PushM,
    PopM,
    NotM,
    ShfrM,
    ShflM,
    IncM,
    DecM,
    Nop,
    Stop,
    Trap,
    Swm,
    Jmp,
}

/// `{ opcode value, argument count }` for one mnemonic.
///
/// `value` is the unshifted opcode number: the encoded word is
/// `value << (4 * arg_count) | operands`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub id: OpcodeId,
    pub value: u16,
    pub arg_count: u8,
}

/// Mnemonics that additionally consume a trailing 16-bit literal word.
///
/// `SET`/`SET_M` take one register ordinal plus the literal; `JMP` takes
/// only the literal.
pub fn takes_literal(id: OpcodeId) -> bool {
    matches!(id, OpcodeId::Set | OpcodeId::SetM | OpcodeId::Jmp)
}

macro_rules! opcode_table {
    ($( $mnemonic:literal => $variant:ident, $value:expr, $arity:expr );* $(;)?) => {
        const DESCRIPTOR_LIST: &[Descriptor] = &[
            $( Descriptor { id: OpcodeId::$variant, value: $value, arg_count: $arity } ),*
        ];

        /// `mnemonic -> OpcodeId`, used by the assembler to resolve the first
        /// token of a line.
        pub static MNEMONICS: Lazy<HashMap<&'static str, OpcodeId>> = Lazy::new(|| {
            [ $( ($mnemonic, OpcodeId::$variant) ),* ].into_iter().collect()
        });

        /// `OpcodeId -> mnemonic`, used for logging and error messages.
        pub fn mnemonic(id: OpcodeId) -> &'static str {
            match id {
                $( OpcodeId::$variant => $mnemonic, )*
            }
        }
    };
}

opcode_table! {
    "ADD" => Add, 0x0, 3;
    "SUB" => Sub, 0x1, 3;
    "MUL" => Mul, 0x2, 3;
    "DIV" => Div, 0x3, 3;
    "AND" => And, 0x4, 3;
    "OR" => Or, 0x5, 3;
    "XOR" => Xor, 0x6, 3;

    "JZ" => Jz, 0x70, 2;
    "JNZ" => Jnz, 0x71, 2;
    "MOV" => Mov, 0x72, 2;
    "LOAD" => Load, 0x73, 2;
    "STOR" => Stor, 0x74, 2;
    "TSTB" => Tstb, 0x75, 2;

    "ADD_RM" => AddRm, 0x77, 2;
    "ADD_MR" => AddMr, 0x78, 2;
    "ADD_MM" => AddMm, 0x79, 2;
    "SUB_RM" => SubRm, 0x7a, 2;
    "SUB_MR" => SubMr, 0x7b, 2;
    "SUB_MM" => SubMm, 0x7c, 2;
    "MUL_RM" => MulRm, 0x7d, 2;
    "MUL_MR" => MulMr, 0x7e, 2;
    "MUL_MM" => MulMm, 0x7f, 2;
    "DIV_RM" => DivRm, 0x80, 2;
    "DIV_MR" => DivMr, 0x81, 2;
    "DIV_MM" => DivMm, 0x82, 2;
    "AND_RM" => AndRm, 0x83, 2;
    "AND_MR" => AndMr, 0x84, 2;
    "AND_MM" => AndMm, 0x85, 2;
    "OR_RM" => OrRm, 0x86, 2;
    "OR_MR" => OrMr, 0x87, 2;
    "OR_MM" => OrMm, 0x88, 2;
    "XOR_RM" => XorRm, 0x89, 2;
    "XOR_MR" => XorMr, 0x8a, 2;
    "XOR_MM" => XorMm, 0x8b, 2;
    "JZ_RM" => JzRm, 0x8c, 2;
    "JZ_MR" => JzMr, 0x8d, 2;
    "JZ_MM" => JzMm, 0x8e, 2;
    "JNZ_RM" => JnzRm, 0x8f, 2;
    "JNZ_MR" => JnzMr, 0x90, 2;
    "JNZ_MM" => JnzMm, 0x91, 2;
    "MOV_RM" => MovRm, 0x92, 2;
    "MOV_MR" => MovMr, 0x93, 2;
    "MOV_MM" => MovMm, 0x94, 2;
    "TSTB_M" => TstbM, 0x95, 2;

    "JE" => Je, 0x97, 2;
    "JNE" => Jne, 0x98, 2;

    "SETZ" => Setz, 0x760, 1;
    "SETO" => Seto, 0x761, 1;
    "SET" => Set, 0x762, 1;
    "PUSH" => Push, 0x763, 1;
    "POP" => Pop, 0x764, 1;
    "NOT" => Not, 0x765, 1;
    "SHFR" => Shfr, 0x766, 1;
    "SHFL" => Shfl, 0x767, 1;
    "INC" => Inc, 0x768, 1;
    "DEC" => Dec, 0x963, 1;

    "SETZ_M" => SetzM, 0x76a, 1;
    "SETO_M" => SetoM, 0x76b, 1;
    "SET_M" => SetM, 0x76c, 1;
    "PUSH_M" => PushM, 0x76d, 1;
    "POP_M" => PopM, 0x76e, 1;
    "NOT_M" => NotM, 0x76f, 1;
    "SHFR_M" => ShfrM, 0x960, 1;
    "SHFL_M" => ShflM, 0x961, 1;
    "INC_M" => IncM, 0x962, 1;
    "DEC_M" => DecM, 0x964, 1;

    "NOP" => Nop, 0x7690, 0;
    "STOP" => Stop, 0x7691, 0;
    "TRAP" => Trap, 0x7692, 0;
    "SWM" => Swm, 0x7693, 0;
    "JMP" => Jmp, 0x7694, 0;
}

/// `OpcodeId -> Descriptor`.
pub static DESCRIPTORS_BY_ID: Lazy<HashMap<OpcodeId, Descriptor>> =
    Lazy::new(|| DESCRIPTOR_LIST.iter().map(|d| (d.id, *d)).collect());

/// `opcode value -> OpcodeId`, the inverse table the decoder probes.
static VALUES: Lazy<HashMap<u16, OpcodeId>> =
    Lazy::new(|| DESCRIPTOR_LIST.iter().map(|d| (d.value, d.id)).collect());

/// Look up a mnemonic's descriptor.
pub fn descriptor_for_mnemonic(mnemonic: &str) -> Option<Descriptor> {
    MNEMONICS
        .get(mnemonic)
        .and_then(|id| DESCRIPTORS_BY_ID.get(id))
        .copied()
}

/// Pack an opcode and its register operands (most-significant operand
/// first) into one instruction word.
///
/// `operands.len()` must equal the descriptor's `arg_count`; this is an
/// invariant of the caller (the assembler only ever builds operand lists of
/// the right length), not something this function validates.
pub fn pack(descriptor: Descriptor, operands: &[RegisterId]) -> u16 {
    let shift = REGISTER_WIDTH_BITS * descriptor.arg_count as u32;
    let mut word = descriptor.value << shift;
    for (i, reg) in operands.iter().enumerate() {
        let nibble_shift = REGISTER_WIDTH_BITS * (descriptor.arg_count as u32 - 1 - i as u32);
        word |= (reg.ordinal() as u16) << nibble_shift;
    }
    word
}

/// A decoded instruction word: the opcode and its operand registers, in
/// source order (register 0 is the highest-order nibble).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub id: OpcodeId,
    pub operands: Vec<RegisterId>,
}

/// Recognize the opcode in `word` and unpack its register operands.
///
/// Probes `shift in [0, 4, 8, 12]` ascending, i.e. the widest possible
/// opcode field (a 0-arg, full-word opcode) first, narrowing down to the
/// 4-bit (3-arg) field last. The first table hit wins.
///
/// If the high nibble of `word` is zero, `ADD` is forced directly: `ADD`'s
/// raw opcode value is `0x0`, which can otherwise collide with the raw
/// value of an unrelated descriptor at the `shift = 0` probe before the
/// `shift = 12` probe that actually identifies `ADD` is ever tried.
pub fn decode_word(word: u16) -> Result<Decoded, DecodeError> {
    let id = if word >> 12 == 0 {
        OpcodeId::Add
    } else {
        [0u32, 4, 8, 12]
            .into_iter()
            .find_map(|shift| VALUES.get(&(word >> shift)).copied())
            .ok_or(DecodeError::InvalidInstruction { word })?
    };

    let descriptor = DESCRIPTORS_BY_ID[&id];
    let arg_count = descriptor.arg_count as u32;
    let shift = REGISTER_WIDTH_BITS * arg_count;

    if word >> shift != descriptor.value {
        return Err(DecodeError::DecodeMismatch {
            word,
            opcode: descriptor.value,
        });
    }

    let mask = (1u16 << shift).wrapping_sub(1);
    let remaining = word & mask;
    let mut operands = Vec::with_capacity(arg_count as usize);
    for i in 0..arg_count {
        let nibble_shift = REGISTER_WIDTH_BITS * (arg_count - 1 - i);
        let ordinal = ((remaining >> nibble_shift) & 0xF) as u8;
        operands.push(RegisterId::from_ordinal(ordinal).expect("4-bit ordinal always valid"));
    }

    Ok(Decoded { id, operands })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_ranges_are_disjoint() {
        let mut claimed = vec![false; 1 << 16];
        for d in DESCRIPTOR_LIST {
            let width = REGISTER_WIDTH_BITS * d.arg_count as u32;
            let start = (d.value as u32) << width;
            let end = start + (1u32 << width);
            for addr in start..end {
                assert!(
                    !claimed[addr as usize],
                    "opcode {:?} overlaps a previously claimed address {:#06x}",
                    d.id, addr
                );
                claimed[addr as usize] = true;
            }
        }
    }

    #[test]
    fn encode_decode_round_trip_for_every_mnemonic() {
        for d in DESCRIPTOR_LIST {
            let operands: Vec<RegisterId> = (0..d.arg_count)
                .map(|i| RegisterId::ALL[i as usize + 1])
                .collect();
            let word = pack(*d, &operands);
            let decoded = decode_word(word).unwrap_or_else(|e| {
                panic!("{:?} (word {:#06x}) failed to decode: {:?}", d.id, word, e)
            });
            assert_eq!(decoded.id, d.id, "mnemonic {}", mnemonic(d.id));
            assert_eq!(decoded.operands, operands, "mnemonic {}", mnemonic(d.id));
        }
    }

    #[test]
    fn shfl_r10_matches_the_known_encoding() {
        let d = descriptor_for_mnemonic("SHFL").unwrap();
        let word = pack(d, &[RegisterId::R10]);
        assert_eq!(word, 0x767f);
    }

    #[test]
    fn and_r0_r1_r2_matches_the_known_encoding() {
        let d = descriptor_for_mnemonic("AND").unwrap();
        let word = pack(d, &[RegisterId::R0, RegisterId::R1, RegisterId::R2]);
        assert_eq!(word, 0x4567);
    }

    #[test]
    fn all_zero_word_decodes_as_add() {
        let decoded = decode_word(0x0000).unwrap();
        assert_eq!(decoded.id, OpcodeId::Add);
    }
}
