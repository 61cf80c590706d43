//! The two-pass textual assembler.
//!
//! Pass 1 runs the full encode over the source once, discards the bytes,
//! and keeps only the label table it built along the way: every label
//! declaration (`:name`) is recorded against the byte offset it was seen
//! at. Because the pass runs top to bottom, a label referenced *before*
//! its declaration still resolves to the placeholder sentinel `0xFFFF`
//! during this first pass — but by the time pass 1 finishes, every label
//! in the program has its real address. Pass 2 re-encodes from scratch
//! with that now-complete table, so forward references come out right.

use std::collections::HashMap;

use crate::error::AssembleError;
use crate::opcode::{self, OpcodeId};
use crate::registers::REGISTER_NAMES;

const UNRESOLVED_LABEL: u16 = 0xFFFF;

/// Translates luinux assembly source into a flat big-endian byte image.
#[derive(Debug, Default, Clone, Copy)]
pub struct Assembler;

impl Assembler {
    pub fn new() -> Self {
        Assembler
    }

    /// Assemble `source` into its binary image.
    ///
    /// Fails on the first malformed line, wrapped with its 1-based line
    /// number.
    pub fn assemble(&self, source: &str) -> Result<Vec<u8>, AssembleError> {
        let lines: Vec<&str> = source.lines().collect();
        let mut labels = HashMap::new();

        if let Err(e) = run_pass(&lines, &mut labels, false) {
            tracing::error!(error = %e, "assembly failed");
            return Err(e);
        }

        match run_pass(&lines, &mut labels, true) {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                tracing::error!(error = %e, "assembly failed");
                Err(e)
            }
        }
    }
}

fn run_pass(
    lines: &[&str],
    labels: &mut HashMap<String, u16>,
    emit_trace: bool,
) -> Result<Vec<u8>, AssembleError> {
    let mut instruction_index: u16 = 0;
    let mut out = Vec::new();

    for (i, raw) in lines.iter().enumerate() {
        let line_no = i + 1;
        let stripped = strip_comment(raw);
        if !has_alpha(stripped) {
            continue;
        }

        let mut tokens: Vec<String> = stripped
            .replace(',', " ")
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if tokens.is_empty() {
            continue;
        }

        if let Some(name) = label_decl_name(&tokens[0]) {
            labels.insert(name.to_string(), instruction_index);
            continue;
        }

        tokens = rewrite_goto(tokens, instruction_index);

        let encoded = encode_line(&tokens, labels).map_err(|e| e.at_line(line_no))?;
        if emit_trace {
            tracing::trace!(line = line_no, word = ?encoded, "assembled instruction");
        }
        instruction_index += encoded.len() as u16;
        out.extend(encoded);
    }

    Ok(out)
}

fn strip_comment(line: &str) -> &str {
    match line.find(';') {
        Some(i) => &line[..i],
        None => line,
    }
}

fn has_alpha(line: &str) -> bool {
    line.chars().any(|c| c.is_ascii_alphabetic())
}

fn label_decl_name(token: &str) -> Option<&str> {
    let rest = token.strip_prefix(':')?;
    if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(rest)
    } else {
        None
    }
}

/// `goto:X` is sugar for `SET X, <next instruction's byte offset>`: it
/// stashes the address of the instruction following the generated `SET`
/// into `X`, so a later `JNZ`/`JZ` through `X` can loop back to it.
fn rewrite_goto(tokens: Vec<String>, instruction_index: u16) -> Vec<String> {
    if tokens.len() == 1 {
        if let Some(reg) = tokens[0].strip_prefix("goto:") {
            let target = instruction_index.wrapping_add(4);
            return vec!["SET".to_string(), reg.to_string(), target.to_string()];
        }
    }
    tokens
}

fn parse_literal(text: &str, labels: &HashMap<String, u16>) -> Result<u16, AssembleError> {
    if let Some(digits) = text.strip_prefix("h'") {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AssembleError::InvalidLiteral {
                text: text.to_string(),
            });
        }
        return u16::from_str_radix(digits, 16).map_err(|_| AssembleError::InvalidLiteral {
            text: text.to_string(),
        });
    }

    let looks_numeric = text.starts_with('-') || text.starts_with(|c: char| c.is_ascii_digit());
    if looks_numeric {
        let body = text.strip_prefix('-').unwrap_or(text);
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AssembleError::InvalidLiteral {
                text: text.to_string(),
            });
        }
        let value: i64 = text.parse().map_err(|_| AssembleError::InvalidLiteral {
            text: text.to_string(),
        })?;
        return Ok(value as i16 as u16);
    }

    Ok(labels.get(text).copied().unwrap_or(UNRESOLVED_LABEL))
}

fn encode_line(tokens: &[String], labels: &HashMap<String, u16>) -> Result<Vec<u8>, AssembleError> {
    let mnemonic = tokens[0].as_str();
    let descriptor =
        opcode::descriptor_for_mnemonic(mnemonic).ok_or_else(|| AssembleError::UnknownMnemonic {
            mnemonic: mnemonic.to_string(),
        })?;
    let operands = &tokens[1..];
    let token_at = |i: usize| operands.get(i).map(String::as_str).unwrap_or("");

    if descriptor.id == OpcodeId::Jmp {
        if operands.len() > 1 {
            return Err(AssembleError::TooManyOperands);
        }
        let literal = parse_literal(token_at(0), labels)?;
        let word = opcode::pack(descriptor, &[]);
        let mut bytes = word.to_be_bytes().to_vec();
        bytes.extend_from_slice(&literal.to_be_bytes());
        return Ok(bytes);
    }

    if matches!(descriptor.id, OpcodeId::Set | OpcodeId::SetM) {
        let reg_text = token_at(0);
        let reg = REGISTER_NAMES
            .get(reg_text)
            .copied()
            .ok_or_else(|| AssembleError::UnknownRegister {
                name: reg_text.to_string(),
            })?;
        let literal = parse_literal(token_at(1), labels)?;
        if operands.len() > 2 {
            return Err(AssembleError::TooManyOperands);
        }
        let word = opcode::pack(descriptor, &[reg]);
        let mut bytes = word.to_be_bytes().to_vec();
        bytes.extend_from_slice(&literal.to_be_bytes());
        return Ok(bytes);
    }

    let arity = descriptor.arg_count as usize;
    if operands.len() > arity {
        return Err(AssembleError::TooManyOperands);
    }
    let mut regs = Vec::with_capacity(arity);
    for i in 0..arity {
        let text = token_at(i);
        let reg = REGISTER_NAMES
            .get(text)
            .copied()
            .ok_or_else(|| AssembleError::UnknownRegister {
                name: text.to_string(),
            })?;
        regs.push(reg);
    }
    let word = opcode::pack(descriptor, &regs);
    Ok(word.to_be_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asm(source: &str) -> Vec<u8> {
        Assembler::new().assemble(source).unwrap()
    }

    #[test]
    fn shfl_r10_is_a_single_word_with_no_literal() {
        assert_eq!(asm("SHFL R10"), vec![0x76, 0x7f]);
    }

    #[test]
    fn and_r0_r1_r2_matches_the_known_encoding() {
        assert_eq!(asm("AND R0, R1, R2"), vec![0x45, 0x67]);
    }

    #[test]
    fn ten_iteration_loop_matches_the_known_binary_prefix() {
        let source = "\
SET R0, 10
SET R10, 0
goto:R2
INC R10
SUB R0, R10, R1
JNZ R1, R2
STOP
";
        let expected: Vec<u8> = vec![
            0x76, 0x25, 0x00, 0x0a, 0x76, 0x2f, 0x00, 0x00, 0x76, 0x27, 0x00, 0x0c, 0x76, 0x8f,
            0x15, 0xf6, 0x71, 0x67, 0x76, 0x91,
        ];
        assert_eq!(asm(source), expected);
    }

    #[test]
    fn alu_sequence_assembles_five_instructions() {
        let source = "\
SET R0, 2
SET R1, 3
SET R2, 5
SET R3, 6
ADD R0, R1, R10
MUL R10, R1, R10
SUB R10, R3, R10
DIV R10, R1, R10
STOP
";
        let bytes = asm(source);
        assert_eq!(bytes.len(), 4 * 4 + 2 * 4 + 2);
    }

    #[test]
    fn two_pass_forward_reference_resolves_the_label_address() {
        let source = "\
SET R0, myLabel
:myLabel
STOP
";
        let bytes = asm(source);
        assert_eq!(&bytes[2..4], &[0x00, 0x04]);
    }

    #[test]
    fn label_resolution_is_idempotent() {
        let source = "\
:top
SET R0, top
JNZ R0, R1
";
        let a = Assembler::new().assemble(source).unwrap();
        let b = Assembler::new().assemble(source).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn undeclared_label_resolves_to_the_sentinel() {
        let bytes = asm("SET R0, neverDeclared");
        assert_eq!(&bytes[2..4], &[0xff, 0xff]);
    }

    #[test]
    fn invalid_literals_are_rejected() {
        for text in ["h'", "10.1", "0xdead", "10'h"] {
            let source = format!("SET R0, {text}");
            let err = Assembler::new().assemble(&source).unwrap_err();
            assert!(matches!(
                err,
                AssembleError::AtLine { source, .. } if matches!(*source, AssembleError::InvalidLiteral { .. })
            ));
        }
    }

    #[test]
    fn a_minus_sign_separated_from_its_digits_is_an_invalid_literal_not_a_surplus_operand() {
        // "- 10" tokenizes as two operand tokens ("-", "10"), not one signed
        // literal. The malformed literal must be reported before the
        // surplus-operand check ever sees the extra token.
        let err = Assembler::new().assemble("SET R0, - 10").unwrap_err();
        assert!(matches!(
            err,
            AssembleError::AtLine { source, .. } if matches!(*source, AssembleError::InvalidLiteral { .. })
        ));
    }

    #[test]
    fn unknown_mnemonic_is_rejected() {
        let err = Assembler::new().assemble("FROB R0").unwrap_err();
        assert!(matches!(
            err,
            AssembleError::AtLine { source, .. } if matches!(*source, AssembleError::UnknownMnemonic { .. })
        ));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let source = "\
; a full-line comment
SHFL R10 ; trailing comment

STOP
";
        assert_eq!(asm(source), vec![0x76, 0x7f, 0x76, 0x91]);
    }
}
