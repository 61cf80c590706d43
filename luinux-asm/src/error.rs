//! Error taxonomy for decoding and assembling.

use thiserror::Error;

/// Failure recognizing an instruction word as a valid opcode.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// None of the four opcode-width probes matched an entry in the value table.
    #[error("no opcode matches word {word:#06x}")]
    InvalidInstruction {
        /// The word that failed to decode.
        word: u16,
    },
    /// An opcode value matched, but re-deriving it from the unpacked operands
    /// didn't reproduce the original word. This would only happen if the
    /// opcode table's ranges overlapped.
    #[error("word {word:#06x} matched opcode {opcode:#06x} but operand unpacking left a residue")]
    DecodeMismatch {
        /// The word being decoded.
        word: u16,
        /// The opcode value that matched.
        opcode: u16,
    },
}

/// Failure assembling one line of source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    /// The first token of the line isn't a known mnemonic.
    #[error("unrecognized mnemonic {mnemonic:?}")]
    UnknownMnemonic {
        /// The offending token.
        mnemonic: String,
    },
    /// An operand token in register position isn't a known register name.
    #[error("unrecognized register {name:?}")]
    UnknownRegister {
        /// The offending token.
        name: String,
    },
    /// A literal operand didn't match the hex, decimal, or label grammar.
    #[error("invalid literal {text:?}")]
    InvalidLiteral {
        /// The offending token.
        text: String,
    },
    /// The line has more tokens than the mnemonic's arity accounts for.
    #[error("instruction has more operands than expected")]
    TooManyOperands,
    /// A decode-table inconsistency surfaced while re-deriving a just-packed word.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Wraps any of the above with the 1-based source line it occurred on.
    #[error("line {line}: {source}")]
    AtLine {
        /// 1-based source line number.
        line: usize,
        /// The underlying failure.
        #[source]
        source: Box<AssembleError>,
    },
}

impl AssembleError {
    /// Attach a source line number to this error, for surfacing to the caller.
    pub fn at_line(self, line: usize) -> AssembleError {
        AssembleError::AtLine {
            line,
            source: Box::new(self),
        }
    }
}
