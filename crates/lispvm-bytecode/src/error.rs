//! Bytecode errors

use thiserror::Error;

/// Errors that can occur while decoding, encoding or loading bytecode
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// Invalid magic bytes in a serialized function image
    #[error("Invalid magic bytes")]
    InvalidMagic,

    /// Unsupported image version
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(u32),

    /// The byte at `offset` is not an assigned opcode
    #[error("Invalid opcode {opcode} at offset {offset}")]
    InvalidOpcode {
        /// The raw opcode byte
        opcode: u8,
        /// Byte offset of the opcode in the code vector
        offset: usize,
    },

    /// Code ended in the middle of an instruction
    #[error("Unexpected end of bytecode at offset {0}")]
    UnexpectedEnd(usize),

    /// An operand does not fit the encoding chosen for it
    #[error("Operand {operand} out of range for {mnemonic}")]
    OperandOutOfRange {
        /// Instruction mnemonic
        mnemonic: &'static str,
        /// Offending operand value
        operand: u32,
    },

    /// A packed argument descriptor violates its layout
    #[error("Invalid argument descriptor {0:#x}")]
    InvalidArgDescriptor(i64),

    /// A jump placeholder was patched on a non-jump instruction
    #[error("No jump instruction at offset {0}")]
    NotAJump(usize),

    /// Payload of a function image could not be encoded or decoded
    #[error("Malformed image: {0}")]
    MalformedImage(String),

    /// IO error during serialization
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
