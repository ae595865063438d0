//! # lispvm bytecode
//!
//! Bytecode format for the lispvm stack machine.
//!
//! ## Design Principles
//!
//! - **Stack-based**: Instructions consume and produce operand-stack slots
//! - **Compact**: Six packed families carry small operands in the opcode byte
//! - **Table-driven**: One descriptor table drives decoding and encoding
//! - **Portable**: Multi-byte operands are little-endian regardless of host

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod emit;
pub mod error;
pub mod instruction;
pub mod literal;
pub mod opcode;
pub mod operand;

pub use emit::CodeEmitter;
pub use error::BytecodeError;
pub use instruction::{Disassembler, Instruction, disassemble, encode_all};
pub use literal::{Datum, DocLiteral, FunctionLiteral};
pub use opcode::{OPCODE_TABLE, Opcode, OpcodeInfo, OperandKind};
pub use operand::ArgDescriptor;

/// Function image format version
pub const IMAGE_VERSION: u32 = 1;

/// Magic bytes for function images
pub const IMAGE_MAGIC: [u8; 8] = *b"LISPVMBC";
