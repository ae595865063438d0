//! Instruction decoding and encoding
//!
//! One generic routine handles every opcode; the operand source is read from
//! the descriptor table rather than special-cased per family.

use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};
use crate::opcode::{CONSTANT_BASE, FAMILY_INLINE_LIMIT, Opcode, OperandKind};

/// A decoded instruction with its resolved operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// Operation
    pub opcode: Opcode,
    /// Resolved operand (0 for operand-less instructions)
    pub operand: u16,
}

impl Instruction {
    /// Instruction with an operand
    #[inline]
    pub const fn new(opcode: Opcode, operand: u16) -> Self {
        Self { opcode, operand }
    }

    /// Instruction without an operand
    #[inline]
    pub const fn op(opcode: Opcode) -> Self {
        Self { opcode, operand: 0 }
    }

    /// Decode one instruction at `*cursor`, advancing it past the instruction
    pub fn decode(code: &[u8], cursor: &mut usize) -> Result<Self> {
        let offset = *cursor;
        let byte = *code.get(offset).ok_or(BytecodeError::UnexpectedEnd(offset))?;
        let info = Opcode::info(byte).ok_or(BytecodeError::InvalidOpcode {
            opcode: byte,
            offset,
        })?;

        let operand = match info.operand {
            OperandKind::None => 0,
            OperandKind::Packed(n) => n as u16,
            OperandKind::Byte => *code
                .get(offset + 1)
                .ok_or(BytecodeError::UnexpectedEnd(offset))? as u16,
            OperandKind::Word => {
                let bytes = code
                    .get(offset + 1..offset + 3)
                    .ok_or(BytecodeError::UnexpectedEnd(offset))?;
                u16::from_le_bytes([bytes[0], bytes[1]])
            }
        };

        *cursor = offset + info.operand.instruction_len();
        Ok(Self {
            opcode: info.opcode,
            operand,
        })
    }

    /// Append the most compact encoding of this instruction
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        let base = self.opcode.to_byte();
        let operand = self.operand;

        if self.opcode.is_packed_family() {
            if operand < FAMILY_INLINE_LIMIT as u16 {
                out.push(base + operand as u8);
            } else if operand <= u8::MAX as u16 {
                out.extend_from_slice(&[base + FAMILY_INLINE_LIMIT, operand as u8]);
            } else {
                let [lo, hi] = operand.to_le_bytes();
                out.extend_from_slice(&[base + FAMILY_INLINE_LIMIT + 1, lo, hi]);
            }
            return Ok(());
        }

        match self.opcode {
            Opcode::Constant if operand < (u8::MAX - CONSTANT_BASE) as u16 + 1 => {
                out.push(CONSTANT_BASE + operand as u8);
            }
            Opcode::Constant => {
                let [lo, hi] = operand.to_le_bytes();
                out.extend_from_slice(&[Opcode::Constant2.to_byte(), lo, hi]);
            }
            _ => {
                let info = Opcode::info(base).ok_or(BytecodeError::InvalidOpcode {
                    opcode: base,
                    offset: out.len(),
                })?;
                match info.operand {
                    OperandKind::None | OperandKind::Packed(_) => {
                        if operand != 0 {
                            return Err(self.out_of_range());
                        }
                        out.push(base);
                    }
                    OperandKind::Byte => {
                        let byte = u8::try_from(operand).map_err(|_| self.out_of_range())?;
                        out.extend_from_slice(&[base, byte]);
                    }
                    OperandKind::Word => {
                        let [lo, hi] = operand.to_le_bytes();
                        out.extend_from_slice(&[base, lo, hi]);
                    }
                }
            }
        }
        Ok(())
    }

    fn out_of_range(&self) -> BytecodeError {
        BytecodeError::OperandOutOfRange {
            mnemonic: self.opcode.name(),
            operand: self.operand as u32,
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let has_operand = self.opcode.is_packed_family()
            || matches!(self.opcode, Opcode::Constant)
            || Opcode::info(self.opcode.to_byte())
                .is_some_and(|info| matches!(info.operand, OperandKind::Byte | OperandKind::Word));
        if has_operand {
            write!(f, "{} {}", self.opcode, self.operand)
        } else {
            write!(f, "{}", self.opcode)
        }
    }
}

/// Encode a sequence of instructions
pub fn encode_all(instructions: &[Instruction]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(instructions.len());
    for instruction in instructions {
        instruction.encode_into(&mut out)?;
    }
    Ok(out)
}

/// Iterator over `(offset, instruction)` pairs of a code vector.
///
/// Stops after the first decoding error.
pub struct Disassembler<'a> {
    code: &'a [u8],
    cursor: usize,
    failed: bool,
}

impl Iterator for Disassembler<'_> {
    type Item = Result<(usize, Instruction)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.code.len() {
            return None;
        }
        let offset = self.cursor;
        match Instruction::decode(self.code, &mut self.cursor) {
            Ok(instruction) => Some(Ok((offset, instruction))),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Walk a code vector instruction by instruction
pub fn disassemble(code: &[u8]) -> Disassembler<'_> {
    Disassembler {
        code,
        cursor: 0,
        failed: false,
    }
}
