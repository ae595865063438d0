//! Code emitter
//!
//! A small builder for code vectors. Jumps are emitted with a placeholder
//! target and patched once the destination offset is known.

use crate::error::{BytecodeError, Result};
use crate::instruction::Instruction;
use crate::opcode::Opcode;

/// Builds a code vector instruction by instruction
#[derive(Debug, Default, Clone)]
pub struct CodeEmitter {
    code: Vec<u8>,
}

impl CodeEmitter {
    /// Create an empty emitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit an instruction in its most compact form
    pub fn emit(&mut self, instruction: Instruction) -> Result<&mut Self> {
        instruction.encode_into(&mut self.code)?;
        Ok(self)
    }

    /// Emit an operand-less instruction
    pub fn op(&mut self, opcode: Opcode) -> Result<&mut Self> {
        self.emit(Instruction::op(opcode))
    }

    /// Current byte offset (the target of a backward jump)
    #[inline]
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a jump with a placeholder target, returning its offset for patching
    pub fn emit_jump(&mut self, opcode: Opcode) -> Result<usize> {
        if !opcode.is_jump() {
            return Err(BytecodeError::NotAJump(self.code.len()));
        }
        let at = self.code.len();
        self.code.extend_from_slice(&[opcode.to_byte(), 0, 0]);
        Ok(at)
    }

    /// Emit a jump to an already known target
    pub fn jump_to(&mut self, opcode: Opcode, target: usize) -> Result<&mut Self> {
        let at = self.emit_jump(opcode)?;
        self.patch_jump(at, target)?;
        Ok(self)
    }

    /// Point the jump emitted at `at` to `target`
    pub fn patch_jump(&mut self, at: usize, target: usize) -> Result<()> {
        let is_jump = self
            .code
            .get(at)
            .and_then(|byte| Opcode::from_byte(*byte))
            .is_some_and(Opcode::is_jump);
        if !is_jump || at + 3 > self.code.len() {
            return Err(BytecodeError::NotAJump(at));
        }
        let target = u16::try_from(target).map_err(|_| BytecodeError::OperandOutOfRange {
            mnemonic: "goto",
            operand: target as u32,
        })?;
        let [lo, hi] = target.to_le_bytes();
        self.code[at + 1] = lo;
        self.code[at + 2] = hi;
        Ok(())
    }

    /// Point the jump emitted at `at` to the current offset
    pub fn patch_here(&mut self, at: usize) -> Result<()> {
        self.patch_jump(at, self.code.len())
    }

    /// Finish and return the code vector
    pub fn finish(self) -> Vec<u8> {
        self.code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::disassemble;

    #[test]
    fn test_forward_jump_patch() {
        let mut emitter = CodeEmitter::new();
        emitter.emit(Instruction::new(Opcode::StackRef, 0)).unwrap();
        let jump = emitter.emit_jump(Opcode::GotoIfNil).unwrap();
        emitter.emit(Instruction::new(Opcode::Constant, 0)).unwrap();
        emitter.op(Opcode::Return).unwrap();
        emitter.patch_here(jump).unwrap();
        emitter.emit(Instruction::new(Opcode::Constant, 1)).unwrap();
        emitter.op(Opcode::Return).unwrap();

        let code = emitter.finish();
        let listing: Vec<_> = disassemble(&code).map(|i| i.unwrap()).collect();
        assert_eq!(listing[1], (1, Instruction::new(Opcode::GotoIfNil, 6)));
        assert_eq!(listing[4].0, 6);
    }

    #[test]
    fn test_patch_rejects_non_jump() {
        let mut emitter = CodeEmitter::new();
        emitter.op(Opcode::Dup).unwrap();
        assert!(matches!(
            emitter.patch_jump(0, 4),
            Err(BytecodeError::NotAJump(0))
        ));
        assert!(emitter.emit_jump(Opcode::Plus).is_err());
    }

    #[test]
    fn test_backward_jump() {
        let mut emitter = CodeEmitter::new();
        let top = emitter.current_offset();
        emitter.op(Opcode::Dup).unwrap();
        emitter.jump_to(Opcode::Goto, top).unwrap();
        assert_eq!(emitter.finish(), vec![137, 130, 0, 0]);
    }
}
