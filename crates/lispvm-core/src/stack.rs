//! Operand stack of one activation
//!
//! Depth is capped by the function's declared maximum. Every push is
//! compared against the cap; a producer that under-declares gets
//! [`VmError::StackDepthExceeded`] instead of corrupted memory.

use smallvec::SmallVec;

use crate::error::{VmError, VmResult};
use crate::value::Value;

/// Bounded operand stack
#[derive(Debug)]
pub struct OperandStack {
    slots: SmallVec<[Value; 8]>,
    max_depth: usize,
    high_water: usize,
}

impl OperandStack {
    /// Create an empty stack holding at most `max_depth` values
    pub fn new(max_depth: usize) -> Self {
        Self {
            slots: SmallVec::with_capacity(max_depth.min(256)),
            max_depth,
            high_water: 0,
        }
    }

    /// Current depth
    #[inline]
    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Check if the stack is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Declared maximum depth
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Deepest the stack has been
    #[inline]
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Push a value
    #[inline]
    pub fn push(&mut self, value: Value) -> VmResult<()> {
        if self.slots.len() >= self.max_depth {
            return Err(VmError::StackDepthExceeded {
                max: self.max_depth,
            });
        }
        self.slots.push(value);
        self.high_water = self.high_water.max(self.slots.len());
        Ok(())
    }

    /// Pop the top value
    #[inline]
    pub fn pop(&mut self) -> VmResult<Value> {
        self.slots.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pop the top `n` values, returned in push order
    pub fn pop_n(&mut self, n: usize) -> VmResult<Vec<Value>> {
        let start = self
            .slots
            .len()
            .checked_sub(n)
            .ok_or(VmError::StackUnderflow)?;
        Ok(self.slots.drain(start..).collect())
    }

    /// Drop the top `n` values
    pub fn drop_n(&mut self, n: usize) -> VmResult<()> {
        let len = self
            .slots
            .len()
            .checked_sub(n)
            .ok_or(VmError::StackUnderflow)?;
        self.slots.truncate(len);
        Ok(())
    }

    /// The value `n` slots below the top (0 = top)
    #[inline]
    pub fn peek(&self, n: usize) -> VmResult<&Value> {
        let depth = self.slots.len();
        depth
            .checked_sub(n + 1)
            .and_then(|index| self.slots.get(index))
            .ok_or(VmError::StackSlotOutOfRange { slot: n, depth })
    }

    /// Overwrite the value `n` slots below the top (0 = top)
    pub fn set(&mut self, n: usize, value: Value) -> VmResult<()> {
        let depth = self.slots.len();
        let slot = depth
            .checked_sub(n + 1)
            .and_then(|index| self.slots.get_mut(index))
            .ok_or(VmError::StackSlotOutOfRange { slot: n, depth })?;
        *slot = value;
        Ok(())
    }

    /// Remove every value
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
