//! Constant pool of a function object
//!
//! Every access is bounds checked. An index past the end of the pool is a
//! recoverable [`VmError::ConstantOutOfRange`] rather than undefined
//! behavior, even though a correct producer never emits one.

use crate::error::{VmError, VmResult};
use crate::value::{Symbol, Value};

/// Ordered, immutable sequence of constants
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Box<[Value]>,
}

impl ConstantPool {
    /// Create a pool
    pub fn new(constants: Vec<Value>) -> Self {
        Self {
            constants: constants.into_boxed_slice(),
        }
    }

    /// Constant at `index`
    #[inline]
    pub fn get(&self, index: usize) -> VmResult<&Value> {
        self.constants
            .get(index)
            .ok_or(VmError::ConstantOutOfRange {
                index,
                len: self.constants.len(),
            })
    }

    /// Constant at `index`, which must be a symbol
    #[inline]
    pub fn symbol(&self, index: usize) -> VmResult<Symbol> {
        self.get(index)?.expect_symbol()
    }

    /// Number of constants
    #[inline]
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over the constants in order
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.constants.iter()
    }

    /// All constants
    pub fn as_slice(&self) -> &[Value] {
        &self.constants
    }
}

impl From<Vec<Value>> for ConstantPool {
    fn from(constants: Vec<Value>) -> Self {
        Self::new(constants)
    }
}
