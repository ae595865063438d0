//! Packed argument descriptor
//!
//! Functions compiled for positional (lexical) argument passing describe their
//! parameters with one integer:
//!
//! ```text
//! bits 0-6   required argument count (0-127)
//! bit  7     has-rest flag
//! bits 8+    required + optional argument count
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};

const REQUIRED_MASK: i64 = 0x7F;
const REST_FLAG: i64 = 0x80;
const TOTAL_SHIFT: u32 = 8;

/// Largest required-argument count the layout can express
pub const MAX_REQUIRED: u8 = 127;

/// Decoded packed argument descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgDescriptor {
    required: u8,
    total: u16,
    rest: bool,
}

impl ArgDescriptor {
    /// Create a descriptor, checking `required <= total` and `required <= 127`
    pub fn new(required: u8, total: u16, rest: bool) -> Result<Self> {
        if required > MAX_REQUIRED || required as u16 > total {
            return Err(BytecodeError::InvalidArgDescriptor(
                Self::pack(required, total, rest),
            ));
        }
        Ok(Self {
            required,
            total,
            rest,
        })
    }

    /// Descriptor with only required arguments
    pub fn fixed(required: u8) -> Result<Self> {
        Self::new(required, required as u16, false)
    }

    /// Decode the integer form
    pub fn decode(raw: i64) -> Result<Self> {
        if raw < 0 {
            return Err(BytecodeError::InvalidArgDescriptor(raw));
        }
        let total = u16::try_from(raw >> TOTAL_SHIFT)
            .map_err(|_| BytecodeError::InvalidArgDescriptor(raw))?;
        let required = (raw & REQUIRED_MASK) as u8;
        let rest = raw & REST_FLAG != 0;
        Self::new(required, total, rest).map_err(|_| BytecodeError::InvalidArgDescriptor(raw))
    }

    /// Encode to the integer form
    #[inline]
    pub fn encode(self) -> i64 {
        Self::pack(self.required, self.total, self.rest)
    }

    fn pack(required: u8, total: u16, rest: bool) -> i64 {
        let mut raw = (required as i64 & REQUIRED_MASK) | ((total as i64) << TOTAL_SHIFT);
        if rest {
            raw |= REST_FLAG;
        }
        raw
    }

    /// Number of required arguments
    #[inline]
    pub fn required(self) -> usize {
        self.required as usize
    }

    /// Number of required plus optional arguments
    #[inline]
    pub fn total(self) -> usize {
        self.total as usize
    }

    /// Number of optional arguments
    #[inline]
    pub fn optional(self) -> usize {
        self.total() - self.required()
    }

    /// Whether extra arguments are collected into a list
    #[inline]
    pub fn has_rest(self) -> bool {
        self.rest
    }

    /// Maximum accepted argument count, `None` when a rest list is present
    #[inline]
    pub fn max_args(self) -> Option<usize> {
        if self.rest { None } else { Some(self.total()) }
    }

    /// Operand-stack slots the arguments occupy once the frame is set up
    #[inline]
    pub fn frame_slots(self) -> usize {
        self.total() + self.rest as usize
    }

    /// Whether `supplied` arguments satisfy the descriptor
    #[inline]
    pub fn accepts(self, supplied: usize) -> bool {
        supplied >= self.required() && self.max_args().is_none_or(|max| supplied <= max)
    }
}
