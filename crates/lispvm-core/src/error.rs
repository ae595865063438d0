//! VM error types

use lispvm_bytecode::BytecodeError;
use thiserror::Error;

use crate::value::{Symbol, Value};

/// VM execution errors
#[derive(Debug, Error)]
pub enum VmError {
    /// Malformed instruction stream or function image
    #[error("bytecode error: {0}")]
    Bytecode(#[from] BytecodeError),

    /// Argument count outside the callee's accepted range
    #[error(
        "wrong-number-of-arguments: {function} accepts {}, got {supplied}",
        arity_text(*.min, *.max)
    )]
    ArityMismatch {
        /// The callee as it was named at the call site
        function: Value,
        /// Minimum accepted argument count
        min: usize,
        /// Maximum accepted argument count, `None` for a rest list
        max: Option<usize>,
        /// Number of arguments supplied
        supplied: usize,
    },

    /// Reference to a symbol without a value
    #[error("void-variable: {0}")]
    VoidVariable(Symbol),

    /// Call through a symbol with an empty function cell
    #[error("void-function: {0}")]
    VoidFunction(Symbol),

    /// Call of a value that is not callable
    #[error("invalid-function: {0}")]
    InvalidFunction(Value),

    /// Argument of the wrong type
    #[error("wrong-type-argument: {expected}, {value}")]
    WrongType {
        /// Predicate the argument failed
        expected: &'static str,
        /// The offending value
        value: Value,
    },

    /// Attempt to bind or assign `nil`, `t` or a keyword
    #[error("setting-constant: {0}")]
    SettingConstant(Symbol),

    /// A push would grow the operand stack past the declared maximum
    #[error("stack depth exceeded: declared maximum is {max}")]
    StackDepthExceeded {
        /// Declared maximum depth of the running function
        max: usize,
    },

    /// Pop from an empty operand stack
    #[error("operand stack underflow")]
    StackUnderflow,

    /// Stack-relative access past the bottom of the activation's stack
    #[error("stack slot {slot} out of range (depth {depth})")]
    StackSlotOutOfRange {
        /// Requested slot, counted from the top
        slot: usize,
        /// Current operand-stack depth
        depth: usize,
    },

    /// Constant-pool index past the end of the pool
    #[error("constant index {index} out of range (pool size {len})")]
    ConstantOutOfRange {
        /// Requested index
        index: usize,
        /// Pool size
        len: usize,
    },

    /// Jump outside the code vector
    #[error("jump target {target} outside code of length {len}")]
    InvalidJump {
        /// Requested byte offset
        target: usize,
        /// Code length
        len: usize,
    },

    /// Execution ran off the end of the code vector
    #[error("end of code reached without return")]
    MissingReturn,

    /// `unbind` asked for more bindings than the activation pushed
    #[error("unbind of {requested} bindings with only {available} pushed by this activation")]
    UnbindUnderflow {
        /// Bindings requested
        requested: usize,
        /// Bindings the activation owns
        available: usize,
    },

    /// Too many nested activations
    #[error("excessive-lisp-nesting: {0}")]
    ExcessiveNesting(usize),

    /// Integer division by zero
    #[error("arith-error")]
    ArithError,

    /// Integer arithmetic left the fixnum range
    #[error("overflow-error: {0}")]
    Overflow(&'static str),

    /// Index or range outside a sequence
    #[error("args-out-of-range: {0}, {1}")]
    ArgsOutOfRange(Value, Value),

    /// Parameter list that is neither a packed integer nor a valid name list
    #[error("malformed argument list: {0}")]
    MalformedArgList(String),

    /// Function object built from inconsistent parts
    #[error("invalid function object: {0}")]
    InvalidFunctionObject(String),

    /// An error raised inside a running activation
    #[error("{mnemonic} at pc {pc}: {source}")]
    Activation {
        /// Offset of the failing instruction
        pc: usize,
        /// Mnemonic of the failing instruction
        mnemonic: &'static str,
        /// Underlying error
        source: Box<VmError>,
    },
}

fn arity_text(min: usize, max: Option<usize>) -> String {
    match max {
        Some(max) if max == min => min.to_string(),
        Some(max) => format!("{min}..{max}"),
        None => format!("{min} or more"),
    }
}

impl VmError {
    /// Create a wrong-type error
    pub fn wrong_type(expected: &'static str, value: &Value) -> Self {
        Self::WrongType {
            expected,
            value: value.clone(),
        }
    }

    /// Create an arity error
    pub fn arity(function: Value, min: usize, max: Option<usize>, supplied: usize) -> Self {
        Self::ArityMismatch {
            function,
            min,
            max,
            supplied,
        }
    }

    /// Wrap this error with the location of the instruction that raised it
    pub fn at(self, pc: usize, mnemonic: &'static str) -> Self {
        Self::Activation {
            pc,
            mnemonic,
            source: Box::new(self),
        }
    }

    /// Innermost cause, skipping every activation wrapper
    pub fn root(&self) -> &VmError {
        let mut err = self;
        while let Self::Activation { source, .. } = err {
            err = source;
        }
        err
    }

    /// Number of activations the error unwound through
    pub fn activation_depth(&self) -> usize {
        let mut depth = 0;
        let mut err = self;
        while let Self::Activation { source, .. } = err {
            depth += 1;
            err = source;
        }
        depth
    }
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_skips_activation_wrappers() {
        let err = VmError::StackUnderflow.at(3, "plus").at(7, "call");
        assert!(matches!(err.root(), VmError::StackUnderflow));
        assert_eq!(err.activation_depth(), 2);
        assert_eq!(
            err.to_string(),
            "call at pc 7: plus at pc 3: operand stack underflow"
        );
    }

    #[test]
    fn test_arity_message() {
        let err = VmError::arity(Value::symbol("f"), 2, Some(3), 1);
        assert_eq!(
            err.to_string(),
            "wrong-number-of-arguments: f accepts 2..3, got 1"
        );
        let err = VmError::arity(Value::symbol("g"), 1, None, 0);
        assert_eq!(
            err.to_string(),
            "wrong-number-of-arguments: g accepts 1 or more, got 0"
        );
    }
}
