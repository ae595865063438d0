//! # lispvm core
//!
//! Execution engine for lispvm function objects.
//!
//! ## Design Principles
//!
//! - **Explicit environment**: Symbol cells and the binding stack live in an
//!   [`Environment`] owned by a [`VmContext`], never in process globals
//! - **Two calling conventions**: Dynamic functions bind parameter names,
//!   lexical functions keep arguments as positional stack slots
//! - **Checked access**: Constant, stack and jump operands are bounds checked
//!   and fail with a typed [`VmError`]
//! - **Explicit frames**: Nested calls push frames onto a heap-allocated
//!   frame stack, so the nesting limit does not depend on the native stack
//! - **Shared values**: Conses, vectors and strings are reference counted

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod binding;
pub mod calling;
pub mod config;
pub mod constant;
pub mod context;
mod drop_guard;
pub mod error;
pub mod function;
pub mod interpreter;
pub mod ops;
pub mod primitives;
pub mod stack;
pub mod stats;
pub mod trace;
pub mod value;

pub use binding::Environment;
pub use calling::Convention;
pub use config::VmConfig;
pub use constant::ConstantPool;
pub use context::VmContext;
pub use error::{VmError, VmResult};
pub use function::{ArgList, ByteCodeFunction, FunctionBuilder, ParamSpec};
pub use interpreter::Interpreter;
pub use primitives::Primitive;
pub use stack::OperandStack;
pub use stats::ExecutionStats;
pub use trace::{TraceConfig, TraceEntry, TraceRingBuffer};
pub use value::{Symbol, Value};

pub use lispvm_bytecode as bytecode;
