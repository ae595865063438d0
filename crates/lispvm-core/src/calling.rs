//! Calling conventions
//!
//! A function object selects one of two protocols through its
//! [`ParamSpec`](crate::function::ParamSpec):
//!
//! - **Dynamic**: every parameter name is pushed on the binding stack and
//!   the body reads it back with `varref`. A call costs one bind and one
//!   restore per parameter, and every access is a symbol lookup.
//! - **Lexical**: after one argument-count check the arguments stay on the
//!   operand stack and the body reads them with `stack-ref`. No binding
//!   stack traffic at all.
//!
//! Both protocols check the argument count before anything is bound or
//! executed.

use serde::{Deserialize, Serialize};

use lispvm_bytecode::ArgDescriptor;

use crate::binding::Environment;
use crate::error::{VmError, VmResult};
use crate::function::{ArgList, ByteCodeFunction, ParamSpec};
use crate::stack::OperandStack;
use crate::value::Value;

/// Calling convention of a function object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Convention {
    /// Parameters are dynamically bound by name
    Dynamic,
    /// Parameters are positional operand-stack slots
    Lexical,
}

impl std::fmt::Display for Convention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Dynamic => "dynamic",
            Self::Lexical => "lexical",
        })
    }
}

/// Set up a fresh activation for `function`.
///
/// Returns the initial operand stack and the number of bindings pushed.
/// Bindings pushed before a failure stay on the binding stack; the caller
/// unwinds them to the depth it recorded before the call.
pub(crate) fn prepare(
    env: &mut Environment,
    callee: &Value,
    function: &ByteCodeFunction,
    args: Vec<Value>,
) -> VmResult<(OperandStack, usize)> {
    match function.params() {
        ParamSpec::Dynamic(list) => {
            let bound = bind_dynamic(env, callee, list, args)?;
            Ok((OperandStack::new(function.max_depth()), bound))
        }
        ParamSpec::Lexical(desc) => {
            let stack = push_lexical(callee, *desc, args, function.max_depth())?;
            Ok((stack, 0))
        }
    }
}

/// Bind each parameter name to its argument.
///
/// Missing optionals are bound to `nil`; the rest parameter receives a list
/// of the remaining arguments.
fn bind_dynamic(
    env: &mut Environment,
    callee: &Value,
    list: &ArgList,
    args: Vec<Value>,
) -> VmResult<usize> {
    let supplied = args.len();
    let accepted =
        supplied >= list.min_args() && list.max_args().is_none_or(|max| supplied <= max);
    if !accepted {
        return Err(VmError::arity(
            callee.clone(),
            list.min_args(),
            list.max_args(),
            supplied,
        ));
    }

    let mut args = args.into_iter();
    for name in list.required().iter().chain(list.optional()) {
        env.bind(name.clone(), args.next().unwrap_or_default())?;
    }
    if let Some(rest) = list.rest() {
        env.bind(rest.clone(), Value::list(args))?;
    }
    Ok(list.binding_count())
}

/// Lay the arguments out as operand-stack slots.
///
/// Supplied arguments first, then `nil` for each missing optional, then the
/// rest list as the final slot when the descriptor has one.
fn push_lexical(
    callee: &Value,
    desc: ArgDescriptor,
    args: Vec<Value>,
    max_depth: usize,
) -> VmResult<OperandStack> {
    let supplied = args.len();
    if !desc.accepts(supplied) {
        return Err(VmError::arity(
            callee.clone(),
            desc.required(),
            desc.max_args(),
            supplied,
        ));
    }

    let mut stack = OperandStack::new(max_depth);
    let mut args = args.into_iter();
    for arg in args.by_ref().take(desc.total()) {
        stack.push(arg)?;
    }
    for _ in supplied..desc.total() {
        stack.push(Value::Nil)?;
    }
    if desc.has_rest() {
        stack.push(Value::list(args))?;
    }
    Ok(stack)
}
