//! Built-in functions
//!
//! Primitives are reachable through symbol function cells and the call
//! family, just like compiled functions. Each declares its arity; the check
//! happens before the body runs.

use std::fmt;
use std::sync::Arc;

use lispvm_bytecode::DocLiteral;

use crate::binding::Environment;
use crate::error::{VmError, VmResult};
use crate::function::ByteCodeFunction;
use crate::ops;
use crate::value::Value;

/// Signature of a primitive body
pub type PrimitiveFn = fn(&mut Environment, &[Value]) -> VmResult<Value>;

/// A built-in function
///
/// The body is private to the crate; outside callers go through
/// [`Primitive::call`], which checks the argument count first.
///
/// ```compile_fail
/// use lispvm_core::{primitives, Environment};
///
/// let car = primitives::lookup("car").unwrap();
/// let _ = (car.func)(&mut Environment::new(), &[]);
/// ```
pub struct Primitive {
    /// Name the primitive is installed under
    pub name: &'static str,
    /// Minimum argument count
    pub min_args: usize,
    /// Maximum argument count, `None` for any number
    pub max_args: Option<usize>,
    /// Body; only sound after the arity check in [`Primitive::call`]
    pub(crate) func: PrimitiveFn,
}

impl Primitive {
    /// Check the argument count and run the body
    pub fn call(&'static self, env: &mut Environment, args: &[Value]) -> VmResult<Value> {
        let supplied = args.len();
        if supplied < self.min_args || self.max_args.is_some_and(|max| supplied > max) {
            return Err(VmError::arity(
                Value::Primitive(self),
                self.min_args,
                self.max_args,
                supplied,
            ));
        }
        (self.func)(env, args)
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitive")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish()
    }
}

/// Find a primitive by name
pub fn lookup(name: &str) -> Option<&'static Primitive> {
    PRIMITIVES.iter().find(|primitive| primitive.name == name)
}

const fn prim(name: &'static str, min_args: usize, max_args: Option<usize>, func: PrimitiveFn) -> Primitive {
    Primitive {
        name,
        min_args,
        max_args,
        func,
    }
}

/// Every built-in primitive
pub static PRIMITIVES: &[Primitive] = &[
    // Lists
    prim("car", 1, Some(1), |_, a| a[0].car()),
    prim("cdr", 1, Some(1), |_, a| a[0].cdr()),
    prim("car-safe", 1, Some(1), |_, a| Ok(ops::car_safe(&a[0]))),
    prim("cdr-safe", 1, Some(1), |_, a| Ok(ops::cdr_safe(&a[0]))),
    prim("cons", 2, Some(2), |_, a| Ok(Value::cons(a[0].clone(), a[1].clone()))),
    prim("list", 0, None, |_, a| Ok(Value::list(a.iter().cloned()))),
    prim("length", 1, Some(1), |_, a| ops::length(&a[0])),
    prim("nth", 2, Some(2), |_, a| ops::nth(&a[0], &a[1])),
    prim("nthcdr", 2, Some(2), |_, a| ops::nthcdr(&a[0], &a[1])),
    prim("elt", 2, Some(2), |_, a| ops::elt(&a[0], &a[1])),
    prim("memq", 2, Some(2), |_, a| ops::memq(&a[0], &a[1])),
    prim("member", 2, Some(2), |_, a| ops::member(&a[0], &a[1])),
    prim("assq", 2, Some(2), |_, a| ops::assq(&a[0], &a[1])),
    prim("nreverse", 1, Some(1), |_, a| ops::nreverse(&a[0])),
    prim("reverse", 1, Some(1), reverse),
    prim("nconc", 0, None, nconc),
    prim("setcar", 2, Some(2), |_, a| ops::setcar(&a[0], a[1].clone())),
    prim("setcdr", 2, Some(2), |_, a| ops::setcdr(&a[0], a[1].clone())),
    // Predicates
    prim("eq", 2, Some(2), |_, a| Ok(ops::eq(&a[0], &a[1]))),
    prim("equal", 2, Some(2), |_, a| Ok(ops::equal(&a[0], &a[1]))),
    prim("not", 1, Some(1), |_, a| Ok(ops::not(&a[0]))),
    prim("null", 1, Some(1), |_, a| Ok(ops::not(&a[0]))),
    prim("symbolp", 1, Some(1), |_, a| Ok(ops::symbolp(&a[0]))),
    prim("consp", 1, Some(1), |_, a| Ok(ops::consp(&a[0]))),
    prim("listp", 1, Some(1), |_, a| Ok(ops::listp(&a[0]))),
    prim("stringp", 1, Some(1), |_, a| Ok(ops::stringp(&a[0]))),
    prim("numberp", 1, Some(1), |_, a| Ok(ops::numberp(&a[0]))),
    prim("integerp", 1, Some(1), |_, a| Ok(ops::integerp(&a[0]))),
    prim("vectorp", 1, Some(1), |_, a| {
        Ok(Value::bool(matches!(a[0], Value::Vector(_))))
    }),
    prim("functionp", 1, Some(1), |_, a| {
        Ok(Value::bool(matches!(
            a[0],
            Value::Function(_) | Value::Primitive(_)
        )))
    }),
    // Arithmetic
    prim("+", 0, None, |_, a| fold(a, Value::Int(0), ops::plus)),
    prim("*", 0, None, |_, a| fold(a, Value::Int(1), ops::mult)),
    prim("-", 0, None, minus),
    prim("/", 1, None, |_, a| fold(&a[1..], a[0].clone(), ops::quo)),
    prim("%", 2, Some(2), |_, a| ops::rem(&a[0], &a[1])),
    prim("1+", 1, Some(1), |_, a| ops::add1(&a[0])),
    prim("1-", 1, Some(1), |_, a| ops::sub1(&a[0])),
    prim("=", 2, Some(2), |_, a| ops::num_eq(&a[0], &a[1])),
    prim("<", 2, Some(2), |_, a| ops::lss(&a[0], &a[1])),
    prim(">", 2, Some(2), |_, a| ops::gtr(&a[0], &a[1])),
    prim("<=", 2, Some(2), |_, a| ops::leq(&a[0], &a[1])),
    prim(">=", 2, Some(2), |_, a| ops::geq(&a[0], &a[1])),
    prim("max", 1, None, |_, a| fold(&a[1..], a[0].clone(), ops::max)),
    prim("min", 1, None, |_, a| fold(&a[1..], a[0].clone(), ops::min)),
    // Arrays and strings
    prim("vector", 0, None, |_, a| Ok(Value::vector(a.to_vec()))),
    prim("make-vector", 2, Some(2), make_vector),
    prim("aref", 2, Some(2), |_, a| ops::aref(&a[0], &a[1])),
    prim("aset", 3, Some(3), |_, a| ops::aset(&a[0], &a[1], a[2].clone())),
    prim("concat", 0, None, |_, a| ops::concat(a)),
    prim("substring", 1, Some(3), |_, a| {
        let from = a.get(1).cloned().unwrap_or_default();
        let to = a.get(2).cloned().unwrap_or_default();
        ops::substring(&a[0], &from, &to)
    }),
    prim("string=", 2, Some(2), |_, a| ops::string_eq(&a[0], &a[1])),
    prim("string<", 2, Some(2), |_, a| ops::string_lss(&a[0], &a[1])),
    prim("upcase", 1, Some(1), |_, a| ops::upcase(&a[0])),
    prim("downcase", 1, Some(1), |_, a| ops::downcase(&a[0])),
    // Symbols
    prim("symbol-value", 1, Some(1), |env, a| {
        env.symbol_value(&a[0].expect_symbol()?)
    }),
    prim("symbol-function", 1, Some(1), |env, a| {
        Ok(env.symbol_function(&a[0].expect_symbol()?))
    }),
    prim("set", 2, Some(2), |env, a| {
        env.set(&a[0].expect_symbol()?, a[1].clone())?;
        Ok(a[1].clone())
    }),
    prim("fset", 2, Some(2), |env, a| {
        env.fset(&a[0].expect_symbol()?, a[1].clone())?;
        Ok(a[1].clone())
    }),
    prim("boundp", 1, Some(1), |env, a| {
        Ok(Value::bool(env.is_bound(&a[0].expect_symbol()?)))
    }),
    prim("fboundp", 1, Some(1), |env, a| {
        Ok(Value::bool(env.is_fbound(&a[0].expect_symbol()?)))
    }),
    prim("makunbound", 1, Some(1), |env, a| {
        env.make_unbound(&a[0].expect_symbol()?)?;
        Ok(a[0].clone())
    }),
    prim("get", 2, Some(2), |env, a| Ok(env.get(&a[0].expect_symbol()?, &a[1]))),
    prim("put", 3, Some(3), |env, a| {
        env.put(&a[0].expect_symbol()?, a[1].clone(), a[2].clone());
        Ok(a[2].clone())
    }),
    prim("symbol-plist", 1, Some(1), |env, a| {
        Ok(env.symbol_plist(&a[0].expect_symbol()?))
    }),
    // Function objects
    prim("make-byte-code", 4, Some(6), make_byte_code),
];

fn fold(
    args: &[Value],
    init: Value,
    op: fn(&Value, &Value) -> VmResult<Value>,
) -> VmResult<Value> {
    args.iter().try_fold(init, |acc, arg| op(&acc, arg))
}

fn minus(_: &mut Environment, args: &[Value]) -> VmResult<Value> {
    match args {
        [] => Ok(Value::Int(0)),
        [only] => ops::negate(only),
        [first, rest @ ..] => fold(rest, first.clone(), ops::diff),
    }
}

fn reverse(_: &mut Environment, args: &[Value]) -> VmResult<Value> {
    match &args[0] {
        Value::Vector(items) => {
            let mut items = items.to_vec();
            items.reverse();
            Ok(Value::vector(items))
        }
        list => {
            let mut items = list.list_to_vec()?;
            items.reverse();
            Ok(Value::list(items))
        }
    }
}

fn nconc(_: &mut Environment, args: &[Value]) -> VmResult<Value> {
    args.iter()
        .rev()
        .try_fold(Value::Nil, |acc, list| ops::nconc(list, &acc))
}

fn make_vector(_: &mut Environment, args: &[Value]) -> VmResult<Value> {
    let len = usize::try_from(args[0].expect_int()?)
        .map_err(|_| VmError::wrong_type("wholenump", &args[0]))?;
    Ok(Value::vector(vec![args[1].clone(); len]))
}

/// `(make-byte-code ARGLIST CODE CONSTANTS DEPTH &optional DOC INTERACTIVE)`
fn make_byte_code(_: &mut Environment, args: &[Value]) -> VmResult<Value> {
    let code = match &args[1] {
        Value::Str(bytes) => bytes.to_vec(),
        other => return Err(VmError::wrong_type("stringp", other)),
    };
    let constants = match &args[2] {
        Value::Vector(items) => items.to_vec(),
        v if v.is_nil() => Vec::new(),
        other => return Err(VmError::wrong_type("vectorp", other)),
    };
    let depth = usize::try_from(args[3].expect_int()?)
        .map_err(|_| VmError::wrong_type("wholenump", &args[3]))?;

    let mut builder = ByteCodeFunction::builder()
        .arglist(args[0].clone())
        .code(code)
        .constants(constants)
        .max_depth(depth);
    if let Some(doc) = args.get(4).filter(|doc| !doc.is_nil()) {
        builder = builder.doc(doc_literal(doc)?);
    }
    if let Some(interactive) = args.get(5).filter(|form| !form.is_nil()) {
        builder = builder.interactive(interactive.clone());
    }
    Ok(Value::Function(Arc::new(builder.build()?)))
}

/// A docstring, or `(FILE . OFFSET)` for documentation stored elsewhere
fn doc_literal(doc: &Value) -> VmResult<DocLiteral> {
    match doc {
        Value::Str(bytes) => Ok(DocLiteral::Text(String::from_utf8_lossy(bytes).into_owned())),
        Value::Cons(cell) => {
            let (file, offset) = cell.parts();
            match (file, offset) {
                (Value::Str(file), Value::Int(offset)) => Ok(DocLiteral::External {
                    file: String::from_utf8_lossy(&file).into_owned(),
                    offset,
                }),
                _ => Err(VmError::wrong_type("stringp", doc)),
            }
        }
        other => Err(VmError::wrong_type("stringp", other)),
    }
}
