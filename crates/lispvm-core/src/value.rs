//! Runtime values
//!
//! Values are shared by reference: conses, vectors, strings and function
//! objects live behind an `Arc` and are released by reference counting.
//! Mutable containers guard their contents with a `parking_lot::Mutex`.
//!
//! Two equality notions exist. [`Value::is_eq`] is identity (`eq`);
//! `PartialEq` is structural equality (`equal`).

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::error::{VmError, VmResult};
use crate::function::ByteCodeFunction;
use crate::primitives::Primitive;

/// Nesting depth after which the printer elides sub-structure
const MAX_PRINT_DEPTH: usize = 64;

/// List length after which the printer elides the remaining elements
const MAX_PRINT_LENGTH: usize = 4096;

static T: LazyLock<Symbol> = LazyLock::new(|| Symbol::new("t"));

/// An interned-by-name symbol
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Symbol with the given name
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// The symbol `nil`
    pub fn nil() -> Self {
        Self::new("nil")
    }

    /// The symbol `t`
    pub fn t() -> Self {
        T.clone()
    }

    /// Symbol name
    #[inline]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Whether this is `nil`
    #[inline]
    pub fn is_nil(&self) -> bool {
        &*self.0 == "nil"
    }

    /// Whether the name starts with a colon
    #[inline]
    pub fn is_keyword(&self) -> bool {
        self.0.len() > 1 && self.0.starts_with(':')
    }

    /// `nil`, `t` and keywords evaluate to themselves and cannot be rebound
    #[inline]
    pub fn is_constant(&self) -> bool {
        self.is_nil() || &*self.0 == "t" || self.is_keyword()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

/// A mutable pair
pub struct Cons {
    cell: Mutex<(Value, Value)>,
}

impl Cons {
    /// New pair
    pub fn new(car: Value, cdr: Value) -> Self {
        Self {
            cell: Mutex::new((car, cdr)),
        }
    }

    /// First element
    pub fn car(&self) -> Value {
        self.cell.lock().0.clone()
    }

    /// Second element
    pub fn cdr(&self) -> Value {
        self.cell.lock().1.clone()
    }

    /// Both elements under one lock
    pub fn parts(&self) -> (Value, Value) {
        let cell = self.cell.lock();
        (cell.0.clone(), cell.1.clone())
    }

    /// Replace the first element
    pub fn set_car(&self, value: Value) {
        self.cell.lock().0 = value;
    }

    /// Replace the second element
    pub fn set_cdr(&self, value: Value) {
        self.cell.lock().1 = value;
    }

    /// Move both elements out, leaving nil behind
    pub(crate) fn take_parts(&mut self) -> (Value, Value) {
        let cell = self.cell.get_mut();
        (std::mem::take(&mut cell.0), std::mem::take(&mut cell.1))
    }
}

/// A fixed-length mutable array
pub struct Vector {
    items: Mutex<Vec<Value>>,
}

impl Vector {
    /// New vector
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Whether the vector has no elements
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.lock().get(index).cloned()
    }

    /// Replace the element at `index`; false when out of range
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.items.lock().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Reverse the elements in place
    pub fn reverse(&self) {
        self.items.lock().reverse();
    }

    /// Copy of the elements
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.lock().clone()
    }

    pub(crate) fn take_items(&mut self) -> Vec<Value> {
        std::mem::take(self.items.get_mut())
    }
}

/// A runtime value
#[derive(Clone, Default)]
pub enum Value {
    /// `nil`, the empty list and false
    #[default]
    Nil,
    /// Small integer
    Int(i64),
    /// Float
    Float(f64),
    /// Symbol other than `nil`
    Symbol(Symbol),
    /// Pair
    Cons(Arc<Cons>),
    /// Vector
    Vector(Arc<Vector>),
    /// Immutable byte string
    Str(Arc<[u8]>),
    /// Compiled function object
    Function(Arc<ByteCodeFunction>),
    /// Built-in function
    Primitive(&'static Primitive),
}

impl Value {
    /// The canonical true value
    pub fn t() -> Self {
        Self::Symbol(Symbol::t())
    }

    /// `t` or `nil`
    #[inline]
    pub fn bool(b: bool) -> Self {
        if b { Self::t() } else { Self::Nil }
    }

    /// Symbol value; the name `nil` yields [`Value::Nil`]
    pub fn symbol(name: &str) -> Self {
        Self::from(Symbol::new(name))
    }

    /// String value from UTF-8 text
    pub fn string(text: &str) -> Self {
        Self::Str(Arc::from(text.as_bytes()))
    }

    /// String value from raw bytes
    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Str(bytes.into())
    }

    /// A fresh pair
    pub fn cons(car: Value, cdr: Value) -> Self {
        Self::Cons(Arc::new(Cons::new(car, cdr)))
    }

    /// Proper list of the given items
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Self::list_with_tail(items, Value::Nil)
    }

    /// List of the given items ending in `tail`
    pub fn list_with_tail<I: IntoIterator<Item = Value>>(items: I, tail: Value) -> Self {
        let items: Vec<Value> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(tail, |acc, item| Self::cons(item, acc))
    }

    /// Vector of the given items
    pub fn vector(items: Vec<Value>) -> Self {
        Self::Vector(Arc::new(Vector::new(items)))
    }

    /// Whether this is `nil`
    #[inline]
    pub fn is_nil(&self) -> bool {
        match self {
            Self::Nil => true,
            Self::Symbol(sym) => sym.is_nil(),
            _ => false,
        }
    }

    /// Whether this is a pair
    #[inline]
    pub fn is_cons(&self) -> bool {
        matches!(self, Self::Cons(_))
    }

    /// Whether this is `nil` or a pair
    #[inline]
    pub fn is_list(&self) -> bool {
        self.is_nil() || self.is_cons()
    }

    /// Whether this is a symbol, including `nil`
    #[inline]
    pub fn is_symbol(&self) -> bool {
        matches!(self, Self::Nil | Self::Symbol(_))
    }

    /// Whether this is an integer or a float
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Integer payload
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Symbol payload; `nil` is the symbol `nil`
    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Self::Nil => Some(Symbol::nil()),
            Self::Symbol(sym) => Some(sym.clone()),
            _ => None,
        }
    }

    /// Pair payload
    #[inline]
    pub fn as_cons(&self) -> Option<&Arc<Cons>> {
        match self {
            Self::Cons(cell) => Some(cell),
            _ => None,
        }
    }

    /// Function-object payload
    #[inline]
    pub fn as_function(&self) -> Option<&Arc<ByteCodeFunction>> {
        match self {
            Self::Function(function) => Some(function),
            _ => None,
        }
    }

    /// Symbol payload or a wrong-type error
    pub fn expect_symbol(&self) -> VmResult<Symbol> {
        self.as_symbol()
            .ok_or_else(|| VmError::wrong_type("symbolp", self))
    }

    /// Integer payload or a wrong-type error
    pub fn expect_int(&self) -> VmResult<i64> {
        self.as_int()
            .ok_or_else(|| VmError::wrong_type("integerp", self))
    }

    /// `car` of a list; `nil` for `nil`
    pub fn car(&self) -> VmResult<Value> {
        match self {
            Self::Cons(cell) => Ok(cell.car()),
            v if v.is_nil() => Ok(Self::Nil),
            _ => Err(VmError::wrong_type("listp", self)),
        }
    }

    /// `cdr` of a list; `nil` for `nil`
    pub fn cdr(&self) -> VmResult<Value> {
        match self {
            Self::Cons(cell) => Ok(cell.cdr()),
            v if v.is_nil() => Ok(Self::Nil),
            _ => Err(VmError::wrong_type("listp", self)),
        }
    }

    /// Elements of a list and its final tail.
    ///
    /// Returns `None` for a circular list.
    pub fn list_parts(&self) -> Option<(Vec<Value>, Value)> {
        let mut items = Vec::new();
        let mut tail = self.clone();
        let mut slow = self.clone();
        while let Self::Cons(cell) = &tail {
            let (car, cdr) = cell.parts();
            items.push(car);
            tail = cdr;
            if items.len() % 2 == 0 {
                slow = match &slow {
                    Self::Cons(cell) => cell.cdr(),
                    _ => Self::Nil,
                };
                if tail.is_cons() && slow.is_eq(&tail) {
                    return None;
                }
            }
        }
        Some((items, tail))
    }

    /// Elements of a proper list
    pub fn list_to_vec(&self) -> VmResult<Vec<Value>> {
        match self.list_parts() {
            Some((items, tail)) if tail.is_nil() => Ok(items),
            _ => Err(VmError::wrong_type("listp", self)),
        }
    }

    /// Identity comparison (`eq`)
    pub fn is_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Symbol(a), Self::Symbol(b)) => a == b,
            (Self::Cons(a), Self::Cons(b)) => Arc::ptr_eq(a, b),
            (Self::Vector(a), Self::Vector(b)) => Arc::ptr_eq(a, b),
            (Self::Str(a), Self::Str(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            (Self::Primitive(a), Self::Primitive(b)) => std::ptr::eq(*a, *b),
            (a, b) => a.is_nil() && b.is_nil(),
        }
    }

    /// Structural comparison (`equal`), iterative over both car and cdr
    pub fn equal(&self, other: &Value) -> bool {
        let mut pending = vec![(self.clone(), other.clone())];
        while let Some((a, b)) = pending.pop() {
            match (&a, &b) {
                (Self::Cons(x), Self::Cons(y)) => {
                    if Arc::ptr_eq(x, y) {
                        continue;
                    }
                    let (xa, xd) = x.parts();
                    let (ya, yd) = y.parts();
                    pending.push((xd, yd));
                    pending.push((xa, ya));
                }
                (Self::Vector(x), Self::Vector(y)) => {
                    if Arc::ptr_eq(x, y) {
                        continue;
                    }
                    let (xs, ys) = (x.to_vec(), y.to_vec());
                    if xs.len() != ys.len() {
                        return false;
                    }
                    pending.extend(xs.into_iter().zip(ys).rev());
                }
                (Self::Str(x), Self::Str(y)) => {
                    if x[..] != y[..] {
                        return false;
                    }
                }
                _ => {
                    if !a.is_eq(&b) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Whether dropping this value may cascade into further drops
    #[inline]
    pub(crate) fn has_children(&self) -> bool {
        matches!(self, Self::Cons(_) | Self::Vector(_))
    }

    /// Type predicate name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil | Self::Symbol(_) => "symbol",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Cons(_) => "cons",
            Self::Vector(_) => "vector",
            Self::Str(_) => "string",
            Self::Function(_) => "compiled-function",
            Self::Primitive(_) => "subr",
        }
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        if sym.is_nil() {
            Self::Nil
        } else {
            Self::Symbol(sym)
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::bool(b)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::string(text)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_value(f, self, 0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn print_value(f: &mut fmt::Formatter<'_>, value: &Value, depth: usize) -> fmt::Result {
    if depth > MAX_PRINT_DEPTH {
        return f.write_str("...");
    }
    match value {
        Value::Nil => f.write_str("nil"),
        Value::Int(n) => write!(f, "{n}"),
        Value::Float(n) => print_float(f, *n),
        Value::Symbol(sym) => write!(f, "{sym}"),
        Value::Str(bytes) => print_string(f, bytes),
        Value::Cons(_) => print_list(f, value, depth),
        Value::Vector(items) => {
            f.write_str("[")?;
            for (i, item) in items.to_vec().iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                print_value(f, item, depth + 1)?;
            }
            f.write_str("]")
        }
        Value::Function(function) => {
            write!(f, "#[{} ", function.params().to_value())?;
            print_string(f, function.code())?;
            f.write_str(" [")?;
            for (i, constant) in function.constants().iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                print_value(f, constant, depth + 1)?;
            }
            write!(f, "] {}]", function.max_depth())
        }
        Value::Primitive(primitive) => write!(f, "#<subr {}>", primitive.name),
    }
}

fn print_list(f: &mut fmt::Formatter<'_>, value: &Value, depth: usize) -> fmt::Result {
    f.write_str("(")?;
    let mut tail = value.clone();
    let mut count = 0;
    while let Value::Cons(cell) = &tail {
        if count > 0 {
            f.write_str(" ")?;
        }
        if count == MAX_PRINT_LENGTH {
            return f.write_str("...)");
        }
        let (car, cdr) = cell.parts();
        print_value(f, &car, depth + 1)?;
        tail = cdr;
        count += 1;
    }
    if !tail.is_nil() {
        f.write_str(" . ")?;
        print_value(f, &tail, depth + 1)?;
    }
    f.write_str(")")
}

fn print_float(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        f.write_str("0.0e+NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "1.0e+INF" } else { "-1.0e+INF" })
    } else if n.fract() == 0.0 && n.abs() < 1e16 {
        write!(f, "{n:.1}")
    } else {
        write!(f, "{n}")
    }
}

fn print_string(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            for c in text.chars() {
                match c {
                    '"' | '\\' => write!(f, "\\{c}")?,
                    c if c.is_control() && c != '\n' && c != '\t' => {
                        write!(f, "\\{:o}", c as u32)?
                    }
                    c => write!(f, "{c}")?,
                }
            }
        }
        Err(_) => {
            for &byte in bytes {
                match byte {
                    b'"' | b'\\' => write!(f, "\\{}", byte as char)?,
                    0x20..=0x7E => write!(f, "{}", byte as char)?,
                    _ => write!(f, "\\{byte:o}")?,
                }
            }
        }
    }
    f.write_str("\"")
}
