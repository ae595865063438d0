//! Value operations shared by dedicated opcodes and primitives
//!
//! Integer arithmetic is checked: a result outside `i64` is an
//! [`VmError::Overflow`] instead of wrapping. Mixed integer/float operands
//! are computed in floating point.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{VmError, VmResult};
use crate::value::Value;

// ==================== Numbers ====================

#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> VmResult<Self> {
        match value {
            Value::Int(n) => Ok(Self::Int(*n)),
            Value::Float(n) => Ok(Self::Float(*n)),
            other => Err(VmError::wrong_type("number-or-marker-p", other)),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Self::Int(n) => n as f64,
            Self::Float(n) => n,
        }
    }
}

fn arith(
    a: &Value,
    b: &Value,
    name: &'static str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> VmResult<Value> {
    match (Number::of(a)?, Number::of(b)?) {
        (Number::Int(x), Number::Int(y)) => int_op(x, y)
            .map(Value::Int)
            .ok_or(VmError::Overflow(name)),
        (x, y) => Ok(Value::Float(float_op(x.as_f64(), y.as_f64()))),
    }
}

/// `(+ a b)`
pub fn plus(a: &Value, b: &Value) -> VmResult<Value> {
    arith(a, b, "+", i64::checked_add, |x, y| x + y)
}

/// `(- a b)`
pub fn diff(a: &Value, b: &Value) -> VmResult<Value> {
    arith(a, b, "-", i64::checked_sub, |x, y| x - y)
}

/// `(* a b)`
pub fn mult(a: &Value, b: &Value) -> VmResult<Value> {
    arith(a, b, "*", i64::checked_mul, |x, y| x * y)
}

/// `(/ a b)`; integer division truncates toward zero
pub fn quo(a: &Value, b: &Value) -> VmResult<Value> {
    match (Number::of(a)?, Number::of(b)?) {
        (Number::Int(_), Number::Int(0)) => Err(VmError::ArithError),
        (Number::Int(x), Number::Int(y)) => {
            x.checked_div(y).map(Value::Int).ok_or(VmError::Overflow("/"))
        }
        (x, y) => Ok(Value::Float(x.as_f64() / y.as_f64())),
    }
}

/// `(% a b)`; integers only
pub fn rem(a: &Value, b: &Value) -> VmResult<Value> {
    let x = a
        .as_int()
        .ok_or_else(|| VmError::wrong_type("integer-or-marker-p", a))?;
    let y = b
        .as_int()
        .ok_or_else(|| VmError::wrong_type("integer-or-marker-p", b))?;
    if y == 0 {
        return Err(VmError::ArithError);
    }
    Ok(Value::Int(x.wrapping_rem(y)))
}

/// `(1+ n)`
pub fn add1(n: &Value) -> VmResult<Value> {
    plus(n, &Value::Int(1))
}

/// `(1- n)`
pub fn sub1(n: &Value) -> VmResult<Value> {
    diff(n, &Value::Int(1))
}

/// `(- n)`
pub fn negate(n: &Value) -> VmResult<Value> {
    match Number::of(n)? {
        Number::Int(x) => x.checked_neg().map(Value::Int).ok_or(VmError::Overflow("-")),
        Number::Float(x) => Ok(Value::Float(-x)),
    }
}

/// Numeric comparison; `None` when a NaN is involved
fn compare(a: &Value, b: &Value) -> VmResult<Option<Ordering>> {
    Ok(match (Number::of(a)?, Number::of(b)?) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        (x, y) => x.as_f64().partial_cmp(&y.as_f64()),
    })
}

/// `(= a b)`
pub fn num_eq(a: &Value, b: &Value) -> VmResult<Value> {
    Ok(Value::bool(compare(a, b)? == Some(Ordering::Equal)))
}

/// `(< a b)`
pub fn lss(a: &Value, b: &Value) -> VmResult<Value> {
    Ok(Value::bool(compare(a, b)? == Some(Ordering::Less)))
}

/// `(> a b)`
pub fn gtr(a: &Value, b: &Value) -> VmResult<Value> {
    Ok(Value::bool(compare(a, b)? == Some(Ordering::Greater)))
}

/// `(<= a b)`
pub fn leq(a: &Value, b: &Value) -> VmResult<Value> {
    Ok(Value::bool(matches!(
        compare(a, b)?,
        Some(Ordering::Less | Ordering::Equal)
    )))
}

/// `(>= a b)`
pub fn geq(a: &Value, b: &Value) -> VmResult<Value> {
    Ok(Value::bool(matches!(
        compare(a, b)?,
        Some(Ordering::Greater | Ordering::Equal)
    )))
}

fn pick(a: &Value, b: &Value, want: Ordering) -> VmResult<Value> {
    let chosen = match compare(a, b)? {
        None => return Ok(Value::Float(f64::NAN)),
        Some(ordering) if ordering == want => a,
        Some(_) => b,
    };
    if matches!(a, Value::Float(_)) || matches!(b, Value::Float(_)) {
        Ok(Value::Float(Number::of(chosen)?.as_f64()))
    } else {
        Ok(chosen.clone())
    }
}

/// `(max a b)`; a float operand makes the result a float
pub fn max(a: &Value, b: &Value) -> VmResult<Value> {
    pick(a, b, Ordering::Greater)
}

/// `(min a b)`; a float operand makes the result a float
pub fn min(a: &Value, b: &Value) -> VmResult<Value> {
    pick(a, b, Ordering::Less)
}

// ==================== Predicates ====================

/// `(not x)`
#[inline]
pub fn not(x: &Value) -> Value {
    Value::bool(x.is_nil())
}

/// `(eq a b)`
#[inline]
pub fn eq(a: &Value, b: &Value) -> Value {
    Value::bool(a.is_eq(b))
}

/// `(equal a b)`
#[inline]
pub fn equal(a: &Value, b: &Value) -> Value {
    Value::bool(a.equal(b))
}

/// `(symbolp x)`
#[inline]
pub fn symbolp(x: &Value) -> Value {
    Value::bool(x.is_symbol())
}

/// `(consp x)`
#[inline]
pub fn consp(x: &Value) -> Value {
    Value::bool(x.is_cons())
}

/// `(listp x)`
#[inline]
pub fn listp(x: &Value) -> Value {
    Value::bool(x.is_list())
}

/// `(stringp x)`
#[inline]
pub fn stringp(x: &Value) -> Value {
    Value::bool(matches!(x, Value::Str(_)))
}

/// `(numberp x)`
#[inline]
pub fn numberp(x: &Value) -> Value {
    Value::bool(x.is_number())
}

/// `(integerp x)`
#[inline]
pub fn integerp(x: &Value) -> Value {
    Value::bool(matches!(x, Value::Int(_)))
}

// ==================== Lists ====================

/// `(car-safe x)`
pub fn car_safe(x: &Value) -> Value {
    x.as_cons().map(|cell| cell.car()).unwrap_or_default()
}

/// `(cdr-safe x)`
pub fn cdr_safe(x: &Value) -> Value {
    x.as_cons().map(|cell| cell.cdr()).unwrap_or_default()
}

/// `(nthcdr n list)`
pub fn nthcdr(n: &Value, list: &Value) -> VmResult<Value> {
    let n = n.expect_int()?;
    let mut tail = list.clone();
    let mut guard = CycleGuard::new(list);
    for _ in 0..n.max(0) {
        if tail.is_nil() {
            break;
        }
        tail = tail.cdr()?;
        guard.step(&tail, list)?;
    }
    Ok(tail)
}

/// `(nth n list)`
pub fn nth(n: &Value, list: &Value) -> VmResult<Value> {
    nthcdr(n, list)?.car()
}

/// `(length seq)`
pub fn length(seq: &Value) -> VmResult<Value> {
    let len = match seq {
        Value::Cons(_) => seq.list_to_vec()?.len(),
        Value::Vector(items) => items.len(),
        Value::Str(bytes) => bytes.len(),
        v if v.is_nil() => 0,
        other => return Err(VmError::wrong_type("sequencep", other)),
    };
    Ok(Value::Int(len as i64))
}

fn index(array: &Value, idx: &Value, len: usize) -> VmResult<usize> {
    let i = idx.expect_int()?;
    usize::try_from(i)
        .ok()
        .filter(|i| *i < len)
        .ok_or_else(|| VmError::ArgsOutOfRange(array.clone(), idx.clone()))
}

/// `(aref array idx)`
pub fn aref(array: &Value, idx: &Value) -> VmResult<Value> {
    match array {
        Value::Vector(items) => {
            let i = index(array, idx, items.len())?;
            items
                .get(i)
                .ok_or_else(|| VmError::ArgsOutOfRange(array.clone(), idx.clone()))
        }
        Value::Str(bytes) => {
            let i = index(array, idx, bytes.len())?;
            Ok(Value::Int(bytes[i] as i64))
        }
        other => Err(VmError::wrong_type("arrayp", other)),
    }
}

/// `(aset array idx value)`; strings are immutable
pub fn aset(array: &Value, idx: &Value, value: Value) -> VmResult<Value> {
    match array {
        Value::Vector(items) => {
            let i = index(array, idx, items.len())?;
            if !items.set(i, value.clone()) {
                return Err(VmError::ArgsOutOfRange(array.clone(), idx.clone()));
            }
            Ok(value)
        }
        other => Err(VmError::wrong_type("vectorp", other)),
    }
}

/// `(elt seq n)`; out-of-range list access yields `nil`
pub fn elt(seq: &Value, n: &Value) -> VmResult<Value> {
    if seq.is_list() {
        nth(n, seq)
    } else {
        aref(seq, n)
    }
}

/// Cycle detection for list walks (Brent's algorithm)
///
/// Remembers one cons and compares every visited tail against it, moving
/// the remembered cons forward after 1, 2, 4, ... steps. A walk over a
/// circular list meets the remembered cons within twice the cycle length.
struct CycleGuard {
    saved: Value,
    limit: usize,
    steps: usize,
}

impl CycleGuard {
    fn new(list: &Value) -> Self {
        Self {
            saved: list.clone(),
            limit: 1,
            steps: 0,
        }
    }

    /// Account for moving onto `tail`; fails once `list` turns out circular
    fn step(&mut self, tail: &Value, list: &Value) -> VmResult<()> {
        if tail.is_cons() && tail.is_eq(&self.saved) {
            return Err(VmError::wrong_type("listp", list));
        }
        self.steps += 1;
        if self.steps == self.limit {
            self.saved = tail.clone();
            self.limit = self.limit.saturating_mul(2);
            self.steps = 0;
        }
        Ok(())
    }
}

/// Walk the conses of `list`, stopping when `visit` returns a value
fn find_tail(
    list: &Value,
    mut visit: impl FnMut(&Value, &Value) -> Option<Value>,
) -> VmResult<Value> {
    let mut tail = list.clone();
    let mut guard = CycleGuard::new(list);
    loop {
        match &tail {
            Value::Cons(cell) => {
                let (car, cdr) = cell.parts();
                if let Some(found) = visit(&car, &tail) {
                    return Ok(found);
                }
                guard.step(&cdr, list)?;
                tail = cdr;
            }
            v if v.is_nil() => return Ok(Value::Nil),
            _ => return Err(VmError::wrong_type("listp", list)),
        }
    }
}

/// `(memq elt list)`
pub fn memq(elt: &Value, list: &Value) -> VmResult<Value> {
    find_tail(list, |car, tail| car.is_eq(elt).then(|| tail.clone()))
}

/// `(member elt list)`
pub fn member(elt: &Value, list: &Value) -> VmResult<Value> {
    find_tail(list, |car, tail| car.equal(elt).then(|| tail.clone()))
}

/// `(assq key alist)`; non-pair elements are skipped
pub fn assq(key: &Value, alist: &Value) -> VmResult<Value> {
    find_tail(alist, |car, _| {
        car.as_cons()
            .filter(|entry| entry.car().is_eq(key))
            .map(|_| car.clone())
    })
}

/// `(nreverse seq)`; reverses list links or vector elements in place
pub fn nreverse(seq: &Value) -> VmResult<Value> {
    if let Value::Vector(items) = seq {
        items.reverse();
        return Ok(seq.clone());
    }
    let mut reversed = Value::Nil;
    let mut tail = seq.clone();
    loop {
        match tail {
            Value::Cons(ref cell) => {
                let next = cell.cdr();
                cell.set_cdr(reversed);
                reversed = tail;
                tail = next;
            }
            ref v if v.is_nil() => return Ok(reversed),
            _ => return Err(VmError::wrong_type("listp", seq)),
        }
    }
}

/// `(nconc a b)`; destructively appends `b` to `a`
pub fn nconc(a: &Value, b: &Value) -> VmResult<Value> {
    if a.is_nil() {
        return Ok(b.clone());
    }
    let Value::Cons(first) = a else {
        return Err(VmError::wrong_type("consp", a));
    };
    let mut last = first.clone();
    let mut guard = CycleGuard::new(a);
    loop {
        let tail = last.cdr();
        let Value::Cons(next) = &tail else {
            break;
        };
        guard.step(&tail, a)?;
        last = Arc::clone(next);
    }
    last.set_cdr(b.clone());
    Ok(a.clone())
}

/// `(setcar cell value)`
pub fn setcar(cell: &Value, value: Value) -> VmResult<Value> {
    let pair = cell
        .as_cons()
        .ok_or_else(|| VmError::wrong_type("consp", cell))?;
    pair.set_car(value.clone());
    Ok(value)
}

/// `(setcdr cell value)`
pub fn setcdr(cell: &Value, value: Value) -> VmResult<Value> {
    let pair = cell
        .as_cons()
        .ok_or_else(|| VmError::wrong_type("consp", cell))?;
    pair.set_cdr(value.clone());
    Ok(value)
}

// ==================== Strings ====================

/// Bytes of a string or the name of a symbol
fn string_data(value: &Value) -> VmResult<&[u8]> {
    match value {
        Value::Str(bytes) => Ok(&bytes[..]),
        Value::Symbol(sym) => Ok(sym.name().as_bytes()),
        Value::Nil => Ok(b"nil".as_slice()),
        other => Err(VmError::wrong_type("stringp", other)),
    }
}

/// `(string= a b)`
pub fn string_eq(a: &Value, b: &Value) -> VmResult<Value> {
    Ok(Value::bool(string_data(a)? == string_data(b)?))
}

/// `(string< a b)`
pub fn string_lss(a: &Value, b: &Value) -> VmResult<Value> {
    Ok(Value::bool(string_data(a)? < string_data(b)?))
}

fn push_char(out: &mut Vec<u8>, value: &Value) -> VmResult<()> {
    let c = value
        .as_int()
        .and_then(|n| u32::try_from(n).ok())
        .and_then(char::from_u32)
        .ok_or_else(|| VmError::wrong_type("characterp", value))?;
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    Ok(())
}

/// `(concat ...)`; accepts strings and sequences of characters
pub fn concat(parts: &[Value]) -> VmResult<Value> {
    let mut out = Vec::new();
    for part in parts {
        match part {
            Value::Str(bytes) => out.extend_from_slice(bytes),
            Value::Cons(_) => {
                for c in part.list_to_vec()? {
                    push_char(&mut out, &c)?;
                }
            }
            Value::Vector(items) => {
                for c in items.to_vec() {
                    push_char(&mut out, &c)?;
                }
            }
            v if v.is_nil() => {}
            other => return Err(VmError::wrong_type("sequencep", other)),
        }
    }
    Ok(Value::bytes(out))
}

fn range_bound(value: &Value, len: usize, default: usize) -> Option<usize> {
    match value {
        v if v.is_nil() => Some(default),
        Value::Int(n) if *n < 0 => len.checked_sub(n.unsigned_abs() as usize),
        Value::Int(n) => usize::try_from(*n).ok().filter(|n| *n <= len),
        _ => None,
    }
}

/// `(substring seq from to)`; negative positions count from the end
pub fn substring(seq: &Value, from: &Value, to: &Value) -> VmResult<Value> {
    for bound in [from, to] {
        if !bound.is_nil() && bound.as_int().is_none() {
            return Err(VmError::wrong_type("integerp", bound));
        }
    }
    let bounds = |len: usize| -> VmResult<(usize, usize)> {
        let out_of_range =
            || VmError::ArgsOutOfRange(seq.clone(), Value::list([from.clone(), to.clone()]));
        let start = range_bound(from, len, 0).ok_or_else(out_of_range)?;
        let end = range_bound(to, len, len).ok_or_else(out_of_range)?;
        if start > end {
            return Err(out_of_range());
        }
        Ok((start, end))
    };
    match seq {
        Value::Str(bytes) => {
            let (start, end) = bounds(bytes.len())?;
            Ok(Value::bytes(&bytes[start..end]))
        }
        Value::Vector(items) => {
            let items = items.to_vec();
            let (start, end) = bounds(items.len())?;
            Ok(Value::vector(items[start..end].to_vec()))
        }
        other => Err(VmError::wrong_type("arrayp", other)),
    }
}

fn change_case(x: &Value, upper: bool) -> VmResult<Value> {
    match x {
        Value::Int(n) => {
            let c = u32::try_from(*n)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| VmError::wrong_type("char-or-string-p", x))?;
            let mapped = if upper {
                c.to_uppercase().next()
            } else {
                c.to_lowercase().next()
            };
            Ok(Value::Int(mapped.unwrap_or(c) as i64))
        }
        Value::Str(bytes) => Ok(match std::str::from_utf8(bytes) {
            Ok(text) if upper => Value::string(&text.to_uppercase()),
            Ok(text) => Value::string(&text.to_lowercase()),
            Err(_) if upper => Value::bytes(bytes.to_ascii_uppercase()),
            Err(_) => Value::bytes(bytes.to_ascii_lowercase()),
        }),
        other => Err(VmError::wrong_type("char-or-string-p", other)),
    }
}

/// `(upcase x)`
pub fn upcase(x: &Value) -> VmResult<Value> {
    change_case(x, true)
}

/// `(downcase x)`
pub fn downcase(x: &Value) -> VmResult<Value> {
    change_case(x, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::Int))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(plus(&Value::Int(3), &Value::Int(4)).unwrap(), Value::Int(7));
        assert_eq!(
            plus(&Value::Int(1), &Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(quo(&Value::Int(-7), &Value::Int(2)).unwrap(), Value::Int(-3));
        assert_eq!(rem(&Value::Int(-7), &Value::Int(2)).unwrap(), Value::Int(-1));
        assert!(matches!(
            quo(&Value::Int(1), &Value::Int(0)),
            Err(VmError::ArithError)
        ));
        assert!(matches!(
            plus(&Value::Int(i64::MAX), &Value::Int(1)),
            Err(VmError::Overflow("+"))
        ));
        assert!(matches!(negate(&Value::Int(i64::MIN)), Err(VmError::Overflow(_))));
        assert!(matches!(
            plus(&Value::string("1"), &Value::Int(1)),
            Err(VmError::WrongType {
                expected: "number-or-marker-p",
                ..
            })
        ));
        let inf = quo(&Value::Float(1.0), &Value::Int(0)).unwrap();
        assert!(matches!(inf, Value::Float(f) if f.is_infinite()));
    }

    #[test]
    fn test_comparisons() {
        assert!(!lss(&Value::Int(1), &Value::Int(2)).unwrap().is_nil());
        assert!(!num_eq(&Value::Int(2), &Value::Float(2.0)).unwrap().is_nil());
        assert!(geq(&Value::Float(f64::NAN), &Value::Int(1)).unwrap().is_nil());
        assert_eq!(max(&Value::Int(1), &Value::Float(0.5)).unwrap(), Value::Float(1.0));
        assert_eq!(min(&Value::Int(1), &Value::Int(-4)).unwrap(), Value::Int(-4));
    }

    #[test]
    fn test_list_access() {
        let list = ints(&[10, 20, 30]);
        assert_eq!(nth(&Value::Int(1), &list).unwrap(), Value::Int(20));
        assert!(nth(&Value::Int(5), &list).unwrap().is_nil());
        assert_eq!(nthcdr(&Value::Int(2), &list).unwrap(), ints(&[30]));
        assert_eq!(length(&list).unwrap(), Value::Int(3));
        assert_eq!(elt(&list, &Value::Int(0)).unwrap(), Value::Int(10));
        assert!(length(&Value::cons(Value::Int(1), Value::Int(2))).is_err());
        assert!(nth(&Value::Int(0), &Value::Int(3)).is_err());
    }

    #[test]
    fn test_membership() {
        let key = Value::symbol("b");
        let list = Value::list([Value::symbol("a"), key.clone(), Value::symbol("c")]);
        assert_eq!(length(&memq(&key, &list).unwrap()).unwrap(), Value::Int(2));
        assert!(memq(&Value::string("b"), &list).unwrap().is_nil());

        let strings = Value::list([Value::string("x"), Value::string("y")]);
        assert!(!member(&Value::string("y"), &strings).unwrap().is_nil());

        let alist = Value::list([
            Value::Int(7),
            Value::cons(Value::symbol("k"), Value::Int(1)),
        ]);
        assert_eq!(
            assq(&Value::symbol("k"), &alist).unwrap(),
            Value::cons(Value::symbol("k"), Value::Int(1))
        );
    }

    #[test]
    fn test_destructive_list_ops() {
        let list = ints(&[1, 2, 3]);
        assert_eq!(nreverse(&list).unwrap(), ints(&[3, 2, 1]));

        let a = ints(&[1]);
        let joined = nconc(&a, &ints(&[2, 3])).unwrap();
        assert!(joined.is_eq(&a));
        assert_eq!(a, ints(&[1, 2, 3]));

        let cell = Value::cons(Value::Int(1), Value::Nil);
        setcar(&cell, Value::Int(9)).unwrap();
        setcdr(&cell, Value::Int(8)).unwrap();
        assert_eq!(cell, Value::cons(Value::Int(9), Value::Int(8)));
        assert!(setcar(&Value::Nil, Value::Int(1)).is_err());
    }

    fn circular(values: &[i64]) -> Value {
        let list = ints(values);
        let mut last = list.clone();
        while let Ok(next @ Value::Cons(_)) = last.cdr() {
            last = next;
        }
        setcdr(&last, list.clone()).unwrap();
        list
    }

    #[test]
    fn test_circular_list_walks_terminate() {
        for len in [1, 2, 5] {
            let values: Vec<i64> = (1..=len).collect();
            let list = circular(&values);
            let not_a_list = |result: VmResult<Value>| {
                matches!(result, Err(VmError::WrongType { expected: "listp", .. }))
            };

            assert!(not_a_list(memq(&Value::Int(9), &list)));
            assert!(not_a_list(member(&Value::Int(9), &list)));
            assert!(not_a_list(assq(&Value::symbol("k"), &list)));
            assert!(not_a_list(nthcdr(&Value::Int(1000), &list)));
            assert!(not_a_list(nth(&Value::Int(1000), &list)));
            assert!(not_a_list(nconc(&list, &Value::Nil)));
            assert!(memq(&Value::Int(len), &list).unwrap().is_cons());
            assert_eq!(nth(&Value::Int(len - 1), &list).unwrap(), Value::Int(len));
            setcdr(&list, Value::Nil).unwrap();
        }

        let long = ints(&(0..1000).collect::<Vec<_>>());
        assert_eq!(memq(&Value::Int(999), &long).unwrap(), ints(&[999]));
        assert!(nthcdr(&Value::Int(2000), &long).unwrap().is_nil());
        assert!(nconc(&long, &ints(&[1000])).unwrap().is_eq(&long));
    }

    #[test]
    fn test_arrays() {
        let v = Value::vector(vec![Value::Int(1), Value::Int(2)]);
        aset(&v, &Value::Int(1), Value::symbol("x")).unwrap();
        assert_eq!(aref(&v, &Value::Int(1)).unwrap(), Value::symbol("x"));
        assert!(matches!(
            aref(&v, &Value::Int(2)),
            Err(VmError::ArgsOutOfRange(..))
        ));
        assert!(aref(&v, &Value::Int(-1)).is_err());
        assert_eq!(aref(&Value::string("A"), &Value::Int(0)).unwrap(), Value::Int(65));
        assert!(matches!(
            aset(&Value::string("abc"), &Value::Int(0), Value::Int(66)),
            Err(VmError::WrongType { .. })
        ));
    }

    #[test]
    fn test_strings() {
        let s = Value::string("hello");
        assert_eq!(
            substring(&s, &Value::Int(1), &Value::Int(-1)).unwrap(),
            Value::string("ell")
        );
        assert_eq!(
            substring(&s, &Value::Int(-2), &Value::Nil).unwrap(),
            Value::string("lo")
        );
        assert!(substring(&s, &Value::Int(3), &Value::Int(2)).is_err());
        assert!(substring(&s, &Value::Int(0), &Value::Int(9)).is_err());

        let joined = concat(&[
            Value::string("ab"),
            Value::Nil,
            Value::list([Value::Int('c' as i64)]),
            Value::vector(vec![Value::Int('é' as i64)]),
        ])
        .unwrap();
        assert_eq!(joined, Value::string("abcé"));
        assert!(concat(&[Value::Int(1)]).is_err());

        assert!(!string_eq(&Value::string("foo"), &Value::symbol("foo")).unwrap().is_nil());
        assert!(!string_lss(&Value::string("abc"), &Value::string("abd")).unwrap().is_nil());
        assert_eq!(upcase(&Value::string("abc")).unwrap(), Value::string("ABC"));
        assert_eq!(downcase(&Value::Int('Q' as i64)).unwrap(), Value::Int('q' as i64));
    }
}
