//! Runtime values of the reference interpreter.
//!
//! The semantics follow the JavaScript preamble so that `--run` and the
//! emitted module print the same thing: numbers are `f64`, `==` is deep
//! equality, `case` and map keys compare by identity for containers.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use super::ast::{BinaryOp, FnDef, UnaryOp};
use super::builtins::Builtin;
use super::vm::Env;
use crate::error::RuntimeError;

pub type List = Rc<RefCell<Vec<Value>>>;
/// Insertion-ordered entries, like a JavaScript `Map`.
pub type Map = Rc<RefCell<Vec<(Value, Value)>>>;

/// A `fn` together with the environment it was defined in.
pub struct Closure {
    pub def: FnDef,
    pub env: Env,
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(List),
    Map(Map),
    Func(Rc<Closure>),
    Builtin(Builtin),
}

fn type_error(op: &str, v: &Value) -> RuntimeError {
    RuntimeError::Type {
        op: op.to_string(),
        ty: v.type_name().to_string(),
    }
}

impl Value {
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Self {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Func(_) | Value::Builtin(_) => "fn",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Identity for containers and functions, value for everything else.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            _ => false,
        }
    }

    /// Structural equality used by `==` and `!=`.
    pub fn deep_eq(&self, other: &Value) -> bool {
        if self.strict_eq(other) {
            return true;
        }
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.deep_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter()
                            .find(|(k2, _)| k.strict_eq(k2))
                            .is_some_and(|(_, v2)| v.deep_eq(v2))
                    })
            }
            _ => false,
        }
    }

    /// Whole, non-negative number below `len`.
    fn as_index(&self, len: usize) -> Option<usize> {
        match self {
            Value::Num(n) if n.fract() == 0.0 && *n >= 0.0 && *n < len as f64 => Some(*n as usize),
            _ => None,
        }
    }

    /// `a[k]`; a missing key or an out-of-range index reads as null.
    pub fn get(&self, key: &Value) -> Result<Value, RuntimeError> {
        let v = match self {
            Value::Map(m) => m
                .borrow()
                .iter()
                .find(|(k, _)| k.strict_eq(key))
                .map(|(_, v)| v.clone()),
            Value::List(items) => {
                let items = items.borrow();
                key.as_index(items.len()).map(|i| items[i].clone())
            }
            Value::Str(s) => key
                .as_index(s.chars().count())
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Str(c.to_string())),
            _ => return Err(type_error("index", self)),
        };
        Ok(v.unwrap_or(Value::Null))
    }

    /// `a[k] = v`. Lists grow by one when `k` is exactly their length.
    pub fn set(&self, key: Value, value: Value) -> Result<Value, RuntimeError> {
        match self {
            Value::Map(m) => {
                let mut m = m.borrow_mut();
                match m.iter_mut().find(|(k, _)| k.strict_eq(&key)) {
                    Some(entry) => entry.1 = value.clone(),
                    None => m.push((key, value.clone())),
                }
            }
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let len = items.len();
                match key.as_index(len + 1) {
                    Some(i) if i == len => items.push(value.clone()),
                    Some(i) => items[i] = value.clone(),
                    None => return Err(type_error("assign past the end of", self)),
                }
            }
            _ => return Err(type_error("assign into", self)),
        }
        Ok(value)
    }

    pub fn len(&self) -> Result<usize, RuntimeError> {
        match self {
            Value::Str(s) => Ok(s.chars().count()),
            Value::List(items) => Ok(items.borrow().len()),
            Value::Map(m) => Ok(m.borrow().len()),
            _ => Err(type_error("take len of", self)),
        }
    }

    /// `a[start:end]` with the bounds clamped the way `Array.prototype.slice`
    /// clamps them. Null bounds are omitted ones.
    pub fn slice(&self, start: &Value, end: &Value) -> Result<Value, RuntimeError> {
        let bounds = |len| -> Result<(usize, usize), RuntimeError> {
            let lo = slice_bound(start, len, 0)?;
            Ok((lo, slice_bound(end, len, len)?.max(lo)))
        };
        match self {
            Value::Str(s) => {
                let (lo, hi) = bounds(s.chars().count())?;
                Ok(Value::Str(s.chars().skip(lo).take(hi - lo).collect()))
            }
            Value::List(items) => {
                let items = items.borrow();
                let (lo, hi) = bounds(items.len())?;
                Ok(Value::list(items[lo..hi].to_vec()))
            }
            _ => Err(type_error("slice", self)),
        }
    }

    /// What a `for x : v` loop visits: elements, characters or map keys.
    pub fn iter_values(&self) -> Result<Vec<Value>, RuntimeError> {
        match self {
            Value::List(items) => Ok(items.borrow().clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Map(m) => Ok(m.borrow().iter().map(|(k, _)| k.clone()).collect()),
            _ => Err(type_error("iterate", self)),
        }
    }

    /// What a `for i, x : v` loop visits.
    pub fn entries(&self) -> Result<Vec<(Value, Value)>, RuntimeError> {
        match self {
            Value::Map(m) => Ok(m.borrow().clone()),
            _ => Ok(self
                .iter_values()?
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::Num(i as f64), v))
                .collect()),
        }
    }

    /// Numeric view used by arithmetic. Anything without one is NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Num(n) => *n,
            Value::Str(s) => string_to_number(s),
            _ => f64::NAN,
        }
    }

    pub fn unary(op: UnaryOp, v: &Value) -> Value {
        match op {
            UnaryOp::Not => Value::Bool(!v.truthy()),
            UnaryOp::Neg => Value::Num(-v.to_number()),
            UnaryOp::BitNot => Value::Num(f64::from(!to_int32(v.to_number()))),
        }
    }

    /// Every binary operator. `&&` and `||` are short-circuited by the
    /// interpreter before they get here.
    pub fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
        use BinaryOp::*;

        match op {
            Add if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
                Value::Str(format!("{l}{r}"))
            }
            Eq => Value::Bool(l.deep_eq(r)),
            Ne => Value::Bool(!l.deep_eq(r)),
            Lt | Le | Gt | Ge => {
                let ord = match (l, r) {
                    (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
                    _ => l.to_number().partial_cmp(&r.to_number()),
                };
                let holds = match (op, ord) {
                    (_, None) => false,
                    (Lt, Some(o)) => o == Ordering::Less,
                    (Le, Some(o)) => o != Ordering::Greater,
                    (Gt, Some(o)) => o == Ordering::Greater,
                    (_, Some(o)) => o != Ordering::Less,
                };
                Value::Bool(holds)
            }
            And if l.truthy() => r.clone(),
            Or if !l.truthy() => r.clone(),
            And | Or => l.clone(),
            _ => Value::Num(arithmetic(op, l.to_number(), r.to_number())),
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) if nested => {
                write!(f, "{}", serde_json::Value::String(s.clone()))
            }
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    v.write(f, true)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    k.write(f, true)?;
                    write!(f, ": ")?;
                    v.write(f, true)?;
                }
                write!(f, "}}")
            }
            Value::Func(c) => write!(f, "<fn {}>", c.def.name),
            Value::Builtin(b) => write!(f, "<fn {}>", b.name()),
        }
    }
}

/// Same text as the preamble's `_str`: strings are bare at the top level
/// and quoted inside containers.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, true)
    }
}

fn slice_bound(v: &Value, len: usize, omitted: usize) -> Result<usize, RuntimeError> {
    let n = match v {
        Value::Null => return Ok(omitted),
        Value::Num(n) if n.is_nan() => 0.0,
        Value::Num(n) => n.trunc(),
        _ => return Err(type_error("slice with", v)),
    };
    let len = len as f64;
    let i = if n < 0.0 {
        (len + n).max(0.0)
    } else {
        n.min(len)
    };
    Ok(i as usize)
}

fn arithmetic(op: BinaryOp, a: f64, b: f64) -> f64 {
    use BinaryOp::*;

    match op {
        Pow => a.powf(b),
        Mul => a * b,
        Div => a / b,
        Rem => a % b,
        FloorDiv => (a / b).floor(),
        Add => a + b,
        Sub => a - b,
        Shl => f64::from(to_int32(a).wrapping_shl(to_uint32(b) & 31)),
        Shr => f64::from(to_int32(a) >> (to_uint32(b) & 31)),
        UShr => f64::from(to_uint32(a) >> (to_uint32(b) & 31)),
        BitAnd => f64::from(to_int32(a) & to_int32(b)),
        BitXor => f64::from(to_int32(a) ^ to_int32(b)),
        BitOr => f64::from(to_int32(a) | to_int32(b)),
        Eq | Ne | Lt | Le | Gt | Ge | And | Or => f64::NAN,
    }
}

fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// Number text as JavaScript's `String(n)` writes it for everyday values.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// Value of a number literal: decimal with `_` separators, or a
/// `0x`/`0o`/`0b` integer.
pub fn parse_number(text: &str) -> Option<f64> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    match radix_prefix(&digits) {
        Some(radix) => radix_value(&digits[2..], radix),
        None => digits.parse().ok(),
    }
}

fn radix_prefix(text: &str) -> Option<u32> {
    match text.get(..2).map(str::to_ascii_lowercase).as_deref() {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    }
}

/// Integer digits rounded to the nearest `f64`. Exact up to `u128`, then
/// accumulated in floating point.
fn radix_value(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let mut exact = Some(0u128);
    let mut approx = 0.0;
    for c in digits.chars() {
        let d = c.to_digit(radix)?;
        exact = exact
            .and_then(|n| n.checked_mul(u128::from(radix)))
            .and_then(|n| n.checked_add(u128::from(d)));
        approx = approx * f64::from(radix) + f64::from(d);
    }
    Some(exact.map_or(approx, |n| n as f64))
}

/// JavaScript's `Number(text)`.
fn string_to_number(text: &str) -> f64 {
    let text = text.trim();
    match text {
        "" => return 0.0,
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(radix) = radix_prefix(text) {
        return radix_value(&text[2..], radix).unwrap_or(f64::NAN);
    }
    let decimal = |c: char| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-');
    if text.chars().all(decimal) {
        text.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Num(n)
    }

    fn s(text: &str) -> Value {
        Value::Str(text.to_string())
    }

    #[test]
    fn test_display_matches_preamble_str() {
        let test_cases = vec![
            (Value::Null, "null"),
            (Value::Bool(true), "true"),
            (num(3.0), "3"),
            (num(-0.0), "0"),
            (num(2.5), "2.5"),
            (num(f64::INFINITY), "Infinity"),
            (s("hi"), "hi"),
            (Value::list(vec![num(1.0), s("a"), Value::Null]), "[1, \"a\", null]"),
            (Value::map(vec![(s("k"), Value::list(vec![]))]), "{\"k\": []}"),
            (Value::Builtin(Builtin::Print), "<fn print>"),
            (Value::Builtin(Builtin::Strbase), "<fn strbase>"),
        ];

        for (v, expected) in test_cases {
            assert_eq!(v.to_string(), expected);
        }
    }

    #[test]
    fn test_parse_number() {
        let test_cases = vec![
            ("42", Some(42.0)),
            ("1_000", Some(1000.0)),
            ("3.5", Some(3.5)),
            ("0xff", Some(255.0)),
            ("0B101", Some(5.0)),
            ("0o17", Some(15.0)),
            ("0xzz", None),
            ("0x", None),
            ("0x10000000000000000", Some(18446744073709551616.0)),
            ("0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF", Some(2f64.powi(136))),
        ];

        for (text, expected) in test_cases {
            assert_eq!(parse_number(text), expected, "text: {text}");
        }
    }

    #[test]
    fn test_equality() {
        let a = Value::list(vec![num(1.0), s("x")]);
        let b = Value::list(vec![num(1.0), s("x")]);
        assert!(a.deep_eq(&b));
        assert!(!a.strict_eq(&b));
        assert!(a.strict_eq(&a.clone()));

        let m1 = Value::map(vec![(s("a"), num(1.0)), (s("b"), num(2.0))]);
        let m2 = Value::map(vec![(s("b"), num(2.0)), (s("a"), num(1.0))]);
        assert!(m1.deep_eq(&m2));
        assert!(!num(1.0).deep_eq(&s("1")));
        assert!(!num(f64::NAN).deep_eq(&num(f64::NAN)));
    }

    #[test]
    fn test_containers() {
        let xs = Value::list(vec![num(10.0), num(20.0)]);
        assert_eq!(xs.get(&num(1.0)).unwrap().to_string(), "20");
        assert_eq!(xs.get(&num(5.0)).unwrap().to_string(), "null");
        xs.set(num(2.0), num(30.0)).unwrap();
        assert_eq!(xs.to_string(), "[10, 20, 30]");
        assert!(xs.set(num(9.0), num(1.0)).is_err());

        let m = Value::map(vec![]);
        m.set(s("a"), num(1.0)).unwrap();
        m.set(s("a"), num(2.0)).unwrap();
        assert_eq!(m.len().unwrap(), 1);
        assert_eq!(m.get(&s("a")).unwrap().to_string(), "2");
        assert_eq!(m.get(&s("b")).unwrap().to_string(), "null");

        let err = num(1.0).get(&num(0.0)).unwrap_err();
        assert_eq!(err.to_string(), "cannot index number");
    }

    #[test]
    fn test_slices_clamp_like_javascript() {
        let text = s("hello");
        let test_cases = vec![
            (Value::Null, num(2.0), "he"),
            (num(1.0), Value::Null, "ello"),
            (num(-3.0), Value::Null, "llo"),
            (num(3.0), num(1.0), ""),
            (num(0.0), num(99.0), "hello"),
        ];

        for (start, end, expected) in test_cases {
            assert_eq!(text.slice(&start, &end).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn test_arithmetic() {
        let test_cases = vec![
            (BinaryOp::Add, num(1.0), num(2.0), "3"),
            (BinaryOp::Add, s("a"), num(1.0), "a1"),
            (BinaryOp::FloorDiv, num(7.0), num(2.0), "3"),
            (BinaryOp::FloorDiv, num(-7.0), num(2.0), "-4"),
            (BinaryOp::Rem, num(-7.0), num(2.0), "-1"),
            (BinaryOp::Pow, num(2.0), num(10.0), "1024"),
            (BinaryOp::UShr, num(-1.0), num(28.0), "15"),
            (BinaryOp::Shr, num(-16.0), num(2.0), "-4"),
            (BinaryOp::Shl, num(1.0), num(31.0), "-2147483648"),
            (BinaryOp::BitOr, num(5.0), num(2.0), "7"),
            (BinaryOp::Lt, s("a"), s("b"), "true"),
            (BinaryOp::Ge, num(f64::NAN), num(1.0), "false"),
        ];

        for (op, l, r, expected) in test_cases {
            assert_eq!(Value::binary(op, &l, &r).to_string(), expected, "{op:?}");
        }
    }
}
