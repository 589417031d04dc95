//! Functions every program can call without defining them.
//!
//! Each one has a twin of the same name in `writer/preamble.mjs`; the two
//! must agree on results and on error text.

use super::value::{Value, format_number};
use crate::error::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Eprint,
    Len,
    Type,
    Range,
    Str,
    Num,
    Abs,
    Floor,
    Ceil,
    Round,
    Trunc,
    Sqrt,
    Cbrt,
    Exp,
    Log,
    Log2,
    Log10,
    Sin,
    Cos,
    Tan,
    Acos,
    Acosh,
    Asin,
    Asinh,
    Atan,
    Atanh,
    Sinh,
    Cosh,
    Tanh,
    Exp2,
    Expm1,
    Log1p,
    Atan2,
    Hypot,
    Min,
    Max,
    Ord,
    Chr,
    Upper,
    Lower,
    Strbase,
    Numbase,
}

impl Builtin {
    pub const ALL: [Builtin; 43] = [
        Builtin::Print,
        Builtin::Eprint,
        Builtin::Len,
        Builtin::Type,
        Builtin::Range,
        Builtin::Str,
        Builtin::Num,
        Builtin::Abs,
        Builtin::Floor,
        Builtin::Ceil,
        Builtin::Round,
        Builtin::Trunc,
        Builtin::Sqrt,
        Builtin::Cbrt,
        Builtin::Exp,
        Builtin::Log,
        Builtin::Log2,
        Builtin::Log10,
        Builtin::Sin,
        Builtin::Cos,
        Builtin::Tan,
        Builtin::Acos,
        Builtin::Acosh,
        Builtin::Asin,
        Builtin::Asinh,
        Builtin::Atan,
        Builtin::Atanh,
        Builtin::Sinh,
        Builtin::Cosh,
        Builtin::Tanh,
        Builtin::Exp2,
        Builtin::Expm1,
        Builtin::Log1p,
        Builtin::Atan2,
        Builtin::Hypot,
        Builtin::Min,
        Builtin::Max,
        Builtin::Ord,
        Builtin::Chr,
        Builtin::Upper,
        Builtin::Lower,
        Builtin::Strbase,
        Builtin::Numbase,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Eprint => "eprint",
            Builtin::Len => "len",
            Builtin::Type => "type",
            Builtin::Range => "range",
            Builtin::Str => "str",
            Builtin::Num => "num",
            Builtin::Abs => "abs",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Round => "round",
            Builtin::Trunc => "trunc",
            Builtin::Sqrt => "sqrt",
            Builtin::Cbrt => "cbrt",
            Builtin::Exp => "exp",
            Builtin::Log => "log",
            Builtin::Log2 => "log2",
            Builtin::Log10 => "log10",
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Acos => "acos",
            Builtin::Acosh => "acosh",
            Builtin::Asin => "asin",
            Builtin::Asinh => "asinh",
            Builtin::Atan => "atan",
            Builtin::Atanh => "atanh",
            Builtin::Sinh => "sinh",
            Builtin::Cosh => "cosh",
            Builtin::Tanh => "tanh",
            Builtin::Exp2 => "exp2",
            Builtin::Expm1 => "expm1",
            Builtin::Log1p => "log1p",
            Builtin::Atan2 => "atan2",
            Builtin::Hypot => "hypot",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Ord => "ord",
            Builtin::Chr => "chr",
            Builtin::Upper => "upper",
            Builtin::Lower => "lower",
            Builtin::Strbase => "strbase",
            Builtin::Numbase => "numbase",
        }
    }

    /// Single-argument math, applied after numeric conversion.
    fn math(self) -> Option<fn(f64) -> f64> {
        let f: fn(f64) -> f64 = match self {
            Builtin::Abs => f64::abs,
            Builtin::Floor => f64::floor,
            Builtin::Ceil => f64::ceil,
            Builtin::Round => round,
            Builtin::Trunc => f64::trunc,
            Builtin::Sqrt => f64::sqrt,
            Builtin::Cbrt => f64::cbrt,
            Builtin::Exp => f64::exp,
            Builtin::Log => f64::ln,
            Builtin::Log2 => f64::log2,
            Builtin::Log10 => f64::log10,
            Builtin::Sin => f64::sin,
            Builtin::Cos => f64::cos,
            Builtin::Tan => f64::tan,
            Builtin::Acos => f64::acos,
            Builtin::Acosh => f64::acosh,
            Builtin::Asin => f64::asin,
            Builtin::Asinh => f64::asinh,
            Builtin::Atan => f64::atan,
            Builtin::Atanh => f64::atanh,
            Builtin::Sinh => f64::sinh,
            Builtin::Cosh => f64::cosh,
            Builtin::Tanh => f64::tanh,
            Builtin::Exp2 => f64::exp2,
            Builtin::Expm1 => f64::exp_m1,
            Builtin::Log1p => f64::ln_1p,
            _ => return None,
        };
        Some(f)
    }
}

/// Calls every builtin except `print` and `eprint`, which need the
/// interpreter's output streams. Missing arguments are null.
pub fn call(b: Builtin, args: &[Value]) -> Result<Value, RuntimeError> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);
    let number = |i: usize| arg(i).to_number();

    if let Some(f) = b.math() {
        return Ok(Value::Num(f(number(0))));
    }
    let v = match b {
        Builtin::Len => Value::Num(arg(0).len()? as f64),
        Builtin::Type => Value::Str(arg(0).type_name().to_string()),
        Builtin::Range => range(args)?,
        Builtin::Str => Value::Str(arg(0).to_string()),
        Builtin::Num => Value::Num(number(0)),
        Builtin::Atan2 => Value::Num(number(0).atan2(number(1))),
        Builtin::Hypot => Value::Num(number(0).hypot(number(1))),
        Builtin::Min => Value::Num(min_max(number(0), number(1), f64::min)),
        Builtin::Max => Value::Num(min_max(number(0), number(1), f64::max)),
        Builtin::Ord => {
            let code = arg(0).to_string().chars().next().map_or(0, u32::from);
            Value::Num(f64::from(code))
        }
        Builtin::Chr => Value::Str(chr(number(0))?.to_string()),
        Builtin::Upper => Value::Str(arg(0).to_string().to_uppercase()),
        Builtin::Lower => Value::Str(arg(0).to_string().to_lowercase()),
        Builtin::Strbase => Value::Str(strbase(number(0), radix(number(1))?)),
        Builtin::Numbase => {
            let base = radix(number(1))?;
            Value::Num(numbase(&arg(0).to_string(), base)?)
        }
        _ => {
            return Err(RuntimeError::NotCallable(b.name().to_string()));
        }
    };
    Ok(v)
}

/// `Math.round`: halves go toward positive infinity.
fn round(n: f64) -> f64 {
    let down = n.floor();
    if n - down >= 0.5 { down + 1.0 } else { down }
}

/// `Math.min`/`Math.max` of two numbers: NaN wins.
fn min_max(a: f64, b: f64, pick: fn(f64, f64) -> f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        pick(a, b)
    }
}

fn chr(n: f64) -> Result<char, RuntimeError> {
    let code = (n.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&n)).then_some(n as u32);
    code.and_then(char::from_u32)
        .ok_or_else(|| RuntimeError::Type {
            op: "make a character from".to_string(),
            ty: format_number(n),
        })
}

fn radix(base: f64) -> Result<u32, RuntimeError> {
    if base.fract() == 0.0 && (2.0..=36.0).contains(&base) {
        Ok(base as u32)
    } else {
        Err(RuntimeError::Type {
            op: "use base".to_string(),
            ty: format_number(base),
        })
    }
}

/// Integer part of `n` written in `base`, lowercase digits.
fn strbase(n: f64, base: u32) -> String {
    if !n.is_finite() {
        return format_number(n);
    }
    let mut magnitude = n.trunc().abs() as u128;
    let mut digits = Vec::new();
    loop {
        digits.extend(char::from_digit((magnitude % u128::from(base)) as u32, base));
        magnitude /= u128::from(base);
        if magnitude == 0 {
            break;
        }
    }
    if n.trunc() < 0.0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// Optionally signed integer text in `base`.
fn numbase(text: &str, base: u32) -> Result<f64, RuntimeError> {
    let text = text.trim();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, text.strip_prefix('+').unwrap_or(text)),
    };
    let parsed = digits.chars().try_fold(None, |acc: Option<f64>, c| {
        let d = c.to_digit(36).filter(|d| *d < base)?;
        Some(Some(acc.unwrap_or(0.0) * f64::from(base) + f64::from(d)))
    });
    match parsed.flatten() {
        Some(n) => Ok(sign * n),
        None => Err(RuntimeError::Type {
            op: "parse integer in base".to_string(),
            ty: base.to_string(),
        }),
    }
}

/// `range(stop)`, `range(start, stop)` or `range(start, stop, step)`.
fn range(args: &[Value]) -> Result<Value, RuntimeError> {
    let n: Vec<f64> = args.iter().map(Value::to_number).collect();
    let (start, stop, step) = match n.as_slice() {
        [stop] => (0.0, *stop, 1.0),
        [start, stop] => (*start, *stop, 1.0),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(RuntimeError::Type {
                op: "call range with".to_string(),
                ty: format!("{} arguments", args.len()),
            });
        }
    };
    if step == 0.0 {
        return Err(RuntimeError::ZeroStep);
    }

    let mut items = Vec::new();
    let mut i = start;
    while (step > 0.0 && i < stop) || (step < 0.0 && i > stop) {
        items.push(Value::Num(i));
        i += step;
    }
    Ok(Value::list(items))
}
