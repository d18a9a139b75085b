//! Numeric values with Python arithmetic semantics.
//!
//! Integers stay integers until an operation needs a float (true division,
//! math functions, negative powers) or overflows `i64`.

use super::CalcError;
use std::fmt;

/// Largest base or exponent `**` will accept.
pub const MAX_POWER: f64 = 4_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }

    pub fn neg(self) -> Number {
        match self {
            Number::Int(i) => i
                .checked_neg()
                .map(Number::Int)
                .unwrap_or(Number::Float(-(i as f64))),
            Number::Float(f) => Number::Float(-f),
        }
    }

    pub fn add(self, rhs: Number) -> Number {
        int_or_float(self, rhs, i64::checked_add, |a, b| a + b)
    }

    pub fn sub(self, rhs: Number) -> Number {
        int_or_float(self, rhs, i64::checked_sub, |a, b| a - b)
    }

    pub fn mul(self, rhs: Number) -> Number {
        int_or_float(self, rhs, i64::checked_mul, |a, b| a * b)
    }

    /// True division, always a float.
    pub fn div(self, rhs: Number) -> Result<Number, CalcError> {
        if rhs.is_zero() {
            return Err(CalcError::DivisionByZero);
        }
        Ok(Number::Float(self.as_f64() / rhs.as_f64()))
    }

    /// Floor division, rounding toward negative infinity.
    pub fn floor_div(self, rhs: Number) -> Result<Number, CalcError> {
        if rhs.is_zero() {
            return Err(CalcError::DivisionByZero);
        }
        Ok(int_or_float(self, rhs, floor_div_int, |a, b| (a / b).floor()))
    }

    /// Modulo taking the sign of the divisor.
    pub fn rem(self, rhs: Number) -> Result<Number, CalcError> {
        if rhs.is_zero() {
            return Err(CalcError::DivisionByZero);
        }
        Ok(int_or_float(self, rhs, rem_int, rem_float))
    }

    pub fn pow(self, rhs: Number) -> Result<Number, CalcError> {
        if self.as_f64().abs() > MAX_POWER || rhs.as_f64().abs() > MAX_POWER {
            return Err(CalcError::NumberTooHigh {
                base: self.to_string(),
                exponent: rhs.to_string(),
            });
        }

        match (self, rhs) {
            (Number::Int(base), Number::Int(exp)) if exp >= 0 => {
                // MAX_POWER bounds exp well inside u32.
                match base.checked_pow(exp as u32) {
                    Some(v) => Ok(Number::Int(v)),
                    None => float_pow(base as f64, exp as f64),
                }
            }
            (base, exp) => float_pow(base.as_f64(), exp.as_f64()),
        }
    }
}

fn float_pow(base: f64, exp: f64) -> Result<Number, CalcError> {
    if base == 0.0 && exp < 0.0 {
        return Err(CalcError::DivisionByZero);
    }
    if base < 0.0 && exp.fract() != 0.0 {
        return Err(CalcError::Domain);
    }
    let value = base.powf(exp);
    if value.is_infinite() && base.is_finite() && exp.is_finite() {
        return Err(CalcError::Range);
    }
    Ok(Number::Float(value))
}

fn int_or_float(
    lhs: Number,
    rhs: Number,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Number {
    match (lhs, rhs) {
        (Number::Int(a), Number::Int(b)) => match int_op(a, b) {
            Some(v) => Number::Int(v),
            None => Number::Float(float_op(a as f64, b as f64)),
        },
        (a, b) => Number::Float(float_op(a.as_f64(), b.as_f64())),
    }
}

fn floor_div_int(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q.checked_sub(1)
    } else {
        Some(q)
    }
}

fn rem_int(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) {
        Some(r + b)
    } else {
        Some(r)
    }
}

fn rem_float(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        r + b
    } else {
        r
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => f.write_str(&format_float(*x)),
        }
    }
}

/// Render a float the way Python's `repr` does.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "nan".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = x.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        // `{:e}` yields e.g. "1.5e-5"; Python writes "1.5e-05".
        let raw = format!("{:e}", x);
        return match raw.split_once('e') {
            Some((mantissa, exp)) => {
                let (sign, digits) = match exp.strip_prefix('-') {
                    Some(d) => ('-', d),
                    None => ('+', exp),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => raw,
        };
    }

    let plain = format!("{}", x);
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}
