//! The numeric tower
//!
//! Single numbers are kept in the cheapest representation that holds them
//! exactly. Dyadic arithmetic first promotes both operands to a common
//! representation with [`Pair::promote`], then computes in it.

use std::{cmp::Ordering, fmt};

use num::{BigInt, BigRational, FromPrimitive, Signed, ToPrimitive, Zero};

use crate::{complex::Complex, error::Overflow};

/// A number in one of the representations of the tower
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Long(i64),
    Double(f64),
    Complex(Complex),
    BigInt(BigInt),
    Rational(BigRational),
}

impl Number {
    /// Whether the number is exact
    pub fn is_exact(&self) -> bool {
        matches!(self, Number::Long(_) | Number::BigInt(_) | Number::Rational(_))
    }
    /// Whether the number has no fractional or imaginary part
    pub fn is_integral(&self) -> bool {
        match self {
            Number::Long(_) | Number::BigInt(_) => true,
            Number::Double(d) => d.fract() == 0.0,
            Number::Complex(c) => c.im == 0.0 && c.re.fract() == 0.0,
            Number::Rational(r) => r.is_integer(),
        }
    }
    pub fn is_zero(&self) -> bool {
        match self {
            Number::Long(n) => *n == 0,
            Number::Double(d) => *d == 0.0,
            Number::Complex(c) => *c == Complex::default(),
            Number::BigInt(b) => b.is_zero(),
            Number::Rational(r) => r.is_zero(),
        }
    }
    /// Get the nearest double
    ///
    /// The imaginary part of a complex number is ignored.
    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Long(n) => *n as f64,
            Number::Double(d) => *d,
            Number::Complex(c) => c.re,
            Number::BigInt(b) => bigint_to_f64(b),
            Number::Rational(r) => rational_to_f64(r),
        }
    }
    pub fn to_complex(&self) -> Complex {
        match self {
            Number::Complex(c) => *c,
            n => Complex::from(n.to_f64()),
        }
    }
    /// Get the exact integer value, if the number is an exact integer
    pub fn to_bigint(&self) -> Option<BigInt> {
        match self {
            Number::Long(n) => Some(BigInt::from(*n)),
            Number::BigInt(b) => Some(b.clone()),
            Number::Rational(r) if r.is_integer() => Some(r.to_integer()),
            _ => None,
        }
    }
    /// Get the exact rational value, if the number is exact
    pub fn to_rational(&self) -> Option<BigRational> {
        match self {
            Number::Long(n) => Some(BigRational::from_integer(BigInt::from(*n))),
            Number::BigInt(b) => Some(BigRational::from_integer(b.clone())),
            Number::Rational(r) => Some(r.clone()),
            _ => None,
        }
    }
    /// Get the value as a 64-bit integer, if it is integral and in range
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Number::Long(n) => Some(*n),
            Number::Double(d) => double_to_i64(*d),
            Number::Complex(c) if c.im == 0.0 => double_to_i64(c.re),
            Number::Complex(_) => None,
            Number::BigInt(b) => b.to_i64(),
            Number::Rational(r) if r.is_integer() => r.to_integer().to_i64(),
            Number::Rational(_) => None,
        }
    }
    /// Bring the number to its canonical representation
    ///
    /// Big integers that fit 64 bits become longs, rationals with a
    /// denominator of 1 become integers, and complex numbers with no
    /// imaginary part become doubles.
    pub fn normalize(self) -> Self {
        match self {
            Number::BigInt(b) => match b.to_i64() {
                Some(n) => Number::Long(n),
                None => Number::BigInt(b),
            },
            Number::Rational(r) if r.is_integer() => Number::BigInt(r.to_integer()).normalize(),
            Number::Complex(c) if c.im == 0.0 => Number::Double(c.re),
            n => n,
        }
    }
    /// Exact comparison of two real numbers
    ///
    /// Returns `None` when either number has an imaginary part or is NaN.
    pub fn partial_cmp_real(&self, other: &Self) -> Option<Ordering> {
        match Pair::promote(self.clone(), other.clone()) {
            Pair::Long(a, b) => Some(a.cmp(&b)),
            Pair::Double(a, b) => a.partial_cmp(&b),
            Pair::Complex(a, b) if a.im == 0.0 && b.im == 0.0 => a.re.partial_cmp(&b.re),
            Pair::Complex(..) => None,
            Pair::BigInt(a, b) => Some(a.cmp(&b)),
            Pair::Rational(a, b) => Some(a.cmp(&b)),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Long(n) => n.fmt(f),
            Number::Double(d) => d.fmt(f),
            Number::Complex(c) => c.fmt(f),
            Number::BigInt(b) => b.fmt(f),
            Number::Rational(r) => write!(f, "{}r{}", r.numer(), r.denom()),
        }
    }
}

/// Two numbers promoted to a common representation
///
/// Promotion picks the first rule that applies:
/// complex if either is complex, double if either is a double, rational if
/// either is rational, big integer if either is a big integer, otherwise
/// 64-bit integers.
#[derive(Debug, Clone, PartialEq)]
pub enum Pair {
    Long(i64, i64),
    Double(f64, f64),
    Complex(Complex, Complex),
    BigInt(BigInt, BigInt),
    Rational(BigRational, BigRational),
}

impl Pair {
    pub fn promote(a: Number, b: Number) -> Self {
        use Number::*;
        match (a, b) {
            (Long(a), Long(b)) => Pair::Long(a, b),
            (Double(a), Double(b)) => Pair::Double(a, b),
            (a @ Complex(_), b) | (a, b @ Complex(_)) => {
                Pair::Complex(a.to_complex(), b.to_complex())
            }
            (a @ Double(_), b) | (a, b @ Double(_)) => Pair::Double(a.to_f64(), b.to_f64()),
            (a @ Rational(_), b) | (a, b @ Rational(_)) => {
                match (a.to_rational(), b.to_rational()) {
                    (Some(a), Some(b)) => Pair::Rational(a, b),
                    _ => Pair::Double(a.to_f64(), b.to_f64()),
                }
            }
            (a, b) => match (a.to_bigint(), b.to_bigint()) {
                (Some(a), Some(b)) => Pair::BigInt(a, b),
                _ => Pair::Double(a.to_f64(), b.to_f64()),
            },
        }
    }
}

/// Convert a double to a long if it is integral and in range
pub fn double_to_i64(d: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range
    if d.fract() == 0.0 && d >= i64::MIN as f64 && d < i64::MAX as f64 {
        Some(d as i64)
    } else {
        None
    }
}

pub fn bigint_to_f64(b: &BigInt) -> f64 {
    b.to_f64().unwrap_or(if b.is_negative() {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    })
}

pub fn rational_to_f64(r: &BigRational) -> f64 {
    r.to_f64()
        .unwrap_or_else(|| bigint_to_f64(r.numer()) / bigint_to_f64(r.denom()))
}

/// Get the exact integer value of an integral double
pub fn double_to_bigint(d: f64) -> Option<BigInt> {
    if d.fract() == 0.0 {
        BigInt::from_f64(d)
    } else {
        None
    }
}

pub fn checked_add(a: i64, b: i64) -> Result<i64, Overflow> {
    a.checked_add(b)
        .ok_or_else(|| Overflow(BigInt::from(a) + BigInt::from(b)))
}

pub fn checked_sub(a: i64, b: i64) -> Result<i64, Overflow> {
    a.checked_sub(b)
        .ok_or_else(|| Overflow(BigInt::from(a) - BigInt::from(b)))
}

pub fn checked_mul(a: i64, b: i64) -> Result<i64, Overflow> {
    a.checked_mul(b)
        .ok_or_else(|| Overflow(BigInt::from(a) * BigInt::from(b)))
}

pub fn checked_neg(a: i64) -> Result<i64, Overflow> {
    a.checked_neg().ok_or_else(|| Overflow(-BigInt::from(a)))
}

pub fn checked_abs(a: i64) -> Result<i64, Overflow> {
    a.checked_abs().ok_or_else(|| Overflow(BigInt::from(a).abs()))
}

/// Exact integer division, or `None` if the division has a remainder
///
/// The divisor must not be zero.
pub fn checked_exact_div(a: i64, b: i64) -> Option<Result<i64, Overflow>> {
    if a.checked_rem(b).is_some_and(|r| r != 0) {
        return None;
    }
    Some(
        a.checked_div(b)
            .ok_or_else(|| Overflow(BigInt::from(a) / BigInt::from(b))),
    )
}

/// The largest result, in bits, that powers compute exactly
pub const MAX_EXACT_POWER_BITS: u64 = 1 << 20;

/// Check if raising a number of `base_bits` bits to `exp` stays within
/// [`MAX_EXACT_POWER_BITS`]
pub fn exact_power_fits(base_bits: u64, exp: u64) -> bool {
    base_bits
        .checked_mul(exp)
        .is_some_and(|bits| bits <= MAX_EXACT_POWER_BITS)
}

/// Raise a long to a non-negative long power
///
/// Returns `None` if the exact result would be larger than
/// [`MAX_EXACT_POWER_BITS`].
pub fn checked_pow(base: i64, exp: u64) -> Option<Result<i64, Overflow>> {
    match base {
        0 => return Some(Ok(if exp == 0 { 1 } else { 0 })),
        1 => return Some(Ok(1)),
        -1 => return Some(Ok(if exp % 2 == 0 { 1 } else { -1 })),
        _ => {}
    }
    if let Some(n) = u32::try_from(exp).ok().and_then(|e| base.checked_pow(e)) {
        return Some(Ok(n));
    }
    let bits = u64::from(u64::BITS - base.unsigned_abs().leading_zeros());
    if !exact_power_fits(bits, exp) {
        return None;
    }
    Some(Err(Overflow(num::pow(BigInt::from(base), exp as usize))))
}

/// Floor-style modulo of `a` by `m`
///
/// The result takes the sign of `m`. A modulus of 0 leaves `a` unchanged.
pub fn floor_mod(a: i64, m: i64) -> i64 {
    if m == 0 {
        return a;
    }
    match a.checked_rem(m) {
        Some(r) if r != 0 && (r < 0) != (m < 0) => r + m,
        Some(r) => r,
        // i64::MIN % -1
        None => 0,
    }
}

pub fn floor_mod_f64(a: f64, m: f64) -> f64 {
    if m == 0.0 {
        return a;
    }
    let r = a % m;
    if r != 0.0 && (r < 0.0) != (m < 0.0) {
        r + m
    } else {
        r
    }
}

pub fn rational_floor(r: &BigRational) -> BigInt {
    r.floor().to_integer()
}
