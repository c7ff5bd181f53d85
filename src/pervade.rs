//! Scalar combiners for the elementwise builtins
//!
//! Each module holds the unboxed forms a builtin supports and a `generic`
//! form that takes any pair of single values.

use std::{cmp::Ordering, fmt::Debug};

use num::{Integer, Signed, Zero};

use crate::{
    complex::Complex,
    error::Overflow,
    numeric::{self, Number, Pair},
    AplError, AplResult, Env, ErrorKind, Value,
};

fn incompatible<T: Debug>(verb: &str, a: T, b: T, env: &Env) -> AplError {
    env.error(
        ErrorKind::IncompatibleType,
        format!("Cannot {verb} {a:?} and {b:?}"),
    )
}

fn numbers(a: &Value, b: &Value, verb: &str, env: &Env) -> AplResult<Pair> {
    match (a.to_number(), b.to_number()) {
        (Some(x), Some(y)) => Ok(Pair::promote(x, y)),
        _ => Err(incompatible(verb, a, b, env)),
    }
}

fn number(a: &Value, verb: &str, env: &Env) -> AplResult<Number> {
    a.to_number().ok_or_else(|| {
        env.error(
            ErrorKind::IncompatibleType,
            format!("Cannot {verb} {a:?}"),
        )
    })
}

fn overflowing(result: Result<i64, Overflow>) -> Value {
    match result {
        Ok(n) => Value::Long(n),
        Err(Overflow(big)) => {
            log::debug!("promoting overflowed result {big} to a big integer");
            Value::from(big)
        }
    }
}

fn offset_char(c: char, offset: &Value, env: &Env) -> AplResult<Value> {
    let offset = offset.ensure_long(env)?;
    (c as i64)
        .checked_add(offset)
        .and_then(|n| u32::try_from(n).ok())
        .and_then(char::from_u32)
        .map(Value::Char)
        .ok_or_else(|| {
            env.error(
                ErrorKind::Domain,
                format!("Offsetting {c:?} by {offset} is not a character"),
            )
        })
}

fn domain(message: String, env: &Env) -> AplError {
    env.error(ErrorKind::Domain, message)
}

pub mod add {
    use super::*;
    pub fn long_long(a: i64, b: i64) -> Result<i64, Overflow> {
        numeric::checked_add(a, b)
    }
    pub fn double_double(a: f64, b: f64) -> f64 {
        a + b
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        match (a, b) {
            (Value::Char(_), Value::Char(_)) => Err(incompatible("add", a, b, env)),
            (Value::Char(c), n) | (n, Value::Char(c)) => offset_char(*c, n, env),
            _ => Ok(match numbers(a, b, "add", env)? {
                Pair::Long(a, b) => overflowing(long_long(a, b)),
                Pair::Double(a, b) => Value::Double(a + b),
                Pair::Complex(a, b) => Value::from(a + b),
                Pair::BigInt(a, b) => Value::from(a + b),
                Pair::Rational(a, b) => Value::from(a + b),
            }),
        }
    }
}

pub mod sub {
    use super::*;
    pub fn long_long(a: i64, b: i64) -> Result<i64, Overflow> {
        numeric::checked_sub(a, b)
    }
    pub fn double_double(a: f64, b: f64) -> f64 {
        a - b
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        match (a, b) {
            (Value::Char(_), _) | (_, Value::Char(_)) => match (a, b.to_number()) {
                (Value::Char(c), Some(_)) => {
                    let negated = neg::generic(b, env)?;
                    offset_char(*c, &negated, env)
                }
                _ => Err(incompatible("subtract", a, b, env)),
            },
            _ => Ok(match numbers(a, b, "subtract", env)? {
                Pair::Long(a, b) => overflowing(long_long(a, b)),
                Pair::Double(a, b) => Value::Double(a - b),
                Pair::Complex(a, b) => Value::from(a - b),
                Pair::BigInt(a, b) => Value::from(a - b),
                Pair::Rational(a, b) => Value::from(a - b),
            }),
        }
    }
}

pub mod mul {
    use super::*;
    pub fn long_long(a: i64, b: i64) -> Result<i64, Overflow> {
        numeric::checked_mul(a, b)
    }
    pub fn double_double(a: f64, b: f64) -> f64 {
        a * b
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(match numbers(a, b, "multiply", env)? {
            Pair::Long(a, b) => overflowing(long_long(a, b)),
            Pair::Double(a, b) => Value::Double(a * b),
            Pair::Complex(a, b) => Value::from(a * b),
            Pair::BigInt(a, b) => Value::from(a * b),
            Pair::Rational(a, b) => Value::from(a * b),
        })
    }
}

pub mod div {
    use super::*;
    fn by_zero<T: Debug>(a: T, env: &Env) -> AplError {
        domain(format!("Cannot divide {a:?} by zero"), env)
    }
    /// Exact quotients of longs stay longs, others become doubles
    pub fn long_long(a: i64, b: i64, env: &Env) -> AplResult<Value> {
        if b == 0 {
            return Err(by_zero(a, env));
        }
        Ok(match numeric::checked_exact_div(a, b) {
            Some(result) => overflowing(result),
            None => Value::Double(a as f64 / b as f64),
        })
    }
    pub fn double_double(a: f64, b: f64, env: &Env) -> AplResult<f64> {
        if b == 0.0 {
            return Err(by_zero(a, env));
        }
        Ok(a / b)
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(match numbers(a, b, "divide", env)? {
            Pair::Long(a, b) => long_long(a, b, env)?,
            Pair::Double(a, b) => Value::Double(double_double(a, b, env)?),
            Pair::Complex(_, b) if b == Complex::default() => return Err(by_zero(a, env)),
            Pair::Complex(a, b) => Value::from(a / b),
            Pair::BigInt(_, b) if b.is_zero() => return Err(by_zero(a, env)),
            Pair::BigInt(a, b) => {
                if (&a % &b).is_zero() {
                    Value::from(a / b)
                } else {
                    Value::Double(numeric::bigint_to_f64(&a) / numeric::bigint_to_f64(&b))
                }
            }
            Pair::Rational(_, b) if b.is_zero() => return Err(by_zero(a, env)),
            Pair::Rational(a, b) => Value::from(a / b),
        })
    }
}

/// `a | b` is `b` modulo `a`, with the sign of `a`
pub mod residue {
    use super::*;
    pub fn long_long(a: i64, b: i64) -> i64 {
        numeric::floor_mod(b, a)
    }
    pub fn double_double(a: f64, b: f64) -> f64 {
        numeric::floor_mod_f64(b, a)
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(match numbers(a, b, "take the residue of", env)? {
            Pair::Long(a, b) => Value::Long(long_long(a, b)),
            Pair::Double(a, b) => Value::Double(double_double(a, b)),
            Pair::Complex(..) => {
                return Err(domain(
                    format!("Cannot take the residue of complex {b:?} by {a:?}"),
                    env,
                ))
            }
            Pair::BigInt(a, b) if a.is_zero() => Value::from(b),
            Pair::BigInt(a, b) => Value::from(b.mod_floor(&a)),
            Pair::Rational(a, b) if a.is_zero() => Value::from(b),
            Pair::Rational(a, b) => {
                let quotient = (&b / &a).floor();
                Value::from(b - a * quotient)
            }
        })
    }
}

/// `a * b` raises `a` to the power `b`
pub mod pow {
    use super::*;
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(match numbers(a, b, "raise", env)? {
            Pair::Long(x, y) if y >= 0 => match numeric::checked_pow(x, y as u64) {
                Some(result) => overflowing(result),
                None => Value::Double((x as f64).powf(y as f64)),
            },
            Pair::Long(0, _) => {
                return Err(domain(format!("Cannot raise 0 to the power {b:?}"), env))
            }
            Pair::Long(x, y) => Value::Double((x as f64).powf(y as f64)),
            Pair::Double(x, y) if x < 0.0 && y.fract() != 0.0 => {
                Value::from(Complex::from(x).powc(y))
            }
            Pair::Double(x, y) => Value::Double(x.powf(y)),
            Pair::Complex(x, y) => Value::from(x.powc(y)),
            Pair::BigInt(x, y) => match u64::try_from(&y) {
                Ok(e) if numeric::exact_power_fits(x.bits(), e) => {
                    Value::from(num::pow(x, e as usize))
                }
                _ => Value::Double(
                    numeric::bigint_to_f64(&x).powf(numeric::bigint_to_f64(&y)),
                ),
            },
            Pair::Rational(x, y) => {
                let small = (y.is_integer())
                    .then(|| i32::try_from(y.to_integer()).ok())
                    .flatten();
                match small {
                    Some(_) if x.is_zero() && y.is_negative() => {
                        return Err(domain(
                            format!("Cannot raise 0 to the power {b:?}"),
                            env,
                        ))
                    }
                    Some(e) if numeric::exact_power_fits(
                        x.numer().bits().max(x.denom().bits()),
                        u64::from(e.unsigned_abs()),
                    ) =>
                    {
                        Value::from(x.pow(e))
                    }
                    _ => Value::Double(
                        numeric::rational_to_f64(&x).powf(numeric::rational_to_f64(&y)),
                    ),
                }
            }
        })
    }
}

fn ordering(a: &Value, b: &Value, verb: &str, env: &Env) -> AplResult<Ordering> {
    match (a, b) {
        (Value::Char(x), Value::Char(y)) => Ok(x.cmp(y)),
        _ => match (a.to_number(), b.to_number()) {
            (Some(x), Some(y)) => x.partial_cmp_real(&y).ok_or_else(|| {
                domain(format!("Cannot {verb} {a:?} and {b:?}"), env)
            }),
            _ => Err(incompatible(verb, a, b, env)),
        },
    }
}

fn unordered(verb: &str, a: f64, b: f64, env: &Env) -> AplError {
    domain(
        format!("Cannot {verb} {:?} and {:?}", Value::Double(a), Value::Double(b)),
        env,
    )
}

pub mod max {
    use super::*;
    pub fn long_long(a: i64, b: i64) -> i64 {
        a.max(b)
    }
    pub fn double_double(a: f64, b: f64, env: &Env) -> AplResult<f64> {
        if a.is_nan() || b.is_nan() {
            return Err(unordered("get the max of", a, b, env));
        }
        Ok(a.max(b))
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(match ordering(a, b, "get the max of", env)? {
            Ordering::Less => b.clone(),
            _ => a.clone(),
        })
    }
}

pub mod min {
    use super::*;
    pub fn long_long(a: i64, b: i64) -> i64 {
        a.min(b)
    }
    pub fn double_double(a: f64, b: f64, env: &Env) -> AplResult<f64> {
        if a.is_nan() || b.is_nan() {
            return Err(unordered("get the min of", a, b, env));
        }
        Ok(a.min(b))
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(match ordering(a, b, "get the min of", env)? {
            Ordering::Greater => b.clone(),
            _ => a.clone(),
        })
    }
}

pub mod is_eq {
    use super::*;
    pub fn long_long(a: i64, b: i64) -> i64 {
        (a == b) as i64
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(Value::from(a.compare_equals(b, env)?))
    }
}

pub mod is_ne {
    use super::*;
    pub fn long_long(a: i64, b: i64) -> i64 {
        (a != b) as i64
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(Value::from(!a.compare_equals(b, env)?))
    }
}

macro_rules! cmp_impl {
    ($name:ident $eq:tt $ordering:expr) => {
        pub mod $name {
            use super::*;
            pub fn long_long(a: i64, b: i64) -> i64 {
                (a.cmp(&b) $eq $ordering) as i64
            }
            pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
                let ordering = ordering(a, b, "compare", env)?;
                Ok(Value::from(ordering $eq $ordering))
            }
        }
    };
}

cmp_impl!(is_lt == Ordering::Less);
cmp_impl!(is_le != Ordering::Greater);
cmp_impl!(is_gt == Ordering::Greater);
cmp_impl!(is_ge != Ordering::Less);

fn boolean(n: i64, env: &Env) -> AplResult<bool> {
    match n {
        0 => Ok(false),
        1 => Ok(true),
        n => Err(domain(format!("Expected a boolean, but got {n}"), env)),
    }
}

pub mod and {
    use super::*;
    pub fn long_long(a: i64, b: i64, env: &Env) -> AplResult<i64> {
        Ok((boolean(a, env)? && boolean(b, env)?) as i64)
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        Ok(Value::from(a.ensure_bool(env)? && b.ensure_bool(env)?))
    }
}

pub mod or {
    use super::*;
    pub fn long_long(a: i64, b: i64, env: &Env) -> AplResult<i64> {
        Ok((boolean(a, env)? || boolean(b, env)?) as i64)
    }
    pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
        // Both operands are checked even when the first decides the result
        let a = a.ensure_bool(env)?;
        let b = b.ensure_bool(env)?;
        Ok(Value::from(a || b))
    }
}

macro_rules! bitwise_impl {
    ($name:ident, $op:tt, $verb:literal) => {
        pub mod $name {
            use super::*;
            pub fn long_long(a: i64, b: i64) -> i64 {
                a $op b
            }
            pub fn generic(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
                match numbers(a, b, $verb, env)? {
                    Pair::Long(a, b) => Ok(Value::Long(a $op b)),
                    Pair::BigInt(a, b) => Ok(Value::from(a $op b)),
                    _ => Err(domain(format!("Cannot {} {a:?} and {b:?}", $verb), env)),
                }
            }
        }
    };
}

bitwise_impl!(bit_and, &, "bitwise and");
bitwise_impl!(bit_or, |, "bitwise or");
bitwise_impl!(bit_xor, ^, "bitwise xor");

pub mod neg {
    use super::*;
    pub fn long(a: i64) -> Result<i64, Overflow> {
        numeric::checked_neg(a)
    }
    pub fn double(a: f64) -> f64 {
        -a
    }
    pub fn generic(a: &Value, env: &Env) -> AplResult<Value> {
        Ok(match number(a, "negate", env)? {
            Number::Long(n) => overflowing(long(n)),
            Number::Double(d) => Value::Double(-d),
            Number::Complex(c) => Value::from(-c),
            Number::BigInt(b) => Value::from(-b),
            Number::Rational(r) => Value::from(-r),
        })
    }
}

pub mod abs {
    use super::*;
    pub fn long(a: i64) -> Result<i64, Overflow> {
        numeric::checked_abs(a)
    }
    pub fn double(a: f64) -> f64 {
        a.abs()
    }
    pub fn generic(a: &Value, env: &Env) -> AplResult<Value> {
        Ok(match number(a, "take the magnitude of", env)? {
            Number::Long(n) => overflowing(long(n)),
            Number::Double(d) => Value::Double(d.abs()),
            Number::Complex(c) => Value::Double(c.abs()),
            Number::BigInt(b) => Value::from(b.abs()),
            Number::Rational(r) => Value::from(r.abs()),
        })
    }
}

pub mod not {
    use super::*;
    pub fn long(a: i64, env: &Env) -> AplResult<i64> {
        Ok(!boolean(a, env)? as i64)
    }
    pub fn generic(a: &Value, env: &Env) -> AplResult<Value> {
        Ok(Value::from(!a.ensure_bool(env)?))
    }
}

fn integral_double(d: f64) -> Value {
    match numeric::double_to_bigint(d) {
        Some(big) => Value::from(big),
        None => Value::Double(d),
    }
}

pub mod floor {
    use super::*;
    pub fn long(a: i64) -> i64 {
        a
    }
    pub fn generic(a: &Value, env: &Env) -> AplResult<Value> {
        Ok(match number(a, "get the floor of", env)? {
            Number::Long(n) => Value::Long(n),
            Number::Double(d) => integral_double(d.floor()),
            Number::Complex(c) => Value::from(c.floor()),
            Number::BigInt(b) => Value::from(b),
            Number::Rational(r) => Value::from(r.floor().to_integer()),
        })
    }
}

pub mod ceil {
    use super::*;
    pub fn long(a: i64) -> i64 {
        a
    }
    pub fn generic(a: &Value, env: &Env) -> AplResult<Value> {
        Ok(match number(a, "get the ceiling of", env)? {
            Number::Long(n) => Value::Long(n),
            Number::Double(d) => integral_double(d.ceil()),
            Number::Complex(c) => Value::from(c.ceil()),
            Number::BigInt(b) => Value::from(b),
            Number::Rational(r) => Value::from(r.ceil().to_integer()),
        })
    }
}

pub mod signum {
    use super::*;
    pub fn long(a: i64) -> i64 {
        a.signum()
    }
    pub fn generic(a: &Value, env: &Env) -> AplResult<Value> {
        Ok(match number(a, "take the sign of", env)? {
            Number::Long(n) => Value::Long(n.signum()),
            Number::Double(d) if d.is_nan() => {
                return Err(domain("Cannot take the sign of NaN".into(), env))
            }
            Number::Double(d) => Value::Long(if d > 0.0 {
                1
            } else if d < 0.0 {
                -1
            } else {
                0
            }),
            Number::Complex(c) => Value::from(c.signum()),
            Number::BigInt(b) => Value::from(b.signum()),
            Number::Rational(r) => Value::from(r.signum()),
        })
    }
}

pub mod bit_not {
    use super::*;
    pub fn long(a: i64) -> i64 {
        !a
    }
    pub fn generic(a: &Value, env: &Env) -> AplResult<Value> {
        match number(a, "bitwise not", env)? {
            Number::Long(n) => Ok(Value::Long(!n)),
            Number::BigInt(b) => Ok(Value::from(!b)),
            _ => Err(domain(format!("Cannot bitwise not {a:?}"), env)),
        }
    }
}

#[cfg(test)]
mod tests {
    use num::BigInt;

    use super::*;

    fn past_long_max() -> BigInt {
        BigInt::from(i64::MAX) + 1
    }

    fn env() -> Env {
        Env::default()
    }

    #[test]
    fn long_addition_promotes() {
        let sum = add::generic(&Value::Long(i64::MAX), &Value::Long(1), &env()).unwrap();
        match sum {
            Value::BigInt(big) => assert_eq!(*big, past_long_max()),
            other => panic!("expected a big integer, got {other:?}"),
        }
    }

    #[test]
    fn character_arithmetic() {
        let env = env();
        let c = add::generic(&Value::Char('a'), &Value::Long(2), &env).unwrap();
        assert!(matches!(c, Value::Char('c')));
        let c = add::generic(&Value::Long(1), &Value::Char('a'), &env).unwrap();
        assert!(matches!(c, Value::Char('b')));
        let c = sub::generic(&Value::Char('c'), &Value::Long(2), &env).unwrap();
        assert!(matches!(c, Value::Char('a')));
        let err = add::generic(&Value::Char('a'), &Value::Char('b'), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleType);
        let err = sub::generic(&Value::Long(1), &Value::Char('b'), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleType);
        let eq = is_eq::generic(&Value::Char('a'), &Value::Char('a'), &env).unwrap();
        assert!(matches!(eq, Value::Long(1)));
        let lt = is_lt::generic(&Value::Char('a'), &Value::Char('b'), &env).unwrap();
        assert!(matches!(lt, Value::Long(1)));
        let err = is_lt::generic(&Value::Char('a'), &Value::Long(1), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompatibleType);
    }

    #[test]
    fn division() {
        let env = env();
        assert!(matches!(div::long_long(6, 3, &env), Ok(Value::Long(2))));
        assert!(matches!(div::long_long(7, 2, &env), Ok(Value::Double(d)) if d == 3.5));
        assert_eq!(
            div::long_long(1, 0, &env).unwrap_err().kind(),
            ErrorKind::Domain
        );
        assert!(matches!(
            div::long_long(i64::MIN, -1, &env),
            Ok(Value::BigInt(_))
        ));
    }

    #[test]
    fn residue_takes_sign_of_modulus() {
        assert_eq!(residue::long_long(3, -7), 2);
        assert_eq!(residue::long_long(-3, 7), -2);
        assert_eq!(residue::long_long(0, 7), 7);
        let r = residue::generic(&Value::Long(3), &Value::from(past_long_max()), &env()).unwrap();
        // 2^63 = 3 * 3074457345618258602 + 2
        assert!(matches!(r, Value::Long(2)));
    }

    #[test]
    fn powers() {
        let env = env();
        let p = pow::generic(&Value::Long(2), &Value::Long(63), &env).unwrap();
        assert!(matches!(p, Value::BigInt(big) if *big == past_long_max()));
        let p = pow::generic(&Value::Long(2), &Value::Long(-1), &env).unwrap();
        assert!(matches!(p, Value::Double(d) if d == 0.5));
        let p = pow::generic(&Value::Double(-4.0), &Value::Double(0.5), &env).unwrap();
        match p {
            Value::Complex(c) => {
                assert!(c.re.abs() < 1e-9);
                assert!((c.im - 2.0).abs() < 1e-9);
            }
            other => panic!("expected a complex number, got {other:?}"),
        }
    }

    #[test]
    fn huge_powers_leave_exact_arithmetic() {
        let env = env();
        let p = pow::generic(&Value::Long(2), &Value::Long(5_000_000_000), &env).unwrap();
        assert!(matches!(p, Value::Double(d) if d == f64::INFINITY));
        let p = pow::generic(&Value::Long(2), &Value::Long(1000), &env).unwrap();
        assert!(matches!(p, Value::BigInt(big) if big.bits() == 1001));
        let p = pow::generic(&Value::from(past_long_max()), &Value::Long(1 << 40), &env).unwrap();
        assert!(matches!(p, Value::Double(d) if d == f64::INFINITY));
        let p = pow::generic(&Value::from(past_long_max()), &Value::Long(2), &env).unwrap();
        assert!(matches!(p, Value::BigInt(big) if *big == past_long_max() * past_long_max()));
        let half = Value::Rational(std::sync::Arc::new(num::BigRational::new(1.into(), 2.into())));
        let p = pow::generic(&half, &Value::Long(i32::MAX as i64), &env).unwrap();
        assert!(matches!(p, Value::Double(d) if d == 0.0));
    }

    #[test]
    fn booleans() {
        let env = env();
        assert_eq!(and::long_long(1, 1, &env).unwrap(), 1);
        assert_eq!(or::long_long(0, 0, &env).unwrap(), 0);
        assert_eq!(and::long_long(2, 1, &env).unwrap_err().kind(), ErrorKind::Domain);
        assert_eq!(not::long(0, &env).unwrap(), 1);
    }

    #[test]
    fn floors() {
        let env = env();
        assert!(matches!(floor::generic(&Value::Double(-2.5), &env), Ok(Value::Long(-3))));
        assert!(matches!(ceil::generic(&Value::Double(2.1), &env), Ok(Value::Long(3))));
        assert!(matches!(
            floor::generic(&Value::Double(1e30), &env),
            Ok(Value::BigInt(_))
        ));
        assert!(matches!(signum::generic(&Value::Double(-0.1), &env), Ok(Value::Long(-1))));
    }

    #[test]
    fn min_max_keep_representation() {
        let env = env();
        assert!(matches!(
            max::generic(&Value::Long(2), &Value::Double(1.5), &env),
            Ok(Value::Long(2))
        ));
        assert!(matches!(
            min::generic(&Value::Char('b'), &Value::Char('a'), &env),
            Ok(Value::Char('a'))
        ));
        let err = min::generic(&Value::from(Complex::I), &Value::Long(1), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
    }
}
