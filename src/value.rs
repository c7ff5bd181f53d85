use std::{cmp::Ordering, fmt, sync::Arc};

use ecow::EcoString;
use num::{BigInt, BigRational};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::{
    array::{Array, SpecialisedType},
    complex::Complex,
    numeric::{self, Number},
    storage, AplResult, Dimensions, Env, ErrorKind,
};

static SCALAR_DIMENSIONS: Lazy<Dimensions> = Lazy::new(Dimensions::scalar);

/// An interned-by-name symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(EcoString);

impl Symbol {
    pub fn new(name: impl Into<EcoString>) -> Self {
        Symbol(name.into())
    }
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}", self.0)
    }
}

/// A value
///
/// Everything other than [`Value::Array`] is a single value of rank 0.
#[derive(Clone)]
pub enum Value {
    Long(i64),
    Double(f64),
    Complex(Complex),
    BigInt(Arc<BigInt>),
    Rational(Arc<BigRational>),
    Char(char),
    Symbol(Symbol),
    Array(Array),
}

impl Default for Value {
    fn default() -> Self {
        Value::Long(0)
    }
}

/// A hashable stand-in for a value
///
/// Two values have equal keys exactly when [`Value::compare_equals`] says
/// they are equal. Numbers are keyed by their exact value, so `2`, `2.0`
/// and `4r2` share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Long(i64),
    BigInt(BigInt),
    Rational(BigRational),
    /// Non-finite doubles, by bit pattern
    Double(u64),
    Complex(u64, u64),
    Char(char),
    Symbol(Symbol),
    Array(Dimensions, Vec<ValueKey>),
}

impl Value {
    /// Build a long vector
    pub fn longs(data: impl IntoIterator<Item = i64>) -> Self {
        Value::Array(storage::long_vector(data))
    }
    /// Build a double vector
    pub fn doubles(data: impl IntoIterator<Item = f64>) -> Self {
        Value::Array(storage::double_vector(data))
    }
    /// Build a character vector
    pub fn string(s: &str) -> Self {
        Value::Array(storage::values_with_dimensions(
            Dimensions::vector(s.chars().count()),
            s.chars().map(Value::Char).collect(),
        ))
    }
    /// Build a vector of arbitrary values
    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        let values: Vec<Value> = values.into_iter().collect();
        Value::Array(storage::values_with_dimensions(
            Dimensions::vector(values.len()),
            values,
        ))
    }
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }
    pub fn dimensions(&self) -> &Dimensions {
        match self {
            Value::Array(array) => array.dimensions(),
            _ => &SCALAR_DIMENSIONS,
        }
    }
    pub fn size(&self) -> usize {
        self.dimensions().content_size()
    }
    pub fn rank(&self) -> usize {
        self.dimensions().rank()
    }
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Long(_) | Value::BigInt(_) => "integer",
            Value::Double(_) => "double",
            Value::Complex(_) => "complex",
            Value::Rational(_) => "rational",
            Value::Char(_) => "character",
            Value::Symbol(_) => "symbol",
            Value::Array(_) => "array",
        }
    }
    pub fn specialised_type(&self) -> SpecialisedType {
        match self {
            Value::Long(_) => SpecialisedType::Long,
            Value::Double(_) => SpecialisedType::Double,
            Value::Array(array) => array.specialised_type(),
            _ => SpecialisedType::Generic,
        }
    }
    /// Get the element at a flat index
    ///
    /// A single value is its own only element.
    pub fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        match self {
            Value::Array(array) => array.value_at(index, env),
            _ if index == 0 => Ok(self.clone()),
            _ => Err(env.index_error(index, 1)),
        }
    }
    pub fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        match self {
            Value::Array(array) => array.value_at_long(index, env),
            Value::Long(n) if index == 0 => Ok(*n),
            _ if index == 0 => self.ensure_long(env),
            _ => Err(env.index_error(index, 1)),
        }
    }
    pub fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        match self {
            Value::Array(array) => array.value_at_double(index, env),
            Value::Double(d) if index == 0 => Ok(*d),
            _ if index == 0 => self.ensure_double(env),
            _ => Err(env.index_error(index, 1)),
        }
    }
    /// Read every element in index order
    pub fn to_values(&self, env: &Env) -> AplResult<Vec<Value>> {
        (0..self.size()).map(|i| self.value_at(i, env)).collect()
    }
    /// Read every element as a long, in index order
    pub fn to_longs(&self, env: &Env) -> AplResult<Vec<i64>> {
        (0..self.size()).map(|i| self.value_at_long(i, env)).collect()
    }
    pub fn to_doubles(&self, env: &Env) -> AplResult<Vec<f64>> {
        (0..self.size()).map(|i| self.value_at_double(i, env)).collect()
    }
    /// Get the numeric content of a single value
    pub fn to_number(&self) -> Option<Number> {
        Some(match self {
            Value::Long(n) => Number::Long(*n),
            Value::Double(d) => Number::Double(*d),
            Value::Complex(c) => Number::Complex(*c),
            Value::BigInt(b) => Number::BigInt((**b).clone()),
            Value::Rational(r) => Number::Rational((**r).clone()),
            _ => return None,
        })
    }
    /// Unwrap a rank-0 array that holds a single value
    ///
    /// Rank-0 arrays that hold arrays are enclosures and are kept.
    pub fn unwrap_deferred(&self, env: &Env) -> AplResult<Value> {
        match self {
            Value::Array(array) if array.rank() == 0 => {
                let inner = array.value_at(0, env)?;
                if inner.is_array() {
                    Ok(self.clone())
                } else {
                    Ok(inner)
                }
            }
            _ => Ok(self.clone()),
        }
    }
    /// Require the value to be an integer that fits 64 bits
    pub fn ensure_long(&self, env: &Env) -> AplResult<i64> {
        match self {
            Value::Long(n) => Ok(*n),
            Value::Array(array) if array.rank() == 0 => {
                let inner = array.value_at(0, env)?;
                if inner.is_array() {
                    Err(self.expected("an integer", env))
                } else {
                    inner.ensure_long(env)
                }
            }
            _ => match self.to_number() {
                Some(n) => n.to_i64().ok_or_else(|| {
                    env.error(
                        ErrorKind::Domain,
                        format!("Expected a 64-bit integer, but got {self:?}"),
                    )
                }),
                None => Err(self.expected("an integer", env)),
            },
        }
    }
    /// Require the value to be a real number
    pub fn ensure_double(&self, env: &Env) -> AplResult<f64> {
        match self {
            Value::Double(d) => Ok(*d),
            Value::Complex(c) if c.im != 0.0 => Err(env.error(
                ErrorKind::Domain,
                format!("Expected a real number, but got {self:?}"),
            )),
            Value::Array(array) if array.rank() == 0 => {
                let inner = array.value_at(0, env)?;
                if inner.is_array() {
                    Err(self.expected("a number", env))
                } else {
                    inner.ensure_double(env)
                }
            }
            _ => match self.to_number() {
                Some(n) => Ok(n.to_f64()),
                None => Err(self.expected("a number", env)),
            },
        }
    }
    /// Require the value to be 0 or 1
    pub fn ensure_bool(&self, env: &Env) -> AplResult<bool> {
        match self.ensure_long(env) {
            Ok(0) => Ok(false),
            Ok(1) => Ok(true),
            Ok(_) => Err(env.error(
                ErrorKind::Domain,
                format!("Expected a boolean, but got {self:?}"),
            )),
            Err(e) if e.kind() == ErrorKind::Domain => Err(env.error(
                ErrorKind::Domain,
                format!("Expected a boolean, but got {self:?}"),
            )),
            Err(e) => Err(e),
        }
    }
    /// Require the value to be a non-negative integer
    pub fn ensure_index(&self, env: &Env) -> AplResult<usize> {
        let n = self.ensure_long(env)?;
        usize::try_from(n).map_err(|_| {
            env.error(
                ErrorKind::Domain,
                format!("Expected a non-negative integer, but got {n}"),
            )
        })
    }
    fn expected(&self, what: &str, env: &Env) -> crate::AplError {
        env.error(
            ErrorKind::IncompatibleType,
            format!("Expected {what}, but got {} {self:?}", self.type_name()),
        )
    }
    /// The value used to fill positions beyond an array's bounds
    pub fn default_value(&self, env: &Env) -> AplResult<Value> {
        match self {
            Value::Char(_) => Ok(Value::Char(' ')),
            Value::Symbol(sym) => Err(env.error(
                ErrorKind::Domain,
                format!("Symbol {sym} has no default value"),
            )),
            Value::Array(array) => {
                if array.size() == 0 {
                    Ok(Value::Long(0))
                } else {
                    array.value_at(0, env)?.default_value(env)
                }
            }
            _ => Ok(Value::Long(0)),
        }
    }
    /// Deep structural equality
    pub fn compare_equals(&self, other: &Value, env: &Env) -> AplResult<bool> {
        match (self, other) {
            (Value::Long(a), Value::Long(b)) => Ok(a == b),
            (Value::Double(a), Value::Double(b)) => Ok(a == b || a.is_nan() && b.is_nan()),
            (Value::Char(a), Value::Char(b)) => Ok(a == b),
            (Value::Symbol(a), Value::Symbol(b)) => Ok(a == b),
            (Value::Array(a), Value::Array(b)) => {
                if a.rank() == 0 || b.rank() == 0 {
                    let a = self.unwrap_deferred(env)?;
                    let b = other.unwrap_deferred(env)?;
                    if !a.is_array() || !b.is_array() {
                        return a.compare_equals(&b, env);
                    }
                }
                if a.dimensions() != b.dimensions() {
                    return Ok(false);
                }
                if a.ptr_eq(b) {
                    return Ok(true);
                }
                for i in 0..a.size() {
                    env.check_interrupted()?;
                    if !a.value_at(i, env)?.compare_equals(&b.value_at(i, env)?, env)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Array(a), b) | (b, Value::Array(a)) => {
                if a.rank() != 0 {
                    return Ok(false);
                }
                let inner = a.value_at(0, env)?;
                if inner.is_array() {
                    Ok(false)
                } else {
                    inner.compare_equals(b, env)
                }
            }
            (a, b) => match (a.to_number(), b.to_number()) {
                (Some(a), Some(b)) => Ok(number_key(&a) == number_key(&b)),
                _ => Ok(false),
            },
        }
    }
    /// Make a hashable key consistent with [`Value::compare_equals`]
    pub fn make_key(&self, env: &Env) -> AplResult<ValueKey> {
        Ok(match self {
            Value::Char(c) => ValueKey::Char(*c),
            Value::Symbol(sym) => ValueKey::Symbol(sym.clone()),
            Value::Array(array) => {
                let unwrapped = self.unwrap_deferred(env)?;
                if !unwrapped.is_array() {
                    return unwrapped.make_key(env);
                }
                let mut keys = Vec::with_capacity(array.size());
                for i in 0..array.size() {
                    keys.push(array.value_at(i, env)?.make_key(env)?);
                }
                ValueKey::Array(array.dimensions().clone(), keys)
            }
            Value::Long(n) => ValueKey::Long(*n),
            Value::Double(d) => double_key(*d),
            Value::Complex(c) => number_key(&Number::Complex(*c)),
            Value::BigInt(b) => number_key(&Number::BigInt((**b).clone())),
            Value::Rational(r) => number_key(&Number::Rational((**r).clone())),
        })
    }
    /// A total order over values
    ///
    /// Numbers sort before characters, characters before symbols and
    /// symbols before arrays. Arrays are ordered by rank, then shape, then
    /// elements in index order.
    pub fn compare(&self, other: &Value, env: &Env) -> AplResult<Ordering> {
        let a = self.unwrap_deferred(env)?;
        let b = other.unwrap_deferred(env)?;
        let class = a.order_class().cmp(&b.order_class());
        if class != Ordering::Equal {
            return Ok(class);
        }
        Ok(match (&a, &b) {
            (Value::Char(x), Value::Char(y)) => x.cmp(y),
            (Value::Symbol(x), Value::Symbol(y)) => x.cmp(y),
            (Value::Array(x), Value::Array(y)) => {
                let dims = (x.rank().cmp(&y.rank()))
                    .then_with(|| x.dimensions().dims().cmp(y.dimensions().dims()));
                if dims != Ordering::Equal {
                    return Ok(dims);
                }
                for i in 0..x.size() {
                    let ord = x.value_at(i, env)?.compare(&y.value_at(i, env)?, env)?;
                    if ord != Ordering::Equal {
                        return Ok(ord);
                    }
                }
                Ordering::Equal
            }
            _ => match (a.to_number(), b.to_number()) {
                (Some(x), Some(y)) => x.partial_cmp_real(&y).unwrap_or_else(|| {
                    let (x, y) = (x.to_complex(), y.to_complex());
                    x.re.total_cmp(&y.re).then(x.im.total_cmp(&y.im))
                }),
                _ => Ordering::Equal,
            },
        })
    }
    fn order_class(&self) -> u8 {
        match self {
            Value::Char(_) => 1,
            Value::Symbol(_) => 2,
            Value::Array(_) => 3,
            _ => 0,
        }
    }
    /// Force the value and everything it contains into storage
    pub fn collapse(&self, env: &Env) -> AplResult<Value> {
        match self {
            Value::Array(array) => Ok(Value::Array(array.collapse(env)?)),
            value => Ok(value.clone()),
        }
    }
    /// Force only the top level of the value into storage
    pub fn collapse_shallow(&self, env: &Env) -> AplResult<Value> {
        match self {
            Value::Array(array) => Ok(Value::Array(array.collapse_shallow(env)?)),
            value => Ok(value.clone()),
        }
    }
    /// Compute every element in index order without keeping any
    pub fn collapse_discard(&self, env: &Env) -> AplResult {
        match self {
            Value::Array(array) => array.collapse_discard(env),
            _ => Ok(()),
        }
    }
}

/// The key of a number, by exact value
pub(crate) fn number_key(n: &Number) -> ValueKey {
    match n.clone().normalize() {
        Number::Long(n) => ValueKey::Long(n),
        Number::BigInt(b) => ValueKey::BigInt(b),
        Number::Rational(r) => ValueKey::Rational(r),
        Number::Double(d) => double_key(d),
        Number::Complex(c) => ValueKey::Complex(canonical_bits(c.re), canonical_bits(c.im)),
    }
}

fn double_key(d: f64) -> ValueKey {
    if !d.is_finite() {
        return ValueKey::Double(canonical_bits(d));
    }
    if let Some(big) = numeric::double_to_bigint(d) {
        return number_key(&Number::BigInt(big));
    }
    match BigRational::from_float(d) {
        Some(r) => ValueKey::Rational(r),
        None => ValueKey::Double(canonical_bits(d)),
    }
}

fn canonical_bits(d: f64) -> u64 {
    if d.is_nan() {
        f64::NAN.to_bits()
    } else if d == 0.0 {
        0
    } else {
        d.to_bits()
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        match i64::try_from(n) {
            Ok(n) => Value::Long(n),
            Err(_) => Value::BigInt(Arc::new(BigInt::from(n))),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Long(b as i64)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<Symbol> for Value {
    fn from(sym: Symbol) -> Self {
        Value::Symbol(sym)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n.normalize() {
            Number::Long(n) => Value::Long(n),
            Number::Double(d) => Value::Double(d),
            Number::Complex(c) => Value::Complex(c),
            Number::BigInt(b) => Value::BigInt(Arc::new(b)),
            Number::Rational(r) => Value::Rational(Arc::new(r)),
        }
    }
}

impl From<BigInt> for Value {
    fn from(b: BigInt) -> Self {
        Number::BigInt(b).into()
    }
}

impl From<BigRational> for Value {
    fn from(r: BigRational) -> Self {
        Number::Rational(r).into()
    }
}

impl From<Complex> for Value {
    fn from(c: Complex) -> Self {
        Number::Complex(c).into()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Long(n) => write!(f, "{n}"),
            Value::Double(d) => write!(f, "{d:?}"),
            Value::Complex(c) => write!(f, "{c}"),
            Value::BigInt(b) => write!(f, "{b}"),
            Value::Rational(r) => write!(f, "{}r{}", r.numer(), r.denom()),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::Symbol(sym) => write!(f, "{sym}"),
            Value::Array(array) => write!(f, "{array:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_keys_cross_representations() {
        let env = Env::default();
        let two = Value::Long(2).make_key(&env).unwrap();
        assert_eq!(Value::Double(2.0).make_key(&env).unwrap(), two);
        let r = BigRational::new(BigInt::from(4), BigInt::from(2));
        assert_eq!(
            Value::Rational(Arc::new(r)).make_key(&env).unwrap(),
            two
        );
        assert_eq!(Value::from(Complex::new(2.0, 0.0)).make_key(&env).unwrap(), two);
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        assert_eq!(
            Value::Double(0.5).make_key(&env).unwrap(),
            Value::from(half).make_key(&env).unwrap()
        );
    }

    #[test]
    fn equality_matches_keys() {
        let env = Env::default();
        let values = [
            Value::Long(3),
            Value::Double(3.0),
            Value::Double(3.5),
            Value::Char('3'),
            Value::from(BigInt::from(i64::MAX) + 1),
            Value::Double(9.223372036854775808e18),
            Value::longs([1, 2]),
            Value::doubles([1.0, 2.0]),
        ];
        for a in &values {
            for b in &values {
                let eq = a.compare_equals(b, &env).unwrap();
                let keys = a.make_key(&env).unwrap() == b.make_key(&env).unwrap();
                assert_eq!(eq, keys, "{a:?} vs {b:?}");
            }
        }
        assert!(Value::longs([1, 2])
            .compare_equals(&Value::doubles([1.0, 2.0]), &env)
            .unwrap());
    }

    #[test]
    fn big_integers_normalize() {
        assert!(matches!(Value::from(BigInt::from(5)), Value::Long(5)));
        assert!(matches!(
            Value::from(BigInt::from(i64::MAX) * 2),
            Value::BigInt(_)
        ));
    }

    #[test]
    fn ordering() {
        let env = Env::default();
        let cmp = |a: &Value, b: &Value| a.compare(b, &env).unwrap();
        assert_eq!(cmp(&Value::Long(1), &Value::Double(1.5)), Ordering::Less);
        assert_eq!(cmp(&Value::Long(100), &Value::Char('a')), Ordering::Less);
        assert_eq!(cmp(&Value::Char('b'), &Value::Char('a')), Ordering::Greater);
        assert_eq!(
            cmp(&Value::Symbol(Symbol::new("x")), &Value::longs([1])),
            Ordering::Less
        );
        assert_eq!(
            cmp(&Value::longs([1, 2]), &Value::longs([1, 3])),
            Ordering::Less
        );
        assert_eq!(cmp(&Value::longs([5]), &Value::longs([1, 1])), Ordering::Less);
    }

    #[test]
    fn defaults() {
        let env = Env::default();
        assert!(matches!(Value::Double(2.5).default_value(&env), Ok(Value::Long(0))));
        assert!(matches!(Value::string("ab").default_value(&env), Ok(Value::Char(' '))));
        let err = Value::Symbol(Symbol::new("s")).default_value(&env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[test]
    fn long_conversion() {
        let env = Env::default();
        assert_eq!(Value::Double(4.0).ensure_long(&env).unwrap(), 4);
        assert_eq!(
            Value::Double(4.5).ensure_long(&env).unwrap_err().kind(),
            ErrorKind::Domain
        );
        assert_eq!(
            Value::Char('x').ensure_long(&env).unwrap_err().kind(),
            ErrorKind::IncompatibleType
        );
        assert_eq!(
            Value::Long(-1).ensure_index(&env).unwrap_err().kind(),
            ErrorKind::Domain
        );
        assert!(Value::Long(2).ensure_bool(&env).is_err());
    }
}
