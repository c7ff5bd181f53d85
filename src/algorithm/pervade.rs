//! Elementwise application of the builtins

use crate::{
    algorithm::long_operand,
    array::{Array, ArrayView, SpecialisedType},
    function::{long_result, Function, OptimisationFlags},
    AplResult, Dimensions, Env, Primitive, Value,
};

/// Apply a monadic builtin to every element of a value
pub fn monadic(prim: Primitive, a: &Value, env: &Env) -> AplResult<Value> {
    if !a.is_array() {
        return prim.scalar1(a, env);
    }
    let flags = prim.flags();
    let path = match a.specialised_type() {
        SpecialisedType::Long if flags.contains(OptimisationFlags::MONADIC_LONG) => {
            SpecialisedType::Long
        }
        SpecialisedType::Double if flags.contains(OptimisationFlags::MONADIC_DOUBLE) => {
            SpecialisedType::Double
        }
        _ => SpecialisedType::Generic,
    };
    log::debug!("{} over {a:?} uses the {path:?} path", prim.name());
    Ok(Value::Array(Array::new(MonadicPervade {
        prim,
        dims: a.dimensions().clone(),
        source: a.clone(),
        path,
    })))
}

/// Apply a dyadic builtin to corresponding elements of two values
///
/// A rank-0 operand is paired with every element of the other. Otherwise
/// both operands must have the same shape.
pub fn dyadic(prim: Primitive, a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
    if !a.is_array() && !b.is_array() {
        return prim.scalar2(a, b, env);
    }
    let dims = if a.rank() == 0 {
        b.dimensions().clone()
    } else if b.rank() == 0 || a.dimensions() == b.dimensions() {
        a.dimensions().clone()
    } else {
        return Err(env.mismatch(a.dimensions(), b.dimensions()));
    };
    let flags = prim.flags();
    let path = match (a.specialised_type(), b.specialised_type()) {
        (SpecialisedType::Long, SpecialisedType::Long)
            if flags.contains(OptimisationFlags::DYADIC_LONG_LONG) =>
        {
            SpecialisedType::Long
        }
        (SpecialisedType::Double, SpecialisedType::Double)
            if flags.contains(OptimisationFlags::DYADIC_DOUBLE_DOUBLE) =>
        {
            SpecialisedType::Double
        }
        _ => SpecialisedType::Generic,
    };
    log::debug!("{} over {a:?} and {b:?} uses the {path:?} path", prim.name());
    Ok(Value::Array(Array::new(DyadicPervade {
        prim,
        a: a.clone(),
        b: b.clone(),
        dims,
        path,
    })))
}

struct MonadicPervade {
    prim: Primitive,
    source: Value,
    dims: Dimensions,
    path: SpecialisedType,
}

impl MonadicPervade {
    fn generic(&self, index: usize, env: &Env) -> AplResult<Value> {
        let a = self.source.value_at(index, env)?;
        monadic(self.prim, &a, env)
    }
}

impl ArrayView for MonadicPervade {
    fn name(&self) -> &'static str {
        "monadic pervade"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        match self.path {
            SpecialisedType::Long => {
                let Some(a) = long_operand(&self.source, index, env)? else {
                    return self.generic(index, env);
                };
                match self.prim.eval1_long(a, env) {
                    Ok(n) => Ok(Value::Long(n)),
                    Err(e) if e.is_overflow() => {
                        log::debug!("{} overflowed at {index}", self.prim.name());
                        Ok(Value::from(e.into_overflow()?))
                    }
                    Err(e) => Err(e),
                }
            }
            SpecialisedType::Double => {
                let a = self.source.value_at_double(index, env)?;
                Ok(Value::Double(self.prim.eval1_double(a, env)?))
            }
            SpecialisedType::Generic => self.generic(index, env),
        }
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.path
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        match self.path {
            SpecialisedType::Long => match long_operand(&self.source, index, env)? {
                Some(a) => self.prim.eval1_long(a, env),
                None => long_result(self.generic(index, env)?, env),
            },
            _ => self.value_at(index, env)?.ensure_long(env),
        }
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        match self.path {
            SpecialisedType::Double => {
                let a = self.source.value_at_double(index, env)?;
                self.prim.eval1_double(a, env)
            }
            _ => self.value_at(index, env)?.ensure_double(env),
        }
    }
}

struct DyadicPervade {
    prim: Primitive,
    a: Value,
    b: Value,
    dims: Dimensions,
    path: SpecialisedType,
}

impl DyadicPervade {
    fn indices(&self, index: usize) -> (usize, usize) {
        let a = if self.a.rank() == 0 { 0 } else { index };
        let b = if self.b.rank() == 0 { 0 } else { index };
        (a, b)
    }
    /// Both operands through the long accessor, or `None` if either does not
    /// fit in 64 bits
    fn operand_longs(&self, index: usize, env: &Env) -> AplResult<Option<(i64, i64)>> {
        let (i, j) = self.indices(index);
        let a = long_operand(&self.a, i, env)?;
        let b = long_operand(&self.b, j, env)?;
        Ok(a.zip(b))
    }
    fn doubles(&self, index: usize, env: &Env) -> AplResult<f64> {
        let (i, j) = self.indices(index);
        let a = self.a.value_at_double(i, env)?;
        let b = self.b.value_at_double(j, env)?;
        self.prim.eval2_double(a, b, env)
    }
    fn generic(&self, index: usize, env: &Env) -> AplResult<Value> {
        let (i, j) = self.indices(index);
        let a = self.a.value_at(i, env)?;
        let b = self.b.value_at(j, env)?;
        dyadic(self.prim, &a, &b, env)
    }
}

impl ArrayView for DyadicPervade {
    fn name(&self) -> &'static str {
        "dyadic pervade"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        match self.path {
            SpecialisedType::Long => {
                let Some((a, b)) = self.operand_longs(index, env)? else {
                    return self.generic(index, env);
                };
                match self.prim.eval2_long(a, b, env) {
                    Ok(n) => Ok(Value::Long(n)),
                    Err(e) if e.is_overflow() => {
                        log::debug!(
                            "{} overflowed at {index}, promoting to a big integer",
                            self.prim.name()
                        );
                        match e.into_overflow() {
                            Ok(big) => Ok(Value::from(big)),
                            Err(_) => self.generic(index, env),
                        }
                    }
                    Err(e) => Err(e),
                }
            }
            SpecialisedType::Double => Ok(Value::Double(self.doubles(index, env)?)),
            SpecialisedType::Generic => self.generic(index, env),
        }
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.path
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        match self.path {
            SpecialisedType::Long => match self.operand_longs(index, env)? {
                Some((a, b)) => self.prim.eval2_long(a, b, env),
                None => long_result(self.generic(index, env)?, env),
            },
            _ => self.value_at(index, env)?.ensure_long(env),
        }
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        match self.path {
            SpecialisedType::Double => self.doubles(index, env),
            _ => self.value_at(index, env)?.ensure_double(env),
        }
    }
}

#[cfg(test)]
mod tests {
    use num::BigInt;

    use super::*;
    use crate::{algorithm::nest, ErrorKind};

    #[test]
    fn scalar_pairs_skip_views() {
        let env = Env::default();
        let sum = dyadic(Primitive::Add, &Value::Long(2), &Value::Double(0.5), &env).unwrap();
        assert!(matches!(sum, Value::Double(d) if d == 2.5));
    }

    #[test]
    fn scalars_broadcast() {
        let env = Env::default();
        let a = Value::longs([1, 2, 3]);
        let diff = dyadic(Primitive::Sub, &Value::Long(10), &a, &env).unwrap();
        assert_eq!(diff.dimensions(), &[3]);
        assert_eq!(diff.to_longs(&env).unwrap(), [9, 8, 7]);
        assert_eq!(diff.specialised_type(), SpecialisedType::Long);
    }

    #[test]
    fn shapes_must_match() {
        let env = Env::default();
        let err = dyadic(
            Primitive::Add,
            &Value::longs([1, 2, 3]),
            &Value::longs([1, 2]),
            &env,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn overflow_promotes_one_position() {
        let env = Env::default();
        let a = Value::longs([i64::MAX, 5]);
        let sum = dyadic(Primitive::Add, &a, &Value::Long(1), &env).unwrap();
        match sum.value_at(0, &env).unwrap() {
            Value::BigInt(big) => assert_eq!(*big, BigInt::from(i64::MAX) + 1),
            other => panic!("expected a big integer, got {other:?}"),
        }
        assert!(matches!(sum.value_at(1, &env), Ok(Value::Long(6))));
        let err = sum.value_at_long(0, &env).unwrap_err();
        assert!(err.is_overflow());
    }

    #[test]
    fn chained_overflow_uses_exact_operands() {
        let env = Env::default();
        let past_max = dyadic(Primitive::Add, &Value::longs([i64::MAX, 1]), &Value::Long(1), &env)
            .unwrap();
        let chained = dyadic(Primitive::Add, &past_max, &Value::Long(5), &env).unwrap();
        let expected = BigInt::from(i64::MAX) + 6;
        match chained.value_at(0, &env).unwrap() {
            Value::BigInt(big) => assert_eq!(*big, expected),
            other => panic!("expected a big integer, got {other:?}"),
        }
        assert!(matches!(chained.value_at(1, &env), Ok(Value::Long(7))));
        match chained.value_at_long(0, &env).unwrap_err().into_overflow() {
            Ok(big) => assert_eq!(big, expected),
            Err(e) => panic!("expected an overflow, got {e}"),
        }
        let collapsed = chained.collapse(&env).unwrap();
        match collapsed.value_at(0, &env).unwrap() {
            Value::BigInt(big) => assert_eq!(*big, expected),
            other => panic!("expected a big integer, got {other:?}"),
        }
        let back = dyadic(Primitive::Sub, &past_max, &Value::Long(10), &env).unwrap();
        assert!(matches!(back.value_at(0, &env), Ok(Value::Long(n)) if n == i64::MAX - 9));
    }

    #[test]
    fn monadic_over_overflowed_operand() {
        let env = Env::default();
        let past_max = dyadic(Primitive::Add, &Value::longs([i64::MAX]), &Value::Long(1), &env)
            .unwrap();
        let negated = monadic(Primitive::Neg, &past_max, &env).unwrap();
        // -2^63 fits again
        assert!(matches!(negated.value_at(0, &env), Ok(Value::Long(i64::MIN))));
        assert_eq!(negated.value_at_long(0, &env).unwrap(), i64::MIN);
        let magnitude = monadic(Primitive::Abs, &past_max, &env).unwrap();
        match magnitude.value_at(0, &env).unwrap() {
            Value::BigInt(big) => assert_eq!(*big, BigInt::from(i64::MAX) + 1),
            other => panic!("expected a big integer, got {other:?}"),
        }
    }

    #[test]
    fn mixed_types_use_generic_path() {
        let env = Env::default();
        let a = Value::longs([1, 2]);
        let b = Value::doubles([0.5, 0.25]);
        let product = dyadic(Primitive::Mul, &a, &b, &env).unwrap();
        assert_eq!(product.specialised_type(), SpecialisedType::Generic);
        assert_eq!(product.to_doubles(&env).unwrap(), [0.5, 0.5]);
        let halves = dyadic(Primitive::Div, &a, &Value::Long(2), &env).unwrap();
        assert!(matches!(halves.value_at(0, &env), Ok(Value::Double(d)) if d == 0.5));
        assert!(matches!(halves.value_at(1, &env), Ok(Value::Long(1))));
    }

    #[test]
    fn nested_arrays_pervade() {
        let env = Env::default();
        let nested = Value::list([Value::longs([1, 2]), Value::Long(3)]);
        let result = dyadic(Primitive::Mul, &nested, &Value::Long(10), &env).unwrap();
        let first = result.value_at(0, &env).unwrap();
        assert_eq!(first.to_longs(&env).unwrap(), [10, 20]);
        assert!(matches!(result.value_at(1, &env), Ok(Value::Long(30))));
        let enclosed = nest::enclose(&Value::longs([1, 2]));
        let sums = dyadic(Primitive::Add, &enclosed, &Value::longs([10, 20, 30]), &env).unwrap();
        assert_eq!(sums.dimensions(), &[3]);
        let last = sums.value_at(2, &env).unwrap();
        assert_eq!(last.to_longs(&env).unwrap(), [31, 32]);
    }

    #[test]
    fn monadic_fast_paths() {
        let env = Env::default();
        let negated = monadic(Primitive::Neg, &Value::longs([1, i64::MIN]), &env).unwrap();
        assert_eq!(negated.specialised_type(), SpecialisedType::Long);
        assert!(matches!(negated.value_at(0, &env), Ok(Value::Long(-1))));
        assert!(matches!(negated.value_at(1, &env), Ok(Value::BigInt(_))));
        let floors = monadic(Primitive::Floor, &Value::doubles([1.5, -0.5]), &env).unwrap();
        assert_eq!(floors.specialised_type(), SpecialisedType::Generic);
        assert_eq!(floors.to_longs(&env).unwrap(), [1, -1]);
    }
}
