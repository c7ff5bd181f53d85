//! Outer and inner products

use crate::{
    algorithm::{long_operand, nest},
    array::{Array, ArrayView, SpecialisedType},
    function::{long_result, OptimisationFlags},
    storage::ConstantArray,
    AplResult, Dimensions, Env, ErrorKind, FunctionRef, Value,
};

/// The `outer` product of two values
///
/// The result's shape is the shape of `a` followed by the shape of `b`, and
/// each element is `f` applied to one element of each.
pub fn outer(f: FunctionRef, a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
    if !a.is_array() && !b.is_array() {
        return f.eval2(a, b, env);
    }
    let dims = a.dimensions().concat(b.dimensions());
    env.validate_size(&dims)?;
    let flags = f.flags();
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
    log::debug!("outer {} uses the {path:?} path", f.name());
    Ok(Value::Array(Array::new(Outer {
        f,
        b_size: b.size(),
        a: a.clone(),
        b: b.clone(),
        dims,
        path,
    })))
}

struct Outer {
    f: FunctionRef,
    a: Value,
    b: Value,
    b_size: usize,
    dims: Dimensions,
    path: SpecialisedType,
}

impl Outer {
    fn indices(&self, index: usize) -> (usize, usize) {
        (index / self.b_size, index % self.b_size)
    }
    fn operand_longs(&self, index: usize, env: &Env) -> AplResult<Option<(i64, i64)>> {
        let (i, j) = self.indices(index);
        let a = long_operand(&self.a, i, env)?;
        let b = long_operand(&self.b, j, env)?;
        Ok(a.zip(b))
    }
    fn generic(&self, index: usize, env: &Env) -> AplResult<Value> {
        let (i, j) = self.indices(index);
        let a = self.a.value_at(i, env)?;
        let b = self.b.value_at(j, env)?;
        self.f.eval2(&a, &b, env)
    }
}

impl ArrayView for Outer {
    fn name(&self) -> &'static str {
        "outer product"
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
                match self.f.eval2_long(a, b, env) {
                    Ok(n) => Ok(Value::Long(n)),
                    Err(e) if e.is_overflow() => match e.into_overflow() {
                        Ok(big) => Ok(Value::from(big)),
                        Err(_) => self.generic(index, env),
                    },
                    Err(e) => Err(e),
                }
            }
            SpecialisedType::Double => Ok(Value::Double(self.value_at_double(index, env)?)),
            SpecialisedType::Generic => self.generic(index, env),
        }
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.path
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        match self.path {
            SpecialisedType::Long => match self.operand_longs(index, env)? {
                Some((a, b)) => self.f.eval2_long(a, b, env),
                None => long_result(self.generic(index, env)?, env),
            },
            _ => self.generic(index, env)?.ensure_long(env),
        }
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        match self.path {
            SpecialisedType::Double => {
                let (i, j) = self.indices(index);
                let a = self.a.value_at_double(i, env)?;
                let b = self.b.value_at_double(j, env)?;
                self.f.eval2_double(a, b, env)
            }
            _ => self.generic(index, env)?.ensure_double(env),
        }
    }
}

/// The generalised `inner` product of two values
///
/// The last axis of `a` must match the first axis of `b`. Each result element
/// pairs a row of `a` with a column of `b` through `f2` and folds the pairs
/// left to right with `f1`. A rank-0 operand is extended to the length of
/// the other's joining axis. Matrix multiplication is the inner product of
/// add and multiply.
pub fn inner(
    f1: FunctionRef,
    f2: FunctionRef,
    a: &Value,
    b: &Value,
    env: &Env,
) -> AplResult<Value> {
    let (a_dims, b_dims) = (a.dimensions(), b.dimensions());
    let len = match (a_dims.last(), b_dims.first()) {
        (Some(&x), Some(&y)) if x == y => x,
        (Some(&x), None) => x,
        (None, Some(&y)) => y,
        (None, None) => 1,
        _ => {
            return Err(env.error(
                ErrorKind::Dimensions,
                format!("Cannot take the inner product of arrays of shapes {a_dims} and {b_dims}"),
            ))
        }
    };
    let a_outer = Dimensions::from(&a_dims[..a_dims.rank().saturating_sub(1)]);
    let b_inner = Dimensions::from(&b_dims[b_dims.rank().min(1)..]);
    let dims = a_outer.concat(&b_inner);
    env.validate_size(&dims)?;
    let product = InnerProduct {
        f1,
        f2,
        a: a.clone(),
        b: b.clone(),
        len,
        b_inner_size: b_inner.content_size(),
        dims,
    };
    if len == 0 {
        let identity = product.f1.identity().ok_or_else(|| {
            env.error(
                ErrorKind::Domain,
                format!("{} has no identity for an empty inner product", product.f1.name()),
            )
        })?;
        if product.dims.is_scalar() {
            return Ok(identity);
        }
        return Ok(Value::Array(Array::new(ConstantArray::new(
            product.dims,
            identity,
        ))));
    }
    if product.dims.is_scalar() {
        let value = product.value_at(0, env)?;
        return Ok(nest::enclose(&value));
    }
    Ok(Value::Array(Array::new(product)))
}

struct InnerProduct {
    f1: FunctionRef,
    f2: FunctionRef,
    a: Value,
    b: Value,
    len: usize,
    b_inner_size: usize,
    dims: Dimensions,
}

impl InnerProduct {
    fn pair(&self, row: usize, column: usize, t: usize, env: &Env) -> AplResult<Value> {
        let i = if self.a.rank() == 0 { 0 } else { row * self.len + t };
        let j = if self.b.rank() == 0 {
            0
        } else {
            t * self.b_inner_size + column
        };
        let x = self.a.value_at(i, env)?;
        let y = self.b.value_at(j, env)?;
        self.f2.eval2(&x, &y, env)
    }
}

impl ArrayView for InnerProduct {
    fn name(&self) -> &'static str {
        "inner product"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        let (row, column) = (index / self.b_inner_size, index % self.b_inner_size);
        let mut acc = self.pair(row, column, 0, env)?;
        for t in 1..self.len {
            env.check_interrupted()?;
            let next = self.pair(row, column, t, env)?;
            acc = self.f1.eval2(&acc, &next, env)?;
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use num::BigInt;

    use super::*;
    use crate::{algorithm::structure::reshape, Primitive};

    #[test]
    fn outer_shapes_and_values() {
        let env = Env::default();
        let a = Value::longs([1, 2]);
        let b = Value::longs([10, 20, 30]);
        let t = outer(Primitive::Mul.into_ref(), &a, &b, &env).unwrap();
        assert_eq!(t.dimensions(), &[2, 3]);
        assert_eq!(t.specialised_type(), SpecialisedType::Long);
        assert_eq!(t.to_longs(&env).unwrap(), [10, 20, 30, 20, 40, 60]);
        let eq = outer(Primitive::Eq.into_ref(), &Value::string("ab"), &Value::string("ba"), &env)
            .unwrap();
        assert_eq!(eq.to_longs(&env).unwrap(), [0, 1, 1, 0]);
    }

    #[test]
    fn outer_promotes_overflowing_positions() {
        let env = Env::default();
        let t = outer(
            Primitive::Add.into_ref(),
            &Value::longs([i64::MAX, 0]),
            &Value::longs([1]),
            &env,
        )
        .unwrap();
        match t.value_at(0, &env).unwrap() {
            Value::BigInt(b) => assert_eq!(*b, BigInt::from(i64::MAX) + 1),
            other => panic!("expected a big integer, got {other:?}"),
        }
        assert!(matches!(t.value_at(1, &env), Ok(Value::Long(1))));
    }

    #[test]
    fn outer_over_overflowed_operands() {
        let env = Env::default();
        let past_max = outer(
            Primitive::Add.into_ref(),
            &Value::longs([i64::MAX]),
            &Value::longs([1, 2]),
            &env,
        )
        .unwrap();
        let again = outer(Primitive::Sub.into_ref(), &past_max, &Value::longs([3]), &env).unwrap();
        assert_eq!(again.dimensions(), &[1, 2, 1]);
        assert!(matches!(again.value_at(0, &env), Ok(Value::Long(n)) if n == i64::MAX - 2));
        assert_eq!(again.value_at_long(1, &env).unwrap(), i64::MAX - 1);
    }

    #[test]
    fn matrix_product() {
        let env = Env::default();
        let a = reshape(&Value::longs([2, 2]), &Value::longs([1, 2, 3, 4]), &env).unwrap();
        let b = reshape(&Value::longs([2, 2]), &Value::longs([5, 6, 7, 8]), &env).unwrap();
        let p = inner(Primitive::Add.into_ref(), Primitive::Mul.into_ref(), &a, &b, &env).unwrap();
        assert_eq!(p.dimensions(), &[2, 2]);
        assert_eq!(p.to_longs(&env).unwrap(), [19, 22, 43, 50]);
    }

    #[test]
    fn dot_product_and_scalars() {
        let env = Env::default();
        let add = Primitive::Add.into_ref();
        let mul = Primitive::Mul.into_ref();
        let v = Value::longs([1, 2, 3]);
        let dot = inner(add.clone(), mul.clone(), &v, &v, &env).unwrap();
        assert!(matches!(dot, Value::Long(14)));
        let scaled = inner(add.clone(), mul.clone(), &Value::Long(2), &v, &env).unwrap();
        assert!(matches!(scaled, Value::Long(12)));
        let all_equal = inner(
            Primitive::And.into_ref(),
            Primitive::Eq.into_ref(),
            &v,
            &Value::longs([1, 2, 3]),
            &env,
        )
        .unwrap();
        assert!(matches!(all_equal, Value::Long(1)));
        let err = inner(add, mul, &v, &Value::longs([1, 2]), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn empty_inner_axis_gives_identity() {
        let env = Env::default();
        let a = reshape(&Value::longs([2, 0]), &Value::longs([]), &env).unwrap();
        let b = reshape(&Value::longs([0, 3]), &Value::longs([]), &env).unwrap();
        let p = inner(Primitive::Add.into_ref(), Primitive::Mul.into_ref(), &a, &b, &env).unwrap();
        assert_eq!(p.dimensions(), &[2, 3]);
        assert_eq!(p.to_longs(&env).unwrap(), [0; 6]);
    }
}
