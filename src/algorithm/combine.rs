//! Concatenation

use crate::{
    algorithm::{structure, AxisGeometry},
    array::{Array, ArrayView, SpecialisedType},
    storage::{values_with_dimensions, ConstantArray},
    AplResult, Dimensions, Env, ErrorKind, Value,
};

/// `concatenate` two values along an axis
///
/// The axis defaults to the last axis of the higher-ranked operand. A
/// rank-0 operand is repeated to a slice of size 1 along the axis, and an
/// operand with one axis fewer than the other gains a unit axis at the join
/// position.
pub fn concatenate(a: &Value, b: &Value, axis: Option<usize>, env: &Env) -> AplResult<Value> {
    let rank = a.rank().max(b.rank());
    if rank == 0 {
        let pair = vec![a.value_at(0, env)?, b.value_at(0, env)?];
        return Ok(Value::Array(values_with_dimensions(
            Dimensions::vector(2),
            pair,
        )));
    }
    let axis = axis.unwrap_or(rank - 1);
    if axis >= rank {
        return Err(env.error(
            ErrorKind::IllegalAxis,
            format!("Cannot concatenate along axis {axis} of arrays of rank {rank}"),
        ));
    }
    let (a, b) = match (a.rank(), b.rank()) {
        (0, _) => (slice_of(a, b.dimensions(), axis, env)?, b.clone()),
        (_, 0) => (a.clone(), slice_of(b, a.dimensions(), axis, env)?),
        (ra, rb) if ra + 1 == rb => (with_unit_axis(a, axis, env)?, b.clone()),
        (ra, rb) if rb + 1 == ra => (a.clone(), with_unit_axis(b, axis, env)?),
        (ra, rb) if ra == rb => (a.clone(), b.clone()),
        _ => return Err(env.mismatch(a.dimensions(), b.dimensions())),
    };
    let (a_dims, b_dims) = (a.dimensions(), b.dimensions());
    let compatible = (0..rank).all(|i| i == axis || a_dims[i] == b_dims[i]);
    if !compatible {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Cannot concatenate arrays of shapes {a_dims} and {b_dims} along axis {axis}"),
        ));
    }
    let dims = a_dims.replace(axis, a_dims[axis] + b_dims[axis], env)?;
    env.validate_size(&dims)?;
    if a.size() == 0 && &dims == b_dims {
        return Ok(b);
    }
    if b.size() == 0 && &dims == a_dims {
        return Ok(a);
    }
    let specialised_type = if a.specialised_type() == b.specialised_type() {
        a.specialised_type()
    } else {
        SpecialisedType::Generic
    };
    if rank == 1 {
        let split = a.size();
        return Ok(Value::Array(Array::new(Concatenated1D {
            a,
            b,
            dims,
            split,
            specialised_type,
        })));
    }
    Ok(Value::Array(Array::new(Concatenated {
        geometry: AxisGeometry::new(&dims, axis),
        a_len: a_dims[axis],
        b_len: b_dims[axis],
        a,
        b,
        dims,
        specialised_type,
    })))
}

/// A single value repeated over a slice of size 1 along `axis`
fn slice_of(value: &Value, other: &Dimensions, axis: usize, env: &Env) -> AplResult<Value> {
    let dims = other.replace(axis, 1, env)?;
    let element = value.value_at(0, env)?;
    Ok(Value::Array(Array::new(ConstantArray::new(dims, element))))
}

fn with_unit_axis(value: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    let dims = value.dimensions().insert(axis, 1, env)?;
    structure::reshaped(value, dims, env)
}

struct Concatenated1D {
    a: Value,
    b: Value,
    dims: Dimensions,
    split: usize,
    specialised_type: SpecialisedType,
}

impl Concatenated1D {
    fn source(&self, index: usize) -> (&Value, usize) {
        if index < self.split {
            (&self.a, index)
        } else {
            (&self.b, index - self.split)
        }
    }
}

impl ArrayView for Concatenated1D {
    fn name(&self) -> &'static str {
        "concatenate"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        let (source, i) = self.source(index);
        source.value_at(i, env)
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.specialised_type
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        let (source, i) = self.source(index);
        source.value_at_long(i, env)
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        let (source, i) = self.source(index);
        source.value_at_double(i, env)
    }
}

struct Concatenated {
    a: Value,
    b: Value,
    dims: Dimensions,
    geometry: AxisGeometry,
    a_len: usize,
    b_len: usize,
    specialised_type: SpecialisedType,
}

impl Concatenated {
    fn source(&self, index: usize) -> (&Value, usize) {
        let geo = self.geometry;
        let (outer, coord, inner) = geo.split(index);
        if coord < self.a_len {
            (&self.a, geo.join(outer, coord, inner, self.a_len))
        } else {
            let coord = coord - self.a_len;
            (&self.b, geo.join(outer, coord, inner, self.b_len))
        }
    }
}

impl ArrayView for Concatenated {
    fn name(&self) -> &'static str {
        "concatenate"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        let (source, i) = self.source(index);
        source.value_at(i, env)
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.specialised_type
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        let (source, i) = self.source(index);
        source.value_at_long(i, env)
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        let (source, i) = self.source(index);
        source.value_at_double(i, env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::structure::reshape;

    fn matrix(env: &Env) -> Value {
        reshape(&Value::longs([2, 3]), &Value::longs(1..=6), env).unwrap()
    }

    #[test]
    fn vectors() {
        let env = Env::default();
        let c = concatenate(&Value::longs([1, 2, 3]), &Value::longs([4, 5]), None, &env).unwrap();
        assert_eq!(c.to_longs(&env).unwrap(), [1, 2, 3, 4, 5]);
        assert_eq!(c.specialised_type(), SpecialisedType::Long);
        let c = concatenate(&Value::longs([1]), &Value::doubles([0.5]), None, &env).unwrap();
        assert_eq!(c.specialised_type(), SpecialisedType::Generic);
        assert_eq!(c.to_doubles(&env).unwrap(), [1.0, 0.5]);
    }

    #[test]
    fn scalars() {
        let env = Env::default();
        let c = concatenate(&Value::Long(1), &Value::Char('a'), None, &env).unwrap();
        assert_eq!(c.dimensions(), &[2]);
        assert!(matches!(c.value_at(1, &env), Ok(Value::Char('a'))));
        let c = concatenate(&Value::Long(0), &Value::longs([1, 2]), None, &env).unwrap();
        assert_eq!(c.to_longs(&env).unwrap(), [0, 1, 2]);
        let c = concatenate(&matrix(&env), &Value::Long(0), None, &env).unwrap();
        assert_eq!(c.dimensions(), &[2, 4]);
        assert_eq!(c.to_longs(&env).unwrap(), [1, 2, 3, 0, 4, 5, 6, 0]);
    }

    #[test]
    fn matrix_with_vector() {
        let env = Env::default();
        let m = matrix(&env);
        let c = concatenate(&m, &Value::longs([7, 8]), Some(1), &env).unwrap();
        assert_eq!(c.dimensions(), &[2, 4]);
        assert_eq!(c.to_longs(&env).unwrap(), [1, 2, 3, 7, 4, 5, 6, 8]);
        let c = concatenate(&Value::longs([7, 8, 9]), &m, Some(0), &env).unwrap();
        assert_eq!(c.dimensions(), &[3, 3]);
        assert_eq!(c.to_longs(&env).unwrap(), [7, 8, 9, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn matrices() {
        let env = Env::default();
        let m = matrix(&env);
        let c = concatenate(&m, &m, Some(0), &env).unwrap();
        assert_eq!(c.dimensions(), &[4, 3]);
        assert_eq!(c.to_longs(&env).unwrap()[6..], [1, 2, 3, 4, 5, 6]);
        let err = concatenate(&m, &Value::longs([1, 2, 3]), Some(1), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        let err = concatenate(&m, &m, Some(2), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalAxis);
    }

    #[test]
    fn empty_operands_are_skipped() {
        let env = Env::default();
        let b = Value::longs([1, 2]);
        let c = concatenate(&Value::longs([]), &b, None, &env).unwrap();
        assert!(c.as_array().unwrap().ptr_eq(b.as_array().unwrap()));
        let c = concatenate(&b, &Value::longs([]), None, &env).unwrap();
        assert!(c.as_array().unwrap().ptr_eq(b.as_array().unwrap()));
    }
}
