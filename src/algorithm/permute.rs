//! Rotate, reverse and transpose

use crate::{
    algorithm::{long_args, AxisGeometry},
    array::{Array, ArrayView, SpecialisedType},
    numeric::floor_mod,
    AplResult, Dimensions, Env, ErrorKind, Value,
};

/// `rotate` a value along an axis
///
/// `amount` is either a single shift or one shift per slice, shaped like the
/// source with the rotated axis removed. Element `i` of the result is
/// element `(i + shift) mod n` of the source.
pub fn rotate(amount: &Value, source: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    if source.rank() == 0 {
        amount.ensure_long(env)?;
        return Ok(source.clone());
    }
    let dims = source.dimensions();
    dims.validate_axis(axis, env)?;
    let geometry = AxisGeometry::new(dims, axis);
    if geometry.len == 0 {
        return Ok(source.clone());
    }
    let shifts = if amount.rank() == 0 {
        vec![amount.ensure_long(env)?]
    } else {
        let slices = dims.remove(axis, env)?;
        if amount.dimensions() != &slices {
            return Err(env.error(
                ErrorKind::Dimensions,
                format!(
                    "Cannot rotate an array of shape {dims} along axis {axis} \
                    by amounts of shape {}",
                    amount.dimensions()
                ),
            ));
        }
        amount.to_longs(env)?
    };
    let len = geometry.len as i64;
    let shifts: Vec<usize> = (shifts.into_iter())
        .map(|s| floor_mod(s, len) as usize)
        .collect();
    if shifts.iter().all(|&s| s == 0) {
        return Ok(source.clone());
    }
    Ok(Value::Array(Array::new(Rotated {
        source: source.clone(),
        geometry,
        shifts,
    })))
}

struct Rotated {
    source: Value,
    geometry: AxisGeometry,
    shifts: Vec<usize>,
}

impl Rotated {
    fn source_index(&self, index: usize) -> usize {
        let geo = self.geometry;
        let (outer, coord, inner) = geo.split(index);
        let shift = match self.shifts.as_slice() {
            [single] => *single,
            shifts => shifts[outer * geo.stride + inner],
        };
        geo.join(outer, (coord + shift) % geo.len, inner, geo.len)
    }
}

impl ArrayView for Rotated {
    fn name(&self) -> &'static str {
        "rotate"
    }
    fn dimensions(&self) -> &Dimensions {
        self.source.dimensions()
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        self.source.value_at(self.source_index(index), env)
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.source.specialised_type()
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        self.source.value_at_long(self.source_index(index), env)
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        self.source.value_at_double(self.source_index(index), env)
    }
}

/// `reverse` a value along an axis
pub fn reverse(source: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    if source.rank() == 0 {
        return Ok(source.clone());
    }
    let dims = source.dimensions();
    dims.validate_axis(axis, env)?;
    if dims[axis] <= 1 {
        return Ok(source.clone());
    }
    Ok(Value::Array(Array::new(Reversed {
        source: source.clone(),
        geometry: AxisGeometry::new(dims, axis),
    })))
}

struct Reversed {
    source: Value,
    geometry: AxisGeometry,
}

impl Reversed {
    fn source_index(&self, index: usize) -> usize {
        let geo = self.geometry;
        let (outer, coord, inner) = geo.split(index);
        geo.join(outer, geo.len - 1 - coord, inner, geo.len)
    }
}

impl ArrayView for Reversed {
    fn name(&self) -> &'static str {
        "reverse"
    }
    fn dimensions(&self) -> &Dimensions {
        self.source.dimensions()
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        self.source.value_at(self.source_index(index), env)
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.source.specialised_type()
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        self.source.value_at_long(self.source_index(index), env)
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        self.source.value_at_double(self.source_index(index), env)
    }
}

/// `transpose` a value
///
/// Axis `i` of the source becomes axis `axes[i]` of the result. The axes must
/// be a permutation of the source's axes.
pub fn transpose(axes: &Value, source: &Value, env: &Env) -> AplResult<Value> {
    let axes = long_args(axes, "Transpose axes", env)?;
    let dims = source.dimensions();
    if axes.len() != dims.rank() {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!(
                "Cannot transpose an array of rank {} with {} axes",
                dims.rank(),
                axes.len()
            ),
        ));
    }
    let mut destinations = Vec::with_capacity(axes.len());
    for &axis in &axes {
        match usize::try_from(axis) {
            Ok(a) if a < dims.rank() => destinations.push(a),
            _ => {
                return Err(env.error(
                    ErrorKind::IllegalAxis,
                    format!("Axis {axis} is out of range for rank {}", dims.rank()),
                ))
            }
        }
    }
    let mut represented = vec![false; dims.rank()];
    for &d in &destinations {
        represented[d] = true;
    }
    if represented.contains(&false) {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Not all axes represented in transpose axes {axes:?}"),
        ));
    }
    Ok(transposed(source, &destinations))
}

/// Transpose a value by reversing the order of its axes
pub fn transpose_reverse(source: &Value) -> Value {
    let destinations: Vec<usize> = (0..source.rank()).rev().collect();
    transposed(source, &destinations)
}

fn transposed(source: &Value, destinations: &[usize]) -> Value {
    if destinations.iter().enumerate().all(|(i, &d)| i == d) {
        return source.clone();
    }
    let dims = source.dimensions();
    let mut result_dims = vec![0; dims.rank()];
    let mut source_multipliers = vec![0; dims.rank()];
    for (axis, &d) in destinations.iter().enumerate() {
        result_dims[d] = dims[axis];
        source_multipliers[d] = dims.multiplier(axis);
    }
    Value::Array(Array::new(Transposed {
        source: source.clone(),
        dims: Dimensions::from(result_dims),
        source_multipliers,
    }))
}

struct Transposed {
    source: Value,
    dims: Dimensions,
    /// The source stride of each result axis
    source_multipliers: Vec<usize>,
}

impl Transposed {
    fn source_index(&self, index: usize) -> usize {
        let position = self.dims.position_from_index(index);
        (position.iter())
            .zip(&self.source_multipliers)
            .map(|(c, m)| c * m)
            .sum()
    }
}

impl ArrayView for Transposed {
    fn name(&self) -> &'static str {
        "transpose"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        self.source.value_at(self.source_index(index), env)
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.source.specialised_type()
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        self.source.value_at_long(self.source_index(index), env)
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        self.source.value_at_double(self.source_index(index), env)
    }
}
