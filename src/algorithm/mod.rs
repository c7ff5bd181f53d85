//! Array operations
//!
//! Almost every operation here validates its arguments and computes its
//! result shape eagerly, then returns a view that computes elements on
//! demand.

use crate::{
    array::{Array, ArrayView, SpecialisedType},
    AplResult, Dimensions, Env, ErrorKind, Value,
};

pub mod combine;
pub mod groups;
pub mod loops;
pub mod monadic;
pub mod nest;
pub mod permute;
pub mod pervade;
pub mod reduce;
pub mod search;
pub mod select;
pub mod structure;
pub mod table;

/// The per-axis maximum of two shapes, aligned at their last axes
pub(crate) fn max_shape(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut new_shape = vec![0; a.len().max(b.len())];
    for i in 0..new_shape.len() {
        let j = new_shape.len() - i - 1;
        if a.len() > i {
            new_shape[j] = a[a.len() - i - 1];
        }
        if b.len() > i {
            new_shape[j] = new_shape[j].max(b[b.len() - i - 1]);
        }
    }
    new_shape
}

/// Read a scalar or vector argument as longs
pub(crate) fn long_args(value: &Value, what: &str, env: &Env) -> AplResult<Vec<i64>> {
    if value.rank() > 1 {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!(
                "{what} must be a scalar or vector, but it has shape {}",
                value.dimensions()
            ),
        ));
    }
    value.to_longs(env)
}

/// Read an operand element through the long accessor
///
/// `None` means the element exists but does not fit in 64 bits, so the
/// caller has to read it through [`Value::value_at`] instead.
pub(crate) fn long_operand(source: &Value, index: usize, env: &Env) -> AplResult<Option<i64>> {
    match source.value_at_long(index, env) {
        Ok(n) => Ok(Some(n)),
        Err(e) if e.is_overflow() => Ok(None),
        Err(e) => Err(e),
    }
}

/// How flat indices move along one axis
#[derive(Debug, Clone, Copy)]
pub(crate) struct AxisGeometry {
    pub len: usize,
    pub stride: usize,
}

impl AxisGeometry {
    pub fn new(dims: &Dimensions, axis: usize) -> Self {
        AxisGeometry {
            len: dims[axis],
            stride: dims.multiplier(axis),
        }
    }
    /// Split a flat index into the index of its slice before the axis, its
    /// coordinate along the axis, and its offset after the axis
    pub fn split(&self, index: usize) -> (usize, usize, usize) {
        let inner = index % self.stride;
        let coord = (index / self.stride) % self.len;
        let outer = index / (self.stride * self.len);
        (outer, coord, inner)
    }
    /// The inverse of [`AxisGeometry::split`] for an axis of length `len`
    pub fn join(&self, outer: usize, coord: usize, inner: usize, len: usize) -> usize {
        (outer * len + coord) * self.stride + inner
    }
}

/// Elements of a source at `start + i * stride`
pub(crate) struct StridedSlice {
    source: Value,
    dims: Dimensions,
    start: usize,
    stride: usize,
}

impl StridedSlice {
    pub fn new(source: Value, start: usize, stride: usize, len: usize) -> Self {
        StridedSlice {
            source,
            dims: Dimensions::vector(len),
            start,
            stride,
        }
    }
}

impl ArrayView for StridedSlice {
    fn name(&self) -> &'static str {
        "slice"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        self.source.value_at(self.start + index * self.stride, env)
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.source.specialised_type()
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        self.source.value_at_long(self.start + index * self.stride, env)
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        self.source.value_at_double(self.start + index * self.stride, env)
    }
}

/// A contiguous block of a source, reshaped
struct Cell {
    source: Value,
    dims: Dimensions,
    offset: usize,
}

impl ArrayView for Cell {
    fn name(&self) -> &'static str {
        "cell"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        self.source.value_at(self.offset + index, env)
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.source.specialised_type()
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        self.source.value_at_long(self.offset + index, env)
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        self.source.value_at_double(self.offset + index, env)
    }
}

/// Get the `i`th major cell of a value of rank at least 1
///
/// The cells of a vector are its elements.
pub(crate) fn major_cell(source: &Value, i: usize, env: &Env) -> AplResult<Value> {
    let dims = source.dimensions();
    if dims.rank() <= 1 {
        return source.value_at(i, env);
    }
    let cell_dims = Dimensions::new(dims[1..].iter().copied());
    let offset = i * cell_dims.content_size();
    Ok(Value::Array(Array::new(Cell {
        source: source.clone(),
        dims: cell_dims,
        offset,
    })))
}
