//! Expand and replicate

use crate::{
    algorithm::{long_args, structure, AxisGeometry},
    array::{Array, ArrayView, SpecialisedType},
    AplResult, Dimensions, Env, ErrorKind, Value,
};

/// `replicate` slices along an axis
///
/// Count `c` at position `i` repeats slice `i` `c` times. A negative count
/// inserts `|c|` fill slices instead. A source with a single slice along the
/// axis is reused for every count.
pub fn replicate(counts: &Value, source: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    let source = as_vector(source, env)?;
    let len = axis_len(&source, axis, env)?;
    let counts = long_args(counts, "Replicate counts", env)?;
    let counts = match counts.as_slice() {
        [c] if len != 1 => vec![*c; len],
        _ => counts,
    };
    if counts.len() != len && len != 1 {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Cannot replicate {len} slices with {} counts", counts.len()),
        ));
    }
    let total = (counts.iter()).fold(0usize, |acc, &c| {
        acc.saturating_add(c.unsigned_abs() as usize)
    });
    let dims = result_dims(&source, axis, total, env)?;
    let mut mapping = Vec::with_capacity(total);
    for (i, &c) in counts.iter().enumerate() {
        let slice = if len == 1 { 0 } else { i };
        let n = c.unsigned_abs() as usize;
        let entry = if c > 0 { Some(slice) } else { None };
        mapping.extend(std::iter::repeat(entry).take(n));
    }
    Ok(mapped(&source, axis, dims, mapping))
}

/// `expand` slices along an axis
///
/// Each positive count `c` takes the next slice and repeats it `c` times,
/// and the positive counts must use up every slice. A zero count inserts
/// one fill slice and a negative count inserts `|c|` fill slices.
pub fn expand(counts: &Value, source: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    let source = as_vector(source, env)?;
    let len = axis_len(&source, axis, env)?;
    let counts = long_args(counts, "Expand counts", env)?;
    let used = counts.iter().filter(|&&c| c > 0).count();
    if used != len && !(len == 1 && used > 0) {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Expand counts take {used} slices, but the source has {len}"),
        ));
    }
    let total = (counts.iter()).fold(0usize, |acc, &c| {
        acc.saturating_add(c.unsigned_abs().max(1) as usize)
    });
    let dims = result_dims(&source, axis, total, env)?;
    let mut mapping = Vec::with_capacity(total);
    let mut next = 0;
    for &c in &counts {
        if c > 0 {
            let slice = if len == 1 { 0 } else { next };
            mapping.extend(std::iter::repeat(Some(slice)).take(c as usize));
            next += 1;
        } else {
            let n = c.unsigned_abs().max(1) as usize;
            mapping.extend(std::iter::repeat(None).take(n));
        }
    }
    Ok(mapped(&source, axis, dims, mapping))
}

fn as_vector(source: &Value, env: &Env) -> AplResult<Value> {
    if source.rank() == 0 {
        structure::reshaped(source, Dimensions::vector(1), env)
    } else {
        Ok(source.clone())
    }
}

fn axis_len(source: &Value, axis: usize, env: &Env) -> AplResult<usize> {
    let dims = source.dimensions();
    Ok(dims[dims.validate_axis(axis, env)?])
}

/// The result shape for `total` slices along the axis, checked before any
/// mapping is built
fn result_dims(source: &Value, axis: usize, total: usize, env: &Env) -> AplResult<Dimensions> {
    let dims = source.dimensions().replace(axis, total, env)?;
    env.validate_size(&dims)?;
    Ok(dims)
}

fn mapped(source: &Value, axis: usize, dims: Dimensions, mapping: Vec<Option<usize>>) -> Value {
    Value::Array(Array::new(MappedAxis {
        geometry: AxisGeometry::new(source.dimensions(), axis),
        source: source.clone(),
        result_len: mapping.len(),
        mapping,
        dims,
    }))
}

/// Slices of a source, in any order and multiplicity, with fill slices
/// where the mapping is empty
struct MappedAxis {
    source: Value,
    geometry: AxisGeometry,
    mapping: Vec<Option<usize>>,
    result_len: usize,
    dims: Dimensions,
}

impl MappedAxis {
    fn source_index(&self, index: usize) -> Option<usize> {
        let geo = self.geometry;
        let inner = index % geo.stride;
        let coord = (index / geo.stride) % self.result_len;
        let outer = index / (geo.stride * self.result_len);
        self.mapping[coord].map(|slice| geo.join(outer, slice, inner, geo.len))
    }
}

impl ArrayView for MappedAxis {
    fn name(&self) -> &'static str {
        "replicate"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        match self.source_index(index) {
            Some(i) => self.source.value_at(i, env),
            None => self.source.default_value(env),
        }
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.source.specialised_type()
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        match self.source_index(index) {
            Some(i) => self.source.value_at_long(i, env),
            None => self.source.default_value(env)?.ensure_long(env),
        }
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        match self.source_index(index) {
            Some(i) => self.source.value_at_double(i, env),
            None => self.source.default_value(env)?.ensure_double(env),
        }
    }
}
