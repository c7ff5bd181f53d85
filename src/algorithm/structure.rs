//! Reshape, take, drop and overlay

use std::collections::HashMap;

use crate::{
    algorithm::{long_args, nest},
    array::{Array, ArrayView, SpecialisedType, Storage},
    storage::{ConstantArray, DoubleArray, GenericArray, LongArray},
    AplResult, Dimensions, Env, ErrorKind, Value,
};

/// `reshape` a value to a shape
///
/// At most one axis of the shape may be `-1`, in which case its size is
/// derived from the number of elements in the source.
pub fn reshape(shape: &Value, source: &Value, env: &Env) -> AplResult<Value> {
    let sizes = long_args(shape, "Shape", env)?;
    let dims = derive_shape(&sizes, source.size(), env)?;
    reshaped(source, dims, env)
}

fn derive_shape(sizes: &[i64], source_size: usize, env: &Env) -> AplResult<Dimensions> {
    let placeholders = sizes.iter().filter(|&&s| s == -1).count();
    if placeholders > 1 {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Shape {sizes:?} has more than one derived axis"),
        ));
    }
    if placeholders == 0 {
        return Dimensions::from_signed(sizes, env);
    }
    let known = Dimensions::from_signed(
        &sizes.iter().copied().filter(|&s| s != -1).collect::<Vec<_>>(),
        env,
    )?;
    let product = known.content_size();
    if product == 0 || source_size % product != 0 {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Cannot derive an axis of shape {sizes:?} for {source_size} elements"),
        ));
    }
    let derived = (source_size / product) as i64;
    let sizes: Vec<i64> = (sizes.iter())
        .map(|&s| if s == -1 { derived } else { s })
        .collect();
    Dimensions::from_signed(&sizes, env)
}

/// Reinterpret a source with new dimensions
///
/// Elements are repeated cyclically if the new dimensions are larger.
pub fn reshaped(source: &Value, dims: Dimensions, env: &Env) -> AplResult<Value> {
    let size = env.validate_size(&dims)?;
    if &dims == source.dimensions() {
        return Ok(source.clone());
    }
    if dims.is_scalar() {
        let first = if source.size() == 0 {
            source.default_value(env)?
        } else {
            source.value_at(0, env)?
        };
        return Ok(nest::enclose(&first));
    }
    if size == source.size() {
        // Unwrap reshapes of the same size so chains of them do not grow
        let mut base = source;
        while let Some(inner) = base.as_array().and_then(Array::resize_source) {
            if inner.size() != size {
                break;
            }
            base = inner;
        }
        if let Some(array) = shared_storage(base, &dims) {
            return Ok(Value::Array(array));
        }
        return Ok(Value::Array(Array::new(Resized {
            source: base.clone(),
            dims,
        })));
    }
    if source.size() == 0 {
        let fill = source.default_value(env)?;
        return Ok(Value::Array(Array::new(ConstantArray::new(dims, fill))));
    }
    if source.size() == 1 {
        let value = source.value_at(0, env)?;
        return Ok(Value::Array(Array::new(ConstantArray::new(dims, value))));
    }
    Ok(Value::Array(Array::new(Resized {
        source: source.clone(),
        dims,
    })))
}

fn shared_storage(source: &Value, dims: &Dimensions) -> Option<Array> {
    let array = source.as_array()?;
    Some(match array.storage()? {
        Storage::Long(data) => Array::new(LongArray::new(dims.clone(), data.clone())),
        Storage::Double(data) => Array::new(DoubleArray::new(dims.clone(), data.clone())),
        Storage::Generic(data) => Array::new(GenericArray::new(dims.clone(), data.clone())),
    })
}

/// `ravel` a value into a vector
pub fn ravel(source: &Value, env: &Env) -> AplResult<Value> {
    reshaped(source, Dimensions::vector(source.size()), env)
}

struct Resized {
    source: Value,
    dims: Dimensions,
}

impl Resized {
    fn source_index(&self, index: usize) -> usize {
        index % self.source.size()
    }
}

impl ArrayView for Resized {
    fn name(&self) -> &'static str {
        "reshape"
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
    fn resize_source(&self) -> Option<&Value> {
        Some(&self.source)
    }
}

/// `take` elements from the start (positive counts) or end (negative
/// counts) of each leading axis
///
/// Taking more than an axis holds pads with the source's default value.
pub fn take(counts: &Value, source: &Value, env: &Env) -> AplResult<Value> {
    let counts = long_args(counts, "Take amount", env)?;
    let source_dims = extended_dimensions(source, counts.len(), "take", env)?;
    let mut dims = Vec::with_capacity(source_dims.rank());
    let mut offsets = Vec::with_capacity(source_dims.rank());
    for (axis, &n) in source_dims.iter().enumerate() {
        match counts.get(axis) {
            Some(&c) if c < 0 => {
                dims.push(c.unsigned_abs() as usize);
                offsets.push(n as i64 + c);
            }
            Some(&c) => {
                dims.push(c as usize);
                offsets.push(0);
            }
            None => {
                dims.push(n);
                offsets.push(0);
            }
        }
    }
    let dims = Dimensions::from(dims);
    env.validate_size(&dims)?;
    Ok(window("take", source, source_dims, dims, offsets))
}

/// `drop` elements from the start (positive counts) or end (negative
/// counts) of each leading axis
pub fn drop(counts: &Value, source: &Value, env: &Env) -> AplResult<Value> {
    let counts = long_args(counts, "Drop amount", env)?;
    let source_dims = extended_dimensions(source, counts.len(), "drop", env)?;
    let mut dims = Vec::with_capacity(source_dims.rank());
    let mut offsets = Vec::with_capacity(source_dims.rank());
    for (axis, &n) in source_dims.iter().enumerate() {
        let c = counts.get(axis).copied().unwrap_or(0);
        let dropped = (c.unsigned_abs()).min(n as u64) as usize;
        dims.push(n - dropped);
        offsets.push(if c > 0 { dropped as i64 } else { 0 });
    }
    Ok(window(
        "drop",
        source,
        source_dims,
        Dimensions::from(dims),
        offsets,
    ))
}

/// The source's dimensions, with a scalar treated as having `rank` unit axes
fn extended_dimensions(
    source: &Value,
    rank: usize,
    verb: &str,
    env: &Env,
) -> AplResult<Dimensions> {
    let dims = source.dimensions();
    if dims.is_scalar() {
        return Ok(Dimensions::new(std::iter::repeat(1).take(rank.max(1))));
    }
    if rank > dims.rank() {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!(
                "Cannot {verb} {rank} axes from an array of shape {dims}"
            ),
        ));
    }
    Ok(dims.clone())
}

fn window(
    name: &'static str,
    source: &Value,
    source_dims: Dimensions,
    dims: Dimensions,
    offsets: Vec<i64>,
) -> Value {
    Value::Array(Array::new(Window {
        name,
        source: source.clone(),
        source_dims,
        dims,
        offsets,
    }))
}

/// A rectangular window onto a source, padded where it leaves the source
struct Window {
    name: &'static str,
    source: Value,
    source_dims: Dimensions,
    dims: Dimensions,
    offsets: Vec<i64>,
}

impl Window {
    fn source_index(&self, index: usize) -> Option<usize> {
        let position = self.dims.position_from_index(index);
        let mut source_index = 0;
        for (axis, &c) in position.iter().enumerate() {
            let s = c as i64 + self.offsets[axis];
            if s < 0 || s >= self.source_dims[axis] as i64 {
                return None;
            }
            source_index += s as usize * self.source_dims.multiplier(axis);
        }
        Some(source_index)
    }
}

impl ArrayView for Window {
    fn name(&self) -> &'static str {
        self.name
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

/// A copy of a source with some flat positions replaced
///
/// The source is not modified.
pub fn overlay(
    source: &Value,
    replacements: impl IntoIterator<Item = (usize, Value)>,
    env: &Env,
) -> AplResult<Value> {
    let size = source.size();
    let mut map = HashMap::new();
    for (index, value) in replacements {
        if index >= size {
            return Err(env.index_error(index, size));
        }
        map.insert(index, value);
    }
    if map.is_empty() {
        return Ok(source.clone());
    }
    Ok(Value::Array(Array::new(Overlay {
        dims: source.dimensions().clone(),
        source: source.clone(),
        replacements: map,
    })))
}

struct Overlay {
    source: Value,
    dims: Dimensions,
    replacements: HashMap<usize, Value>,
}

impl ArrayView for Overlay {
    fn name(&self) -> &'static str {
        "overlay"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        match self.replacements.get(&index) {
            Some(value) => Ok(value.clone()),
            None => self.source.value_at(index, env),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnvConfig;

    fn env() -> Env {
        Env::default()
    }

    #[test]
    fn reshape_wraps_cyclically() {
        let env = env();
        let r = reshape(&Value::longs([2, 4]), &Value::longs([1, 2, 3]), &env).unwrap();
        assert_eq!(r.to_longs(&env).unwrap(), [1, 2, 3, 1, 2, 3, 1, 2]);
        assert_eq!(r.specialised_type(), SpecialisedType::Long);
    }

    #[test]
    fn reshape_shares_storage() {
        let env = env();
        let source = Value::longs(1..=6);
        let r = reshape(&Value::longs([2, 3]), &source, &env).unwrap();
        assert!(matches!(r.as_array().unwrap().storage(), Some(Storage::Long(_))));
        let position = r.dimensions().index_from_position(&[1, 2], &env).unwrap();
        assert!(matches!(r.value_at(position, &env), Ok(Value::Long(6))));
    }

    #[test]
    fn reshape_unwraps_resize_chains() {
        let env = env();
        let source = Value::longs([1, 2, 3]);
        let big = reshape(&Value::longs([6]), &source, &env).unwrap();
        let once = reshape(&Value::longs([2, 3]), &big, &env).unwrap();
        let twice = reshape(&Value::longs([3, 2]), &once, &env).unwrap();
        let inner = twice.as_array().unwrap().resize_source().unwrap();
        assert!(inner.as_array().unwrap().ptr_eq(big.as_array().unwrap()));
        assert_eq!(twice.to_longs(&env).unwrap(), [1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn derived_axis() {
        let env = env();
        let r = reshape(&Value::longs([-1, 2]), &Value::longs(1..=6), &env).unwrap();
        assert_eq!(r.dimensions(), &[3, 2]);
        let err = reshape(&Value::longs([-1, 4]), &Value::longs(1..=6), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        let err = reshape(&Value::longs([-1, -1]), &Value::longs(1..=6), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        let err = reshape(&Value::longs([-2, 3]), &Value::longs(1..=6), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn reshape_empty_and_single() {
        let env = env();
        let r = reshape(&Value::Long(3), &Value::longs([]), &env).unwrap();
        assert_eq!(r.to_longs(&env).unwrap(), [0, 0, 0]);
        let r = reshape(&Value::longs([2, 2]), &Value::Char('x'), &env).unwrap();
        assert_eq!(r.size(), 4);
        assert!(matches!(r.value_at(3, &env), Ok(Value::Char('x'))));
        let r = reshape(&Value::longs([]), &Value::longs([7, 8]), &env).unwrap();
        assert!(matches!(r, Value::Long(7)));
    }

    #[test]
    fn reshape_respects_size_limit() {
        let env = Env::new(EnvConfig {
            max_array_size: 10,
            ..EnvConfig::default()
        });
        let err = reshape(&Value::longs([4, 4]), &Value::Long(1), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn shapes_too_large_to_count_fail() {
        let env = env();
        let huge = Value::longs([1 << 40, 1 << 40]);
        let err = reshape(&huge, &Value::Long(1), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        let err = reshape(&Value::longs([-1, 1 << 40, 1 << 40]), &Value::Long(1), &env)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        let m = reshape(&Value::longs([2, 2]), &Value::longs(1..=4), &env).unwrap();
        let err = take(&huge, &m, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        let err = take(&Value::Long(i64::MIN), &Value::longs([1, 2]), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn take_and_overtake() {
        let env = env();
        let v = Value::longs(1..=5);
        let t = |n: i64| take(&Value::Long(n), &v, &env).unwrap().to_longs(&env).unwrap();
        assert_eq!(t(3), [1, 2, 3]);
        assert_eq!(t(-3), [3, 4, 5]);
        assert_eq!(t(7), [1, 2, 3, 4, 5, 0, 0]);
        assert_eq!(t(-7), [0, 0, 1, 2, 3, 4, 5]);
        assert_eq!(t(0), Vec::<i64>::new());
    }

    #[test]
    fn take_pads_characters_with_spaces() {
        let env = env();
        let t = take(&Value::Long(4), &Value::string("ab"), &env).unwrap();
        assert!(matches!(t.value_at(3, &env), Ok(Value::Char(' '))));
    }

    #[test]
    fn take_from_matrix_and_scalar() {
        let env = env();
        let m = reshape(&Value::longs([3, 3]), &Value::longs(1..=9), &env).unwrap();
        let t = take(&Value::longs([2, -2]), &m, &env).unwrap();
        assert_eq!(t.dimensions(), &[2, 2]);
        assert_eq!(t.to_longs(&env).unwrap(), [2, 3, 5, 6]);
        let t = take(&Value::Long(2), &m, &env).unwrap();
        assert_eq!(t.dimensions(), &[2, 3]);
        let t = take(&Value::Long(3), &Value::Long(9), &env).unwrap();
        assert_eq!(t.to_longs(&env).unwrap(), [9, 0, 0]);
        let err = take(&Value::longs([1, 1, 1]), &m, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn drop_clamps() {
        let env = env();
        let v = Value::longs(1..=5);
        let d = |n: i64| drop(&Value::Long(n), &v, &env).unwrap().to_longs(&env).unwrap();
        assert_eq!(d(2), [3, 4, 5]);
        assert_eq!(d(-2), [1, 2, 3]);
        assert_eq!(d(9), Vec::<i64>::new());
        assert_eq!(d(-9), Vec::<i64>::new());
    }

    #[test]
    fn overlay_replaces_positions() {
        let env = env();
        let v = Value::longs([1, 2, 3]);
        let o = overlay(&v, [(1, Value::Char('x'))], &env).unwrap();
        assert!(matches!(o.value_at(1, &env), Ok(Value::Char('x'))));
        assert!(matches!(v.value_at(1, &env), Ok(Value::Long(2))));
        let err = overlay(&v, [(3, Value::Long(0))], &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexOutOfBounds);
    }
}
