//! Reduce, windowed reduce and scan

use once_cell::sync::OnceCell;

use crate::{
    algorithm::{long_operand, nest, AxisGeometry},
    array::{Array, ArrayView, SpecialisedType},
    function::{long_result, OptimisationFlags},
    storage::ConstantArray,
    AplResult, Dimensions, Env, ErrorKind, FunctionRef, Value,
};

fn identity(f: &FunctionRef, env: &Env) -> AplResult<Value> {
    f.identity().ok_or_else(|| {
        env.error(
            ErrorKind::Domain,
            format!("{} has no identity, so it cannot reduce an empty axis", f.name()),
        )
    })
}

fn fold_path(f: &FunctionRef, source: &Value) -> SpecialisedType {
    let flags = f.flags();
    match source.specialised_type() {
        SpecialisedType::Long if flags.contains(OptimisationFlags::DYADIC_LONG_LONG) => {
            SpecialisedType::Long
        }
        SpecialisedType::Double if flags.contains(OptimisationFlags::DYADIC_DOUBLE_DOUBLE) => {
            SpecialisedType::Double
        }
        _ => SpecialisedType::Generic,
    }
}

/// A left-to-right fold over the source elements at the given flat indices
struct Fold<'a> {
    f: &'a FunctionRef,
    source: &'a Value,
    path: SpecialisedType,
}

impl Fold<'_> {
    fn run(&self, mut indices: impl Iterator<Item = usize>, env: &Env) -> AplResult<Value> {
        let Some(first) = indices.next() else {
            return identity(self.f, env);
        };
        match self.path {
            SpecialisedType::Long => self.run_long(first, indices, env),
            SpecialisedType::Double => {
                let mut acc = self.source.value_at_double(first, env)?;
                for i in indices {
                    env.check_interrupted()?;
                    let x = self.source.value_at_double(i, env)?;
                    acc = self.f.eval2_double(acc, x, env)?;
                }
                Ok(Value::Double(acc))
            }
            SpecialisedType::Generic => {
                let acc = self.source.value_at(first, env)?;
                self.run_generic(acc, indices, env)
            }
        }
    }
    fn run_long(
        &self,
        first: usize,
        mut indices: impl Iterator<Item = usize>,
        env: &Env,
    ) -> AplResult<Value> {
        let Some(mut acc) = long_operand(self.source, first, env)? else {
            let acc = self.source.value_at(first, env)?;
            return self.run_generic(acc, indices, env);
        };
        while let Some(i) = indices.next() {
            env.check_interrupted()?;
            let Some(x) = long_operand(self.source, i, env)? else {
                log::debug!(
                    "{} reduction met a big integer at index {i}, continuing generically",
                    self.f.name()
                );
                let rest = std::iter::once(i).chain(indices);
                return self.run_generic(Value::Long(acc), rest, env);
            };
            match self.f.eval2_long(acc, x, env) {
                Ok(n) => acc = n,
                Err(e) if e.is_overflow() => {
                    log::debug!(
                        "{} reduction overflowed at index {i}, continuing with big integers",
                        self.f.name()
                    );
                    let promoted = match e.into_overflow() {
                        Ok(big) => Value::from(big),
                        Err(_) => self.f.eval2(&Value::Long(acc), &Value::Long(x), env)?,
                    };
                    return self.run_generic(promoted, indices, env);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Value::Long(acc))
    }
    fn run_generic(
        &self,
        mut acc: Value,
        indices: impl Iterator<Item = usize>,
        env: &Env,
    ) -> AplResult<Value> {
        for i in indices {
            env.check_interrupted()?;
            let x = self.source.value_at(i, env)?;
            acc = self.f.eval2(&acc, &x, env)?;
        }
        Ok(acc)
    }
}

/// `reduce` a value along an axis with a dyadic function
///
/// Elements along the axis are folded left to right, starting from the
/// first. An empty axis reduces to the function's identity.
pub fn reduce(f: FunctionRef, source: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    if source.rank() == 0 {
        return Ok(source.clone());
    }
    let dims = source.dimensions();
    let result_dims = dims.remove(axis, env)?;
    let geometry = AxisGeometry::new(dims, axis);
    let path = fold_path(&f, source);
    log::debug!("reduce {} over {source:?} uses the {path:?} path", f.name());
    if geometry.len == 0 {
        let identity = identity(&f, env)?;
        if result_dims.is_scalar() {
            return Ok(identity);
        }
        return Ok(Value::Array(Array::new(ConstantArray::new(
            result_dims,
            identity,
        ))));
    }
    if result_dims.is_scalar() {
        let fold = Fold {
            f: &f,
            source,
            path,
        };
        let value = fold.run(0..geometry.len, env)?;
        return Ok(nest::enclose(&value));
    }
    Ok(Value::Array(Array::new(Reduced {
        f,
        source: source.clone(),
        geometry,
        dims: result_dims,
        path,
    })))
}

struct Reduced {
    f: FunctionRef,
    source: Value,
    geometry: AxisGeometry,
    dims: Dimensions,
    path: SpecialisedType,
}

impl ArrayView for Reduced {
    fn name(&self) -> &'static str {
        "reduce"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        let geo = self.geometry;
        let (outer, inner) = (index / geo.stride, index % geo.stride);
        let fold = Fold {
            f: &self.f,
            source: &self.source,
            path: self.path,
        };
        fold.run((0..geo.len).map(|k| geo.join(outer, k, inner, geo.len)), env)
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.path
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        long_result(self.value_at(index, env)?, env)
    }
}

/// Positions per memo chunk
const MEMO_CHUNK: usize = 1 << 12;

/// Results of a view computed on demand, one slot per position
///
/// Nothing is allocated until a position is first written, and then only
/// the chunk holding it. Racing writers of one slot keep the first value.
struct Memo {
    len: usize,
    chunks: OnceCell<Box<[OnceCell<Box<[OnceCell<Value>]>>]>>,
}

impl Memo {
    fn new(len: usize) -> Self {
        Memo {
            len,
            chunks: OnceCell::new(),
        }
    }
    fn get(&self, index: usize) -> Option<&Value> {
        let chunk = self.chunks.get()?.get(index / MEMO_CHUNK)?.get()?;
        chunk[index % MEMO_CHUNK].get()
    }
    fn slot(&self, index: usize) -> &OnceCell<Value> {
        let chunks = self.chunks.get_or_init(|| {
            (0..self.len.div_ceil(MEMO_CHUNK))
                .map(|_| OnceCell::new())
                .collect()
        });
        let chunk = chunks[index / MEMO_CHUNK]
            .get_or_init(|| (0..MEMO_CHUNK).map(|_| OnceCell::new()).collect());
        &chunk[index % MEMO_CHUNK]
    }
    fn set(&self, index: usize, value: Value) {
        let _ = self.slot(index).set(value);
    }
    fn get_or_try_init(
        &self,
        index: usize,
        f: impl FnOnce() -> AplResult<Value>,
    ) -> AplResult<Value> {
        self.slot(index).get_or_try_init(f).cloned()
    }
}

/// Reduce every window of `|size|` consecutive elements along an axis
///
/// A negative size folds each window from its last element to its first. A
/// size of 0 gives `n + 1` identities, and a size of `n + 1` gives an empty
/// axis.
pub fn nwise_reduce(
    f: FunctionRef,
    size: i64,
    source: &Value,
    axis: usize,
    env: &Env,
) -> AplResult<Value> {
    let dims = source.dimensions();
    dims.validate_axis(axis, env)?;
    let n = dims[axis];
    let width = size.unsigned_abs() as usize;
    if size.unsigned_abs() > n as u64 + 1 {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Window size {size} is too large for an axis of length {n}"),
        ));
    }
    let result_len = n + 1 - width;
    let result_dims = dims.replace(axis, result_len, env)?;
    if width == 0 {
        let identity = identity(&f, env)?;
        return Ok(Value::Array(Array::new(ConstantArray::new(
            result_dims,
            identity,
        ))));
    }
    let cache = Memo::new(result_dims.content_size());
    Ok(Value::Array(Array::new(NWise {
        path: fold_path(&f, source),
        f,
        source: source.clone(),
        geometry: AxisGeometry::new(dims, axis),
        width,
        reversed: size < 0,
        result_len,
        dims: result_dims,
        cache,
    })))
}

struct NWise {
    f: FunctionRef,
    source: Value,
    geometry: AxisGeometry,
    width: usize,
    reversed: bool,
    result_len: usize,
    dims: Dimensions,
    path: SpecialisedType,
    cache: Memo,
}

impl NWise {
    fn compute(&self, index: usize, env: &Env) -> AplResult<Value> {
        let geo = self.geometry;
        let inner = index % geo.stride;
        let start = (index / geo.stride) % self.result_len;
        let outer = index / (geo.stride * self.result_len);
        let fold = Fold {
            f: &self.f,
            source: &self.source,
            path: self.path,
        };
        let window = (start..start + self.width).map(|k| geo.join(outer, k, inner, geo.len));
        if self.reversed {
            fold.run(window.rev(), env)
        } else {
            fold.run(window, env)
        }
    }
}

impl ArrayView for NWise {
    fn name(&self) -> &'static str {
        "n-wise reduce"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        self.cache.get_or_try_init(index, || self.compute(index, env))
    }
    fn specialised_type(&self) -> SpecialisedType {
        self.path
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        long_result(self.value_at(index, env)?, env)
    }
}

/// `scan` a value along an axis
///
/// Each result element is the left-to-right fold of the elements up to and
/// including its position. Computed prefixes are cached and extended.
pub fn scan(f: FunctionRef, source: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    if source.rank() == 0 {
        return Ok(source.clone());
    }
    let dims = source.dimensions();
    dims.validate_axis(axis, env)?;
    let cache = Memo::new(source.size());
    Ok(Value::Array(Array::new(Scanned {
        f,
        source: source.clone(),
        geometry: AxisGeometry::new(dims, axis),
        cache,
    })))
}

struct Scanned {
    f: FunctionRef,
    source: Value,
    geometry: AxisGeometry,
    cache: Memo,
}

impl ArrayView for Scanned {
    fn name(&self) -> &'static str {
        "scan"
    }
    fn dimensions(&self) -> &Dimensions {
        self.source.dimensions()
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        if let Some(value) = self.cache.get(index) {
            return Ok(value.clone());
        }
        let geo = self.geometry;
        let (outer, coord, inner) = geo.split(index);
        let at = |k: usize| geo.join(outer, k, inner, geo.len);
        // Walk back to the longest prefix already computed
        let mut k = coord;
        let mut acc = loop {
            if let Some(value) = self.cache.get(at(k)) {
                break value.clone();
            }
            if k == 0 {
                let first = self.source.value_at(at(0), env)?;
                self.cache.set(at(0), first.clone());
                break first;
            }
            k -= 1;
        };
        for k in k + 1..=coord {
            env.check_interrupted()?;
            let x = self.source.value_at(at(k), env)?;
            acc = self.f.eval2(&acc, &x, env)?;
            // A racing writer stores an equal value
            self.cache.set(at(k), acc.clone());
        }
        Ok(acc)
    }
}
