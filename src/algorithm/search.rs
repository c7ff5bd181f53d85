//! Membership, find, index of, unique and intersection
//!
//! Lookups go through [`ValueKey`]s, so `2`, `2.0` and an enclosed `2` are
//! all found by one another.

use std::collections::{HashMap, HashSet};

use crate::{
    array::{Array, ArrayView, SpecialisedType},
    storage::values_with_dimensions,
    AplResult, Dimensions, Env, ErrorKind, Value, ValueKey,
};

fn keys_of(value: &Value, env: &Env) -> AplResult<Vec<ValueKey>> {
    (0..value.size())
        .map(|i| {
            env.check_interrupted()?;
            value.value_at(i, env)?.make_key(env)
        })
        .collect()
}

fn require_list(value: &Value, what: &str, env: &Env) -> AplResult {
    if value.rank() > 1 {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("{what} requires a scalar or vector, but got shape {}", value.dimensions()),
        ));
    }
    Ok(())
}

/// Check which elements of `elements` are `member`s of `of`
///
/// The result has the shape of `elements` and holds 1 for every element that
/// occurs anywhere in `of`.
pub fn member(elements: &Value, of: &Value, env: &Env) -> AplResult<Value> {
    let set: HashSet<ValueKey> = keys_of(of, env)?.into_iter().collect();
    if !elements.is_array() {
        return Ok(Value::from(set.contains(&elements.make_key(env)?)));
    }
    Ok(Value::Array(Array::new(Membership {
        source: elements.clone(),
        set,
    })))
}

struct Membership {
    source: Value,
    set: HashSet<ValueKey>,
}

impl ArrayView for Membership {
    fn name(&self) -> &'static str {
        "member"
    }
    fn dimensions(&self) -> &Dimensions {
        self.source.dimensions()
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        Ok(Value::Long(self.value_at_long(index, env)?))
    }
    fn specialised_type(&self) -> SpecialisedType {
        SpecialisedType::Long
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        let key = self.source.value_at(index, env)?.make_key(env)?;
        Ok(self.set.contains(&key) as i64)
    }
}

/// `find` occurrences of a pattern in a source
///
/// The result has the shape of the source and holds 1 at every position where
/// a copy of the pattern begins. A pattern of lower rank is matched as if it
/// had leading axes of size 1.
pub fn find(pattern: &Value, source: &Value, env: &Env) -> AplResult<Value> {
    let source_dims = source.dimensions();
    if pattern.rank() > source_dims.rank() {
        let zeros = vec![Value::Long(0); source.size()];
        return Ok(Value::Array(values_with_dimensions(source_dims.clone(), zeros)));
    }
    let padding = source_dims.rank() - pattern.rank();
    let pattern_dims = Dimensions::new(
        std::iter::repeat(1)
            .take(padding)
            .chain(pattern.dimensions().iter().copied()),
    );
    let pattern_values = pattern.to_values(env)?;
    if source_dims.is_scalar() {
        let found = pattern_values[0].compare_equals(source, env)?;
        return Ok(Value::from(found));
    }
    Ok(Value::Array(Array::new(Find {
        source: source.clone(),
        pattern: pattern_values,
        pattern_dims,
    })))
}

struct Find {
    source: Value,
    pattern: Vec<Value>,
    pattern_dims: Dimensions,
}

impl ArrayView for Find {
    fn name(&self) -> &'static str {
        "find"
    }
    fn dimensions(&self) -> &Dimensions {
        self.source.dimensions()
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        Ok(Value::Long(self.value_at_long(index, env)?))
    }
    fn specialised_type(&self) -> SpecialisedType {
        SpecialisedType::Long
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        let dims = self.source.dimensions();
        let start = dims.position_from_index(index);
        let fits = (start.iter())
            .zip(self.pattern_dims.iter())
            .zip(dims.iter())
            .all(|((&s, &p), &d)| s + p <= d);
        if !fits {
            return Ok(0);
        }
        for (i, expected) in self.pattern.iter().enumerate() {
            let offset = self.pattern_dims.position_from_index(i);
            let source_index: usize = (start.iter())
                .zip(offset.iter())
                .zip(dims.multipliers())
                .map(|((s, o), m)| (s + o) * m)
                .sum();
            if !self.source.value_at(source_index, env)?.compare_equals(expected, env)? {
                return Ok(0);
            }
        }
        Ok(1)
    }
}

/// Get the `index of` each element of `elements` in the list `of`
///
/// Elements that do not occur get the length of `of`.
pub fn index_of(of: &Value, elements: &Value, env: &Env) -> AplResult<Value> {
    require_list(of, "Index of", env)?;
    let mut indices: HashMap<ValueKey, usize> = HashMap::new();
    for (i, key) in keys_of(of, env)?.into_iter().enumerate() {
        indices.entry(key).or_insert(i);
    }
    let missing = of.size();
    if !elements.is_array() {
        let key = elements.make_key(env)?;
        return Ok(Value::from(indices.get(&key).copied().unwrap_or(missing)));
    }
    Ok(Value::Array(Array::new(IndexOf {
        source: elements.clone(),
        indices,
        missing,
    })))
}

struct IndexOf {
    source: Value,
    indices: HashMap<ValueKey, usize>,
    missing: usize,
}

impl ArrayView for IndexOf {
    fn name(&self) -> &'static str {
        "index of"
    }
    fn dimensions(&self) -> &Dimensions {
        self.source.dimensions()
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        Ok(Value::Long(self.value_at_long(index, env)?))
    }
    fn specialised_type(&self) -> SpecialisedType {
        SpecialisedType::Long
    }
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        let key = self.source.value_at(index, env)?.make_key(env)?;
        let found = self.indices.get(&key).copied().unwrap_or(self.missing);
        Ok(found as i64)
    }
}

/// The `unique` elements of a list, in order of first occurrence
pub fn unique(source: &Value, env: &Env) -> AplResult<Value> {
    require_list(source, "Unique", env)?;
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for i in 0..source.size() {
        env.check_interrupted()?;
        let value = source.value_at(i, env)?;
        if seen.insert(value.make_key(env)?) {
            values.push(value);
        }
    }
    Ok(Value::Array(values_with_dimensions(
        Dimensions::vector(values.len()),
        values,
    )))
}

/// The elements of `a` that also occur in `b`, in the order of `a`
pub fn intersection(a: &Value, b: &Value, env: &Env) -> AplResult<Value> {
    require_list(a, "Intersection", env)?;
    require_list(b, "Intersection", env)?;
    let set: HashSet<ValueKey> = keys_of(b, env)?.into_iter().collect();
    let mut values = Vec::new();
    for i in 0..a.size() {
        let value = a.value_at(i, env)?;
        if set.contains(&value.make_key(env)?) {
            values.push(value);
        }
    }
    Ok(Value::Array(values_with_dimensions(
        Dimensions::vector(values.len()),
        values,
    )))
}
