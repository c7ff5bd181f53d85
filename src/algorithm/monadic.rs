//! Iota, deal, where, inverse where, grade and sort

use std::{cell::RefCell, cmp::Ordering};

use rand::{rngs::SmallRng, seq::index, Rng, SeedableRng};

use crate::{
    algorithm::major_cell,
    array::{Array, ArrayView, SpecialisedType},
    storage::{long_vector, values_with_dimensions, IotaArray, LongArray},
    AplError, AplResult, Dimensions, Env, ErrorKind, Value,
};

/// `iota`: the vector `0 1 2 … n-1`
pub fn iota(n: &Value, env: &Env) -> AplResult<Value> {
    let n = n.ensure_index(env)?;
    env.validate_size(&Dimensions::vector(n))?;
    Ok(Value::Array(Array::new(IotaArray::new(n))))
}

thread_local! {
    static RNG: RefCell<SmallRng> = RefCell::new(SmallRng::from_entropy());
}

/// `deal` `count` distinct integers from `0..n` in random order
pub fn deal(count: &Value, n: &Value, env: &Env) -> AplResult<Value> {
    RNG.with(|rng| deal_with_rng(count, n, &mut *rng.borrow_mut(), env))
}

/// Like [`deal`], but drawing from the given generator
pub fn deal_with_rng(count: &Value, n: &Value, rng: &mut impl Rng, env: &Env) -> AplResult<Value> {
    let count = count.ensure_index(env)?;
    let n = n.ensure_index(env)?;
    if count > n {
        return Err(env.error(
            ErrorKind::Domain,
            format!("Cannot deal {count} distinct values from {n}"),
        ));
    }
    let picked = index::sample(rng, n, count).into_vec();
    Ok(Value::Array(long_vector(picked.into_iter().map(|i| i as i64))))
}

/// `where`: the coordinates of every position, repeated by its count
///
/// Vectors give a vector of indices. Higher ranks give a vector of
/// coordinate vectors.
pub fn where_(counts: &Value, env: &Env) -> AplResult<Value> {
    let dims = counts.dimensions();
    let mut total: usize = 0;
    let mut repeats = Vec::with_capacity(counts.size());
    for i in 0..counts.size() {
        let n = counts.value_at(i, env)?.ensure_index(env)?;
        total = total.saturating_add(n);
        repeats.push(n);
    }
    env.validate_size(&Dimensions::vector(total))?;
    if dims.rank() <= 1 {
        let indices = (repeats.iter().enumerate())
            .flat_map(|(i, &n)| std::iter::repeat(i as i64).take(n));
        return Ok(Value::Array(long_vector(indices)));
    }
    let mut coordinates = Vec::with_capacity(total);
    for (i, &n) in repeats.iter().enumerate() {
        if n == 0 {
            continue;
        }
        let position = dims.position_from_index(i);
        let coordinate = Value::Array(long_vector(position.iter().map(|&c| c as i64)));
        coordinates.extend(std::iter::repeat(coordinate).take(n));
    }
    Ok(Value::Array(values_with_dimensions(
        Dimensions::vector(total),
        coordinates,
    )))
}

/// The inverse of [`where_`]: count how often each coordinate occurs
///
/// The coordinates must be in non-decreasing order. A list of integers gives
/// a vector of counts, and a list of coordinate vectors gives an array with
/// one axis per coordinate.
pub fn inverse_where(coordinates: &Value, env: &Env) -> AplResult<Value> {
    if coordinates.rank() != 1 {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!(
                "Inverse where requires a list of coordinates, but got shape {}",
                coordinates.dimensions()
            ),
        ));
    }
    let mut positions: Vec<Vec<usize>> = Vec::with_capacity(coordinates.size());
    for i in 0..coordinates.size() {
        let element = coordinates.value_at(i, env)?;
        let position = if element.is_array() {
            if element.rank() != 1 {
                return Err(env.error(
                    ErrorKind::Dimensions,
                    format!("Coordinate {i} has shape {}", element.dimensions()),
                ));
            }
            (element.to_values(env)?.iter())
                .map(|c| c.ensure_index(env))
                .collect::<AplResult<Vec<_>>>()?
        } else {
            vec![element.ensure_index(env)?]
        };
        if let Some(prev) = positions.last() {
            if prev.len() != position.len() {
                return Err(env.error(
                    ErrorKind::Dimensions,
                    "All coordinates must have the same length",
                ));
            }
            if *prev > position {
                return Err(env.error(
                    ErrorKind::Domain,
                    format!(
                        "Coordinates must be in non-decreasing order, \
                        but {position:?} follows {prev:?}"
                    ),
                ));
            }
        }
        positions.push(position);
    }
    let rank = positions.first().map_or(1, Vec::len);
    let mut dims = vec![0; rank];
    for position in &positions {
        for (d, &c) in dims.iter_mut().zip(position) {
            *d = (*d).max(c + 1);
        }
    }
    let dims = Dimensions::from(dims);
    let size = env.validate_size(&dims)?;
    let mut counts = vec![0i64; size];
    for position in &positions {
        counts[dims.index_from_position(position, env)?] += 1;
    }
    Ok(Value::Array(Array::new(LongArray::new(
        dims,
        counts.into_iter().collect(),
    ))))
}

/// The major cells of a value, for ordering
fn cells(source: &Value, what: &str, env: &Env) -> AplResult<Vec<Value>> {
    if source.rank() == 0 {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Cannot {what} a scalar"),
        ));
    }
    let count = source.dimensions()[0];
    (0..count).map(|i| major_cell(source, i, env)).collect()
}

fn grade(source: &Value, descending: bool, env: &Env) -> AplResult<Vec<usize>> {
    let cells = cells(source, "grade", env)?;
    let mut order: Vec<usize> = (0..cells.len()).collect();
    let mut error: Option<AplError> = None;
    order.sort_by(|&i, &j| {
        if error.is_some() {
            return Ordering::Equal;
        }
        match cells[i].compare(&cells[j], env) {
            Ok(ord) if descending => ord.reverse(),
            Ok(ord) => ord,
            Err(e) => {
                error = Some(e);
                Ordering::Equal
            }
        }
    });
    match error {
        Some(e) => Err(e),
        None => Ok(order),
    }
}

/// `grade up`: the permutation that sorts the major cells ascending
///
/// Equal cells keep their relative order.
pub fn grade_up(source: &Value, env: &Env) -> AplResult<Value> {
    let order = grade(source, false, env)?;
    Ok(Value::Array(long_vector(order.into_iter().map(|i| i as i64))))
}

/// `grade down`: the permutation that sorts the major cells descending
///
/// Equal cells keep their relative order.
pub fn grade_down(source: &Value, env: &Env) -> AplResult<Value> {
    let order = grade(source, true, env)?;
    Ok(Value::Array(long_vector(order.into_iter().map(|i| i as i64))))
}

/// Sort the major cells of a value ascending
pub fn sort_up(source: &Value, env: &Env) -> AplResult<Value> {
    let order = grade(source, false, env)?;
    let dims = source.dimensions().clone();
    let cell_size = dims.multiplier(0);
    Ok(Value::Array(Array::new(Reordered {
        source: source.clone(),
        dims,
        order,
        cell_size,
    })))
}

/// Major cells of a source in a different order
struct Reordered {
    source: Value,
    dims: Dimensions,
    order: Vec<usize>,
    cell_size: usize,
}

impl Reordered {
    fn source_index(&self, index: usize) -> usize {
        let (cell, offset) = (index / self.cell_size, index % self.cell_size);
        self.order[cell] * self.cell_size + offset
    }
}

impl ArrayView for Reordered {
    fn name(&self) -> &'static str {
        "sort"
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::structure::reshape;

    #[test]
    fn iota_is_lazy_longs() {
        let env = Env::default();
        let v = iota(&Value::Long(4), &env).unwrap();
        assert_eq!(v.to_longs(&env).unwrap(), [0, 1, 2, 3]);
        assert_eq!(v.specialised_type(), SpecialisedType::Long);
        let err = iota(&Value::Long(-1), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[test]
    fn deal_is_a_partial_permutation() {
        let env = Env::default();
        let mut rng = SmallRng::seed_from_u64(7);
        let d = deal_with_rng(&Value::Long(5), &Value::Long(10), &mut rng, &env).unwrap();
        let mut picked = d.to_longs(&env).unwrap();
        picked.sort();
        picked.dedup();
        assert_eq!(picked.len(), 5);
        assert!(picked.iter().all(|&i| (0..10).contains(&i)));
        let all = deal(&Value::Long(3), &Value::Long(3), &env).unwrap();
        let mut all = all.to_longs(&env).unwrap();
        all.sort();
        assert_eq!(all, [0, 1, 2]);
        let err = deal(&Value::Long(4), &Value::Long(3), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[test]
    fn where_vector() {
        let env = Env::default();
        let w = where_(&Value::longs([0, 2, 1, 0]), &env).unwrap();
        assert_eq!(w.to_longs(&env).unwrap(), [1, 1, 2]);
        let err = where_(&Value::longs([1, -1]), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
    }

    #[test]
    fn where_matrix_and_back() {
        let env = Env::default();
        let m = reshape(&Value::longs([2, 2]), &Value::longs([0, 1, 2, 0]), &env).unwrap();
        let w = where_(&m, &env).unwrap();
        assert_eq!(w.dimensions(), &[3]);
        assert_eq!(w.value_at(0, &env).unwrap().to_longs(&env).unwrap(), [0, 1]);
        assert_eq!(w.value_at(2, &env).unwrap().to_longs(&env).unwrap(), [1, 0]);
        let back = inverse_where(&w, &env).unwrap();
        assert_eq!(back.dimensions(), &[2, 2]);
        assert_eq!(back.to_longs(&env).unwrap(), [0, 1, 2, 0]);
    }

    #[test]
    fn inverse_where_vector() {
        let env = Env::default();
        let counts = inverse_where(&Value::longs([1, 1, 3]), &env).unwrap();
        assert_eq!(counts.to_longs(&env).unwrap(), [0, 2, 0, 1]);
        let err = inverse_where(&Value::longs([2, 1]), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
        let empty = inverse_where(&Value::longs([]), &env).unwrap();
        assert_eq!(empty.dimensions(), &[0]);
        let far = Value::list([Value::longs([1 << 40, 1 << 40])]);
        let err = inverse_where(&far, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn grades_are_stable() {
        let env = Env::default();
        let v = Value::longs([3, 1, 2, 1]);
        assert_eq!(grade_up(&v, &env).unwrap().to_longs(&env).unwrap(), [1, 3, 2, 0]);
        assert_eq!(grade_down(&v, &env).unwrap().to_longs(&env).unwrap(), [0, 2, 1, 3]);
        let mixed = Value::list([Value::Char('a'), Value::Long(5), Value::Double(-0.5)]);
        assert_eq!(grade_up(&mixed, &env).unwrap().to_longs(&env).unwrap(), [2, 1, 0]);
        let err = grade_up(&Value::Long(1), &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }

    #[test]
    fn sort_rows() {
        let env = Env::default();
        let m = reshape(&Value::longs([3, 2]), &Value::longs([2, 1, 1, 9, 1, 3]), &env).unwrap();
        let sorted = sort_up(&m, &env).unwrap();
        assert_eq!(sorted.to_longs(&env).unwrap(), [1, 3, 1, 9, 2, 1]);
    }
}
