//! Partition and partitioned enclose
//!
//! Both operations cut a source along one axis into parts described by a
//! vector of non-negative markers. They differ only in how the markers
//! describe the cuts, so each has its own boundary scan feeding one shared
//! view.

use crate::{
    algorithm::{AxisGeometry, StridedSlice},
    array::{Array, ArrayView},
    AplResult, Dimensions, Env, ErrorKind, Value,
};

/// A contiguous run of positions along the partitioned axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Part {
    start: usize,
    len: usize,
}

/// `partition` a value along an axis
///
/// A new part starts at every positive marker that is greater than the
/// marker before it. Equal or smaller positive markers continue the current
/// part, and a zero marker excludes its position and ends the current part.
pub fn partition(markers: &Value, source: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    let geometry = partition_axis(source, axis, env)?;
    let markers = read_markers(markers, geometry.len, false, env)?;
    let parts = partition_parts(&markers);
    log::trace!("partition found {} parts", parts.len());
    partitioned(source, axis, geometry, parts, env)
}

fn partition_parts(markers: &[i64]) -> Vec<Part> {
    let mut parts: Vec<Part> = Vec::new();
    let mut prev = 0;
    for (i, &m) in markers.iter().enumerate() {
        if m == 0 {
            prev = 0;
            continue;
        }
        match parts.last_mut() {
            Some(part) if prev != 0 && m <= prev => part.len += 1,
            _ => parts.push(Part { start: i, len: 1 }),
        }
        prev = m;
    }
    parts
}

/// `partitioned enclose` a value along an axis
///
/// A marker of `m > 0` starts `m` new parts at its position, of which all
/// but the last are empty. Zero markers continue the current part, and
/// positions before the first positive marker belong to no part. One more
/// marker than the axis has positions may be given, to add empty parts at
/// the end.
pub fn partitioned_enclose(
    markers: &Value,
    source: &Value,
    axis: usize,
    env: &Env,
) -> AplResult<Value> {
    let geometry = partition_axis(source, axis, env)?;
    let markers = read_markers(markers, geometry.len, true, env)?;
    let parts = enclose_parts(&markers, geometry.len);
    log::trace!("partitioned enclose found {} parts", parts.len());
    partitioned(source, axis, geometry, parts, env)
}

fn enclose_parts(markers: &[i64], axis_len: usize) -> Vec<Part> {
    let mut parts: Vec<Part> = Vec::new();
    for (i, &m) in markers.iter().enumerate() {
        if m > 0 {
            for _ in 0..m {
                parts.push(Part { start: i, len: 0 });
            }
        }
        if i < axis_len {
            if let Some(part) = parts.last_mut() {
                part.len += 1;
            }
        }
    }
    parts
}

fn partition_axis(source: &Value, axis: usize, env: &Env) -> AplResult<AxisGeometry> {
    let dims = source.dimensions();
    if dims.is_scalar() {
        return Err(env.error(ErrorKind::Dimensions, "Cannot partition a scalar"));
    }
    dims.validate_axis(axis, env)?;
    Ok(AxisGeometry::new(dims, axis))
}

fn read_markers(markers: &Value, len: usize, allow_extra: bool, env: &Env) -> AplResult<Vec<i64>> {
    let values = if markers.rank() == 0 {
        vec![markers.ensure_long(env)?; len]
    } else if markers.rank() == 1 {
        markers.to_longs(env)?
    } else {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Partition markers must be a vector, but have shape {}", markers.dimensions()),
        ));
    };
    if values.len() != len && !(allow_extra && values.len() == len + 1) {
        return Err(env.error(
            ErrorKind::Dimensions,
            format!("Expected {len} partition markers, but got {}", values.len()),
        ));
    }
    if let Some(m) = values.iter().find(|&&m| m < 0) {
        return Err(env.error(
            ErrorKind::Domain,
            format!("Partition markers must be non-negative, but got {m}"),
        ));
    }
    Ok(values)
}

fn partitioned(
    source: &Value,
    axis: usize,
    geometry: AxisGeometry,
    parts: Vec<Part>,
    env: &Env,
) -> AplResult<Value> {
    let dims = source.dimensions().replace(axis, parts.len(), env)?;
    Ok(Value::Array(Array::new(Partitioned {
        source: source.clone(),
        geometry,
        parts,
        dims,
    })))
}

/// Each element is one part of one line along the axis
struct Partitioned {
    source: Value,
    geometry: AxisGeometry,
    parts: Vec<Part>,
    dims: Dimensions,
}

impl ArrayView for Partitioned {
    fn name(&self) -> &'static str {
        "partition"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, _env: &Env) -> AplResult<Value> {
        let geo = self.geometry;
        let count = self.parts.len();
        let inner = index % geo.stride;
        let part_index = (index / geo.stride) % count;
        let outer = index / (geo.stride * count);
        let part = self.parts[part_index];
        let start = geo.join(outer, part.start, inner, geo.len);
        Ok(Value::Array(Array::new(StridedSlice::new(
            self.source.clone(),
            start,
            geo.stride,
            part.len,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::structure::reshape;

    fn part(start: usize, len: usize) -> Part {
        Part { start, len }
    }

    #[test]
    fn partition_boundaries() {
        assert_eq!(partition_parts(&[1, 1, 0, 1, 1]), [part(0, 2), part(3, 2)]);
        assert_eq!(partition_parts(&[1, 2, 2, 1, 3]), [part(0, 1), part(1, 3), part(4, 1)]);
        assert_eq!(partition_parts(&[0, 0, 2, 2]), [part(2, 2)]);
        assert_eq!(partition_parts(&[3, 2, 1]), [part(0, 3)]);
        assert_eq!(partition_parts(&[1, 0, 1]), [part(0, 1), part(2, 1)]);
        assert!(partition_parts(&[0, 0, 0]).is_empty());
        assert!(partition_parts(&[]).is_empty());
    }

    #[test]
    fn enclose_boundaries() {
        assert_eq!(enclose_parts(&[1, 0, 1, 0, 0], 5), [part(0, 2), part(2, 3)]);
        assert_eq!(enclose_parts(&[0, 1, 0], 3), [part(1, 2)]);
        assert_eq!(
            enclose_parts(&[2, 0, 1], 3),
            [part(0, 0), part(0, 2), part(2, 1)]
        );
        assert_eq!(enclose_parts(&[1, 1, 1], 3), [part(0, 1), part(1, 1), part(2, 1)]);
        assert_eq!(enclose_parts(&[1, 0, 0, 2], 3), [part(0, 3), part(3, 0), part(3, 0)]);
        assert!(enclose_parts(&[0, 0], 2).is_empty());
    }

    #[test]
    fn partition_characters() {
        let env = Env::default();
        let source = Value::string("abcde");
        let parts = partition(&Value::longs([1, 1, 0, 1, 1]), &source, 0, &env).unwrap();
        assert_eq!(parts.dimensions(), &[2]);
        let second = parts.value_at(1, &env).unwrap();
        let chars: Vec<Value> = second.to_values(&env).unwrap();
        assert!(matches!(chars.as_slice(), [Value::Char('d'), Value::Char('e')]));
    }

    #[test]
    fn partition_matrix_rows() {
        let env = Env::default();
        let m = reshape(&Value::longs([2, 4]), &Value::longs(1..=8), &env).unwrap();
        let parts = partition(&Value::longs([1, 1, 2, 2]), &m, 1, &env).unwrap();
        assert_eq!(parts.dimensions(), &[2, 2]);
        let last = parts.value_at(3, &env).unwrap();
        assert_eq!(last.to_longs(&env).unwrap(), [7, 8]);
        let parts = partition(&Value::longs([1, 0]), &m, 0, &env).unwrap();
        assert_eq!(parts.dimensions(), &[1, 4]);
        assert_eq!(parts.value_at(2, &env).unwrap().to_longs(&env).unwrap(), [3]);
    }

    #[test]
    fn partitioned_enclose_with_empty_parts() {
        let env = Env::default();
        let source = Value::longs(1..=4);
        let parts = partitioned_enclose(&Value::longs([2, 0, 1, 0, 1]), &source, 0, &env).unwrap();
        assert_eq!(parts.dimensions(), &[4]);
        let sizes: Vec<usize> = (0..4)
            .map(|i| parts.value_at(i, &env).unwrap().size())
            .collect();
        assert_eq!(sizes, [0, 2, 2, 0]);
    }

    #[test]
    fn marker_errors() {
        let env = Env::default();
        let source = Value::longs(1..=3);
        let err = partition(&Value::longs([1, 1]), &source, 0, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        let err = partition(&Value::longs([1, -1, 1]), &source, 0, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Domain);
        let err = partition(&Value::longs([1, 1, 1, 1]), &source, 0, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
        let err = partition(&Value::Long(1), &Value::Long(1), 0, &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dimensions);
    }
}
