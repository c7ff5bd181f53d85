//! Enclose, disclose and split

use crate::{
    algorithm::{max_shape, AxisGeometry, StridedSlice},
    array::{Array, ArrayView},
    storage::ConstantArray,
    AplResult, Dimensions, Env, Value,
};

/// `enclose` a value in a rank-0 array
///
/// Single values are their own enclosure.
pub fn enclose(value: &Value) -> Value {
    match value {
        Value::Array(_) => Value::Array(Array::new(ConstantArray::new(
            Dimensions::scalar(),
            value.clone(),
        ))),
        _ => value.clone(),
    }
}

/// `disclose` an array of values into one array of higher rank
///
/// The trailing shape of the result is the per-axis maximum of the shapes of
/// the elements, aligned at their last axes. Positions outside an element's
/// own shape hold that element's default value. A rank-0 array discloses to
/// its element.
pub fn disclose(value: &Value, env: &Env) -> AplResult<Value> {
    let Value::Array(array) = value else {
        return Ok(value.clone());
    };
    if array.rank() == 0 {
        return array.value_at(0, env);
    }
    let elements = value.to_values(env)?;
    if !elements.iter().any(Value::is_array) {
        return Ok(value.clone());
    }
    let common = (elements.iter()).fold(Vec::new(), |acc, e| max_shape(&acc, e.dimensions()));
    let cell = Dimensions::from(common);
    let dims = array.dimensions().concat(&cell);
    env.validate_size(&dims)?;
    log::debug!("Disclosing {} elements into shape {dims}", elements.len());
    Ok(Value::Array(Array::new(Disclosed {
        cell_size: cell.content_size(),
        elements,
        cell,
        dims,
    })))
}

struct Disclosed {
    elements: Vec<Value>,
    cell: Dimensions,
    cell_size: usize,
    dims: Dimensions,
}

impl ArrayView for Disclosed {
    fn name(&self) -> &'static str {
        "disclose"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        let element = &self.elements[index / self.cell_size];
        let position = self.cell.position_from_index(index % self.cell_size);
        let element_dims = element.dimensions();
        let offset = self.cell.rank() - element_dims.rank();
        let mut source_index = 0;
        for (axis, &c) in position.iter().enumerate() {
            let size = if axis < offset {
                1
            } else {
                element_dims[axis - offset]
            };
            if c >= size {
                return element.default_value(env);
            }
            if axis >= offset {
                source_index += c * element_dims.multiplier(axis - offset);
            }
        }
        element.value_at(source_index, env)
    }
}

/// `split` a value into vectors along an axis
///
/// The result has the source's shape with the axis removed. Each element is
/// the vector of source elements along the axis at that position.
pub fn split(source: &Value, axis: usize, env: &Env) -> AplResult<Value> {
    if source.rank() == 0 {
        return Ok(source.clone());
    }
    let dims = source.dimensions().remove(axis, env)?;
    Ok(Value::Array(Array::new(Split {
        source: source.clone(),
        geometry: AxisGeometry::new(source.dimensions(), axis),
        dims,
    })))
}

struct Split {
    source: Value,
    geometry: AxisGeometry,
    dims: Dimensions,
}

impl ArrayView for Split {
    fn name(&self) -> &'static str {
        "split"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, _env: &Env) -> AplResult<Value> {
        let geo = self.geometry;
        let (outer, inner) = (index / geo.stride, index % geo.stride);
        let start = geo.join(outer, 0, inner, geo.len);
        Ok(Value::Array(Array::new(StridedSlice::new(
            self.source.clone(),
            start,
            geo.stride,
            geo.len,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::structure::reshape;

    #[test]
    fn enclose_nests_arrays_only() {
        let env = Env::default();
        assert!(matches!(enclose(&Value::Long(3)), Value::Long(3)));
        let v = Value::longs([1, 2]);
        let e = enclose(&v);
        assert_eq!(e.rank(), 0);
        let inner = e.value_at(0, &env).unwrap();
        assert!(inner.as_array().unwrap().ptr_eq(v.as_array().unwrap()));
        let d = disclose(&e, &env).unwrap();
        assert!(d.as_array().unwrap().ptr_eq(v.as_array().unwrap()));
    }

    #[test]
    fn disclose_ragged_vectors() {
        let env = Env::default();
        let ragged = Value::list([Value::longs([1, 2]), Value::longs([3]), Value::Long(4)]);
        let d = disclose(&ragged, &env).unwrap();
        assert_eq!(d.dimensions(), &[3, 2]);
        assert_eq!(d.to_longs(&env).unwrap(), [1, 2, 3, 0, 4, 0]);
    }

    #[test]
    fn disclose_fills_with_each_elements_default() {
        let env = Env::default();
        let words = Value::list([Value::string("ab"), Value::string("c")]);
        let d = disclose(&words, &env).unwrap();
        assert!(matches!(d.value_at(3, &env), Ok(Value::Char(' '))));
    }

    #[test]
    fn disclose_aligns_trailing_axes() {
        let env = Env::default();
        let m = reshape(&Value::longs([2, 2]), &Value::longs([1, 2, 3, 4]), &env).unwrap();
        let mixed = Value::list([m, Value::longs([9])]);
        let d = disclose(&mixed, &env).unwrap();
        assert_eq!(d.dimensions(), &[2, 2, 2]);
        assert_eq!(d.to_longs(&env).unwrap(), [1, 2, 3, 4, 9, 0, 0, 0]);
    }

    #[test]
    fn disclose_simple_array_is_identity() {
        let env = Env::default();
        let v = Value::longs([1, 2]);
        let d = disclose(&v, &env).unwrap();
        assert!(d.as_array().unwrap().ptr_eq(v.as_array().unwrap()));
    }

    #[test]
    fn split_along_axes() {
        let env = Env::default();
        let m = reshape(&Value::longs([2, 3]), &Value::longs(1..=6), &env).unwrap();
        let rows = split(&m, 1, &env).unwrap();
        assert_eq!(rows.dimensions(), &[2]);
        let row = rows.value_at(1, &env).unwrap();
        assert_eq!(row.to_longs(&env).unwrap(), [4, 5, 6]);
        let columns = split(&m, 0, &env).unwrap();
        assert_eq!(columns.dimensions(), &[3]);
        let column = columns.value_at(2, &env).unwrap();
        assert_eq!(column.to_longs(&env).unwrap(), [3, 6]);
        let again = disclose(&columns, &env).unwrap();
        assert_eq!(again.to_longs(&env).unwrap(), [1, 4, 2, 5, 3, 6]);
    }
}
