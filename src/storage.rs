//! Arrays backed by concrete storage, and the simplest computed arrays

use ecow::EcoVec;

use crate::{
    array::{Array, ArrayView, SpecialisedType, Storage},
    AplResult, Dimensions, Env, Value,
};

/// An array of 64-bit integers
pub struct LongArray {
    dims: Dimensions,
    data: EcoVec<i64>,
}

impl LongArray {
    pub fn new(dims: Dimensions, data: EcoVec<i64>) -> Self {
        debug_assert_eq!(dims.content_size(), data.len());
        LongArray { dims, data }
    }
}

impl ArrayView for LongArray {
    fn name(&self) -> &'static str {
        "long array"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, _env: &Env) -> AplResult<Value> {
        Ok(Value::Long(self.data[index]))
    }
    fn specialised_type(&self) -> SpecialisedType {
        SpecialisedType::Long
    }
    fn value_at_long(&self, index: usize, _env: &Env) -> AplResult<i64> {
        Ok(self.data[index])
    }
    fn value_at_double(&self, index: usize, _env: &Env) -> AplResult<f64> {
        Ok(self.data[index] as f64)
    }
    fn storage(&self) -> Option<Storage<'_>> {
        Some(Storage::Long(&self.data))
    }
}

/// An array of doubles
pub struct DoubleArray {
    dims: Dimensions,
    data: EcoVec<f64>,
}

impl DoubleArray {
    pub fn new(dims: Dimensions, data: EcoVec<f64>) -> Self {
        debug_assert_eq!(dims.content_size(), data.len());
        DoubleArray { dims, data }
    }
}

impl ArrayView for DoubleArray {
    fn name(&self) -> &'static str {
        "double array"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, _env: &Env) -> AplResult<Value> {
        Ok(Value::Double(self.data[index]))
    }
    fn specialised_type(&self) -> SpecialisedType {
        SpecialisedType::Double
    }
    fn value_at_double(&self, index: usize, _env: &Env) -> AplResult<f64> {
        Ok(self.data[index])
    }
    fn storage(&self) -> Option<Storage<'_>> {
        Some(Storage::Double(&self.data))
    }
}

/// An array of arbitrary values
pub struct GenericArray {
    dims: Dimensions,
    data: EcoVec<Value>,
}

impl GenericArray {
    pub fn new(dims: Dimensions, data: EcoVec<Value>) -> Self {
        debug_assert_eq!(dims.content_size(), data.len());
        GenericArray { dims, data }
    }
}

impl ArrayView for GenericArray {
    fn name(&self) -> &'static str {
        "array"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, _env: &Env) -> AplResult<Value> {
        Ok(self.data[index].clone())
    }
    fn storage(&self) -> Option<Storage<'_>> {
        Some(Storage::Generic(&self.data))
    }
}

/// An array whose every element is the same value
pub struct ConstantArray {
    dims: Dimensions,
    value: Value,
}

impl ConstantArray {
    pub fn new(dims: Dimensions, value: Value) -> Self {
        ConstantArray { dims, value }
    }
}

impl ArrayView for ConstantArray {
    fn name(&self) -> &'static str {
        "constant array"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, _index: usize, _env: &Env) -> AplResult<Value> {
        Ok(self.value.clone())
    }
    fn specialised_type(&self) -> SpecialisedType {
        match self.value {
            Value::Long(_) => SpecialisedType::Long,
            Value::Double(_) => SpecialisedType::Double,
            _ => SpecialisedType::Generic,
        }
    }
    fn value_at_long(&self, _index: usize, env: &Env) -> AplResult<i64> {
        self.value.ensure_long(env)
    }
    fn value_at_double(&self, _index: usize, env: &Env) -> AplResult<f64> {
        self.value.ensure_double(env)
    }
}

/// The vector `0 1 2 … n-1`
pub struct IotaArray {
    dims: Dimensions,
}

impl IotaArray {
    pub fn new(n: usize) -> Self {
        IotaArray {
            dims: Dimensions::vector(n),
        }
    }
}

impl ArrayView for IotaArray {
    fn name(&self) -> &'static str {
        "iota"
    }
    fn dimensions(&self) -> &Dimensions {
        &self.dims
    }
    fn value_at(&self, index: usize, _env: &Env) -> AplResult<Value> {
        Ok(Value::from(index))
    }
    fn specialised_type(&self) -> SpecialisedType {
        SpecialisedType::Long
    }
    fn value_at_long(&self, index: usize, _env: &Env) -> AplResult<i64> {
        Ok(index as i64)
    }
    fn value_at_double(&self, index: usize, _env: &Env) -> AplResult<f64> {
        Ok(index as f64)
    }
}

pub fn long_vector(data: impl IntoIterator<Item = i64>) -> Array {
    let data: EcoVec<i64> = data.into_iter().collect();
    Array::new(LongArray::new(Dimensions::vector(data.len()), data))
}

pub fn double_vector(data: impl IntoIterator<Item = f64>) -> Array {
    let data: EcoVec<f64> = data.into_iter().collect();
    Array::new(DoubleArray::new(Dimensions::vector(data.len()), data))
}

/// Store values, using specialised storage when they are all longs or all doubles
pub fn values_with_dimensions(dims: Dimensions, values: Vec<Value>) -> Array {
    if values.iter().all(|v| matches!(v, Value::Long(_))) {
        let data = values
            .iter()
            .map(|v| match v {
                Value::Long(n) => *n,
                _ => 0,
            })
            .collect();
        return Array::new(LongArray::new(dims, data));
    }
    if values.iter().all(|v| matches!(v, Value::Double(_))) {
        let data = values
            .iter()
            .map(|v| match v {
                Value::Double(d) => *d,
                _ => 0.0,
            })
            .collect();
        return Array::new(DoubleArray::new(dims, data));
    }
    Array::new(GenericArray::new(dims, values.into_iter().collect()))
}

/// A scalar value as a rank-0 array
///
/// Single values are returned unchanged.
pub fn scalar_array(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        value => Value::Array(Array::new(ConstantArray::new(Dimensions::scalar(), value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_selection() {
        let env = Env::default();
        let longs = values_with_dimensions(
            Dimensions::from([2, 2]),
            vec![1i64.into(), 2i64.into(), 3i64.into(), 4i64.into()],
        );
        assert_eq!(longs.specialised_type(), SpecialisedType::Long);
        assert_eq!(longs.value_at_double(3, &env).unwrap(), 4.0);
        let mixed = values_with_dimensions(
            Dimensions::vector(2),
            vec![Value::Long(1), Value::Double(2.0)],
        );
        assert_eq!(mixed.specialised_type(), SpecialisedType::Generic);
        assert_eq!(mixed.value_at_long(1, &env).unwrap(), 2);
    }

    #[test]
    fn constant_and_iota() {
        let env = Env::default();
        let c = Array::new(ConstantArray::new(Dimensions::from([2, 3]), Value::Double(0.5)));
        assert_eq!(c.specialised_type(), SpecialisedType::Double);
        assert_eq!(c.value_at_double(5, &env).unwrap(), 0.5);
        let iota = Array::new(IotaArray::new(4));
        assert_eq!(Value::Array(iota).to_longs(&env).unwrap(), [0, 1, 2, 3]);
    }
}
