//! The lazy array abstraction
//!
//! Every array is an [`ArrayView`] behind a shared [`Array`] handle. Most
//! views compute their elements on demand from the values they wrap, so
//! array operations compose without copying. Only [`Array::collapse`] and
//! its variants copy elements into storage.

use std::{fmt, sync::Arc};

use ecow::EcoVec;

use crate::{
    storage::{self, DoubleArray, LongArray},
    AplResult, Dimensions, Env, Value,
};

/// The element representation an array can produce without boxing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecialisedType {
    #[default]
    Generic,
    Long,
    Double,
}

/// Borrowed access to an array's backing storage
#[derive(Clone, Copy)]
pub enum Storage<'a> {
    Long(&'a EcoVec<i64>),
    Double(&'a EcoVec<f64>),
    Generic(&'a EcoVec<Value>),
}

/// The behavior of one kind of array
///
/// Implementors may assume that `index` is in bounds, because [`Array`]
/// checks it before delegating.
pub trait ArrayView: Send + Sync {
    /// A short name used in diagnostics
    fn name(&self) -> &'static str;
    fn dimensions(&self) -> &Dimensions;
    /// Get the element at a flat index
    fn value_at(&self, index: usize, env: &Env) -> AplResult<Value>;
    fn specialised_type(&self) -> SpecialisedType {
        SpecialisedType::Generic
    }
    /// Get an element as a long
    ///
    /// Overrides must agree with [`ArrayView::value_at`]. An overflowed
    /// element is reported as an arithmetic overflow error carrying the
    /// exact value.
    fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        self.value_at(index, env)?.ensure_long(env)
    }
    fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        self.value_at(index, env)?.ensure_double(env)
    }
    /// The value this view reshapes, if it is a plain reshape
    fn resize_source(&self) -> Option<&Value> {
        None
    }
    /// The backing storage, if the view is storage
    fn storage(&self) -> Option<Storage<'_>> {
        None
    }
}

/// A shared handle to an array
#[derive(Clone)]
pub struct Array(Arc<dyn ArrayView>);

impl Array {
    pub fn new(view: impl ArrayView + 'static) -> Self {
        log::trace!("constructing {} of shape {}", view.name(), view.dimensions());
        Array(Arc::new(view))
    }
    pub fn name(&self) -> &'static str {
        self.0.name()
    }
    pub fn dimensions(&self) -> &Dimensions {
        self.0.dimensions()
    }
    pub fn size(&self) -> usize {
        self.dimensions().content_size()
    }
    pub fn rank(&self) -> usize {
        self.dimensions().rank()
    }
    pub fn specialised_type(&self) -> SpecialisedType {
        self.0.specialised_type()
    }
    pub fn storage(&self) -> Option<Storage<'_>> {
        self.0.storage()
    }
    pub fn resize_source(&self) -> Option<&Value> {
        self.0.resize_source()
    }
    /// Check if two handles refer to the same view
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
    fn check_index(&self, index: usize, env: &Env) -> AplResult {
        let size = self.size();
        if index >= size {
            return Err(env.index_error(index, size));
        }
        Ok(())
    }
    /// Get the element at a flat index
    pub fn value_at(&self, index: usize, env: &Env) -> AplResult<Value> {
        self.check_index(index, env)?;
        self.0.value_at(index, env)
    }
    pub fn value_at_long(&self, index: usize, env: &Env) -> AplResult<i64> {
        self.check_index(index, env)?;
        self.0.value_at_long(index, env)
    }
    pub fn value_at_double(&self, index: usize, env: &Env) -> AplResult<f64> {
        self.check_index(index, env)?;
        self.0.value_at_double(index, env)
    }
    /// Check if the array is storage whose elements need no forcing
    fn is_collapsed(&self) -> bool {
        match self.storage() {
            Some(Storage::Long(_) | Storage::Double(_)) => true,
            Some(Storage::Generic(values)) => values.iter().all(|v| !v.is_array()),
            None => false,
        }
    }
    /// Force the array and all nested arrays into storage
    ///
    /// Elements are computed in index order. A position that overflows the
    /// long accessor is read again through [`Array::value_at`].
    pub fn collapse(&self, env: &Env) -> AplResult<Array> {
        if self.is_collapsed() {
            return Ok(self.clone());
        }
        self.collapse_with(true, env)
    }
    /// Force the array into storage, leaving nested arrays lazy
    pub fn collapse_shallow(&self, env: &Env) -> AplResult<Array> {
        if self.storage().is_some() {
            return Ok(self.clone());
        }
        self.collapse_with(false, env)
    }
    fn collapse_with(&self, deep: bool, env: &Env) -> AplResult<Array> {
        let dims = self.dimensions().clone();
        let size = env.validate_size(&dims)?;
        match self.specialised_type() {
            SpecialisedType::Long => {
                let mut data = EcoVec::with_capacity(size);
                for i in 0..size {
                    env.check_interrupted()?;
                    match self.value_at_long(i, env) {
                        Ok(n) => data.push(n),
                        Err(e) if e.is_overflow() => {
                            log::debug!(
                                "collapse of {} overflowed at {i}, continuing generically",
                                self.name()
                            );
                            let mut values = Vec::with_capacity(size);
                            values.extend(data.iter().map(|&n| Value::Long(n)));
                            return self.collapse_generic(i, values, deep, env);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Ok(Array::new(LongArray::new(dims, data)))
            }
            SpecialisedType::Double => {
                let mut data = EcoVec::with_capacity(size);
                for i in 0..size {
                    env.check_interrupted()?;
                    data.push(self.value_at_double(i, env)?);
                }
                Ok(Array::new(DoubleArray::new(dims, data)))
            }
            SpecialisedType::Generic => {
                self.collapse_generic(0, Vec::with_capacity(size), deep, env)
            }
        }
    }
    fn collapse_generic(
        &self,
        start: usize,
        mut values: Vec<Value>,
        deep: bool,
        env: &Env,
    ) -> AplResult<Array> {
        for i in start..self.size() {
            env.check_interrupted()?;
            let value = self.value_at(i, env)?;
            values.push(if deep { value.collapse(env)? } else { value });
        }
        Ok(storage::values_with_dimensions(
            self.dimensions().clone(),
            values,
        ))
    }
    /// Compute every element in index order, discarding the results
    pub fn collapse_discard(&self, env: &Env) -> AplResult {
        if self.is_collapsed() {
            return Ok(());
        }
        for i in 0..self.size() {
            env.check_interrupted()?;
            self.value_at(i, env)?.collapse_discard(env)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array of shape {}", self.dimensions())
    }
}
