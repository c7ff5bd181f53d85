use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
};

use serde::{Deserialize, Serialize};
use tinyvec::TinyVec;

use crate::{AplResult, Env, ErrorKind};

type Dims = TinyVec<[usize; 4]>;

/// The shape of an array
///
/// Axis 0 is the slowest-varying axis. The multiplier of an axis is the
/// product of the sizes of all axes after it, so the last axis always has a
/// multiplier of 1.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<usize>", into = "Vec<usize>")]
pub struct Dimensions {
    dims: Dims,
    multipliers: Dims,
}

impl Dimensions {
    /// The dimensions of a scalar
    pub fn scalar() -> Self {
        Self::default()
    }
    /// Create dimensions from axis sizes
    pub fn new(dims: impl IntoIterator<Item = usize>) -> Self {
        let dims: Dims = dims.into_iter().collect();
        let multipliers = multipliers_for(&dims);
        Dimensions { dims, multipliers }
    }
    /// Create dimensions from signed axis sizes, failing on negative sizes
    pub fn from_signed(sizes: &[i64], env: &Env) -> AplResult<Self> {
        let mut dims = Dims::with_capacity(sizes.len());
        for &size in sizes {
            if size < 0 {
                return Err(env.error(
                    ErrorKind::Dimensions,
                    format!("Axis size {size} is negative in {sizes:?}"),
                ));
            }
            dims.push(size as usize);
        }
        let dims = Self::new(dims);
        if dims.checked_content_size().is_none() {
            return Err(env.error(
                ErrorKind::Dimensions,
                format!("Shape {sizes:?} has too many elements"),
            ));
        }
        Ok(dims)
    }
    /// A single-axis shape
    pub fn vector(len: usize) -> Self {
        Self::new([len])
    }
    /// Get the number of axes
    pub fn rank(&self) -> usize {
        self.dims.len()
    }
    /// Check if these are the dimensions of a scalar
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
    /// Get the number of elements
    ///
    /// A scalar has exactly one element. Sizes too large for a `usize`
    /// saturate.
    pub fn content_size(&self) -> usize {
        (self.dims.iter()).fold(1usize, |acc, &d| acc.saturating_mul(d))
    }
    /// Get the number of elements, or `None` if it does not fit in a `usize`
    pub fn checked_content_size(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }
    /// Get the stride of each axis
    pub fn multipliers(&self) -> &[usize] {
        &self.multipliers
    }
    /// Get the stride of one axis
    pub fn multiplier(&self, axis: usize) -> usize {
        self.multipliers[axis]
    }
    /// Get the axis sizes
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }
    /// Get the index of the last axis
    pub fn last_axis(&self, env: &Env) -> AplResult<usize> {
        if self.is_scalar() {
            return Err(env.error(ErrorKind::IllegalAxis, "A scalar has no last axis"));
        }
        Ok(self.rank() - 1)
    }
    /// Make sure `axis` names an axis of these dimensions
    pub fn validate_axis(&self, axis: usize, env: &Env) -> AplResult<usize> {
        if axis >= self.rank() {
            return Err(env.error(
                ErrorKind::IllegalAxis,
                format!("Axis {axis} is out of range for rank {}", self.rank()),
            ));
        }
        Ok(axis)
    }
    /// Convert a flat index into per-axis coordinates
    pub fn position_from_index(&self, index: usize) -> TinyVec<[usize; 4]> {
        let mut position = TinyVec::with_capacity(self.rank());
        let mut rest = index;
        for &m in self.multipliers.iter() {
            // A zero multiplier only occurs beside a zero axis, where no index is valid
            if m == 0 {
                position.push(0);
            } else {
                position.push(rest / m);
                rest %= m;
            }
        }
        position
    }
    /// Convert per-axis coordinates into a flat index
    pub fn index_from_position(&self, position: &[usize], env: &Env) -> AplResult<usize> {
        if position.len() != self.rank() {
            return Err(env.error(
                ErrorKind::Dimensions,
                format!(
                    "Position of rank {} used with dimensions {self}",
                    position.len()
                ),
            ));
        }
        let mut index = 0;
        for ((&c, &d), &m) in position.iter().zip(&self.dims).zip(&self.multipliers) {
            if c >= d {
                return Err(env
                    .error(
                        ErrorKind::IndexOutOfBounds,
                        format!("Position {position:?} is out of bounds for dimensions {self}"),
                    )
                    .with_index(c, d));
            }
            index += c * m;
        }
        Ok(index)
    }
    /// Get the dimensions with one axis removed
    pub fn remove(&self, axis: usize, env: &Env) -> AplResult<Self> {
        self.validate_axis(axis, env)?;
        let mut dims = self.dims.clone();
        dims.remove(axis);
        Ok(Self::new(dims))
    }
    /// Get the dimensions with a new axis inserted before `axis`
    pub fn insert(&self, axis: usize, size: usize, env: &Env) -> AplResult<Self> {
        if axis > self.rank() {
            return Err(env.error(
                ErrorKind::IllegalAxis,
                format!("Cannot insert axis {axis} into rank {}", self.rank()),
            ));
        }
        let mut dims = self.dims.clone();
        dims.insert(axis, size);
        Ok(Self::new(dims))
    }
    /// Get the dimensions with one axis resized
    pub fn replace(&self, axis: usize, size: usize, env: &Env) -> AplResult<Self> {
        self.validate_axis(axis, env)?;
        let mut dims = self.dims.clone();
        dims[axis] = size;
        Ok(Self::new(dims))
    }
    /// Get these dimensions followed by `other`'s
    pub fn concat(&self, other: &Self) -> Self {
        Self::new(self.dims.iter().chain(&other.dims).copied())
    }
    /// Structural equality
    pub fn compare_equals(&self, other: &Self) -> bool {
        self.dims == other.dims
    }
}

fn multipliers_for(dims: &[usize]) -> Dims {
    let mut multipliers: Dims = dims.iter().map(|_| 0).collect();
    let mut acc = 1;
    for (m, &d) in multipliers.iter_mut().zip(dims).rev() {
        *m = acc;
        acc = acc.saturating_mul(d);
    }
    multipliers
}

impl PartialEq for Dimensions {
    fn eq(&self, other: &Self) -> bool {
        self.compare_equals(other)
    }
}

impl Eq for Dimensions {}

impl Hash for Dimensions {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dims.hash(state)
    }
}

impl Deref for Dimensions {
    type Target = [usize];
    fn deref(&self) -> &Self::Target {
        &self.dims
    }
}

impl fmt::Debug for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, " × ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<Vec<usize>> for Dimensions {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

impl From<Dimensions> for Vec<usize> {
    fn from(dims: Dimensions) -> Self {
        dims.dims.to_vec()
    }
}

impl From<&[usize]> for Dimensions {
    fn from(dims: &[usize]) -> Self {
        Self::new(dims.iter().copied())
    }
}

impl<const N: usize> From<[usize; N]> for Dimensions {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims)
    }
}

impl FromIterator<usize> for Dimensions {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<const N: usize> PartialEq<[usize; N]> for Dimensions {
    fn eq(&self, other: &[usize; N]) -> bool {
        self.dims.as_slice() == other.as_slice()
    }
}

impl PartialEq<[usize]> for Dimensions {
    fn eq(&self, other: &[usize]) -> bool {
        self.dims.as_slice() == other
    }
}
