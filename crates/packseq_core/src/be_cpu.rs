//! Reference CPU backend for the vector collaborator traits.

use crate::{
    compat::*,
    error::{PackSeqError, PackSeqResult},
    vector::{Vector, VectorCreator},
};
use core::marker::PhantomData;
use num_traits::Float;

/// Creator for [`CpuVector`]s of element type `T`.
#[derive(Clone, Copy)]
pub struct CpuCreator<T: Float> {
    _marker: PhantomData<T>,
}

impl<T: Float> CpuCreator<T> {
    /// Creates a new CPU vector creator.
    pub fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T: Float> Default for CpuCreator<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A flat vector of floats held in host memory.
#[derive(Clone, PartialEq)]
pub struct CpuVector<T: Float> {
    data: Vec<T>,
}

impl<T: Float> CpuVector<T> {
    /// Creates a vector by copying the given elements.
    pub fn from_slice(data: &[T]) -> Self {
        Self { data: data.to_vec() }
    }

    /// Returns the elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

impl<T: Float + fmt::Debug> fmt::Debug for CpuVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.data.iter()).finish()
    }
}

impl<T: Float> Vector for CpuVector<T> {
    type Creator = CpuCreator<T>;

    fn creator(&self) -> CpuCreator<T> {
        CpuCreator::new()
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            data: self.data[start..end].to_vec(),
        }
    }

    fn add(&self, other: &Self) -> PackSeqResult<Self> {
        if self.len() != other.len() {
            return Err(PackSeqError::SizeMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        Ok(Self {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| a + b)
                .collect(),
        })
    }
}

impl<T: Float> VectorCreator for CpuCreator<T> {
    type Vector = CpuVector<T>;

    fn make_vector(&self, len: usize) -> CpuVector<T> {
        CpuVector {
            data: vec![T::zero(); len],
        }
    }

    fn concat(&self, parts: &[CpuVector<T>]) -> CpuVector<T> {
        let total: usize = parts.iter().map(|p| p.len()).sum();
        let mut data = Vec::with_capacity(total);
        for part in parts {
            data.extend_from_slice(&part.data);
        }
        CpuVector { data }
    }
}
