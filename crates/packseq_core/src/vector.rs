//! Flat numeric vector collaborator traits.
//!
//! The batch transforms never look inside a vector; they only slice, zero,
//! concatenate, and (for gradient accumulation) add them. Backends supply a
//! concrete vector type and its creator through this pair of traits.

use crate::error::PackSeqResult;

/// A flat, contiguous numeric vector with value semantics.
///
/// Cloning is expected to be cheap enough to treat vectors as copy-on-transform
/// values; no operation in this crate mutates a vector in place.
pub trait Vector: Clone {
    /// The factory type that allocates vectors compatible with this one.
    type Creator: VectorCreator<Vector = Self>;

    /// Returns the creator that can allocate more vectors like this one.
    fn creator(&self) -> Self::Creator;

    /// Returns the number of elements.
    fn len(&self) -> usize;

    /// Returns true if the vector has no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the elements in `start..end`.
    fn slice(&self, start: usize, end: usize) -> Self;

    /// Returns the elementwise sum of two vectors of equal length.
    ///
    /// Fails with [`PackSeqError::SizeMismatch`](crate::error::PackSeqError)
    /// on unequal lengths.
    fn add(&self, other: &Self) -> PackSeqResult<Self>;
}

/// Factory for a backend's vector type.
pub trait VectorCreator: Clone {
    /// The vector type this creator allocates.
    type Vector: Vector<Creator = Self>;

    /// Allocates a zero-filled vector of the given length.
    fn make_vector(&self, len: usize) -> Self::Vector;

    /// Concatenates the given vectors into one new contiguous vector.
    fn concat(&self, parts: &[Self::Vector]) -> Self::Vector;
}
