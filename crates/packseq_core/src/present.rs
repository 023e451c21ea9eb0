use crate::{
    compat::*,
    error::{PackSeqError, PackSeqResult},
};
use smallvec::SmallVec;

/// Present represents the presence mask of one timestep: an ordered sequence
/// of booleans, one per logical sequence slot, where `true` marks a slot that
/// contributes a chunk to the packed vector at that timestep.
///
/// This struct provides a type-safe wrapper around the raw boolean mask and
/// includes the slotwise operations the batch transforms are built from.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Present {
    slots: SmallVec<[bool; 8]>,
}

impl Present {
    /// Creates a new mask from a slice of slot flags.
    #[inline]
    pub fn new(slots: &[bool]) -> Self {
        Self {
            slots: SmallVec::from_slice(slots),
        }
    }

    /// Returns the total number of logical slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the mask has no slots at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the number of present (`true`) slots.
    #[inline]
    pub fn num_present(&self) -> usize {
        self.slots.iter().filter(|&&p| p).count()
    }

    /// Returns the flag for slot `i`, or `None` if out of range.
    #[inline]
    pub fn get(&self, i: usize) -> Option<bool> {
        self.slots.get(i).copied()
    }

    /// Returns the mask as a slice of booleans.
    #[inline]
    pub fn as_slice(&self) -> &[bool] {
        &self.slots
    }

    /// Iterates over the slot flags in slot-index order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.slots.iter().copied()
    }

    /// Computes the slotwise AND of two masks of equal length.
    pub fn intersect(&self, other: &Present) -> PackSeqResult<Present> {
        if self.len() != other.len() {
            return Err(PackSeqError::PresentLengthMismatch {
                expected: self.len(),
                got: other.len(),
            });
        }
        Ok(self.iter().zip(other.iter()).map(|(a, b)| a && b).collect())
    }

    /// Returns true if every slot present in `other` is also present in `self`.
    ///
    /// Masks of unequal length are never supersets of each other.
    pub fn is_superset_of(&self, other: &Present) -> bool {
        self.len() == other.len() && other.iter().zip(self.iter()).all(|(o, s)| s || !o)
    }
}

impl core::ops::Index<usize> for Present {
    type Output = bool;

    #[inline]
    fn index(&self, i: usize) -> &bool {
        &self.slots[i]
    }
}

impl From<Vec<bool>> for Present {
    fn from(slots: Vec<bool>) -> Self {
        Self {
            slots: SmallVec::from_vec(slots),
        }
    }
}

impl FromIterator<bool> for Present {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for Present {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}
