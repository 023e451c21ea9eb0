//! One timestep of a variable-length sequence batch.

use crate::{
    compat::*,
    error::{PackSeqError, PackSeqResult},
    present::Present,
    vector::{Vector, VectorCreator},
};

/// A packed batch: one flat vector holding the data of every present slot at
/// one timestep, in slot-index order, plus the presence mask describing which
/// slots contribute.
///
/// Invariant: `packed.len() == seq_width * present.num_present()`, where
/// `seq_width` is the per-slot chunk width. The width is derived, never
/// stored.
#[derive(Clone, Debug)]
pub struct Batch<V: Vector> {
    packed: V,
    present: Present,
}

impl<V: Vector> Batch<V> {
    /// Creates a batch, validating the length invariant.
    pub fn new(packed: V, present: Present) -> PackSeqResult<Self> {
        let n = present.num_present();
        let valid = if n == 0 {
            packed.is_empty()
        } else {
            packed.len() % n == 0
        };
        if !valid {
            return Err(PackSeqError::InvalidPackedLength {
                len: packed.len(),
                num_present: n,
            });
        }
        Ok(Self { packed, present })
    }

    /// Creates a batch from parts already known to satisfy the invariant.
    pub(crate) fn from_parts(packed: V, present: Present) -> Self {
        Self { packed, present }
    }

    /// Returns the flat packed vector.
    #[inline]
    pub fn packed(&self) -> &V {
        &self.packed
    }

    /// Returns the presence mask.
    #[inline]
    pub fn present(&self) -> &Present {
        &self.present
    }

    /// Returns the number of present slots.
    #[inline]
    pub fn num_present(&self) -> usize {
        self.present.num_present()
    }

    /// Returns the chunk width each present slot occupies in the packed
    /// vector, or 0 for a batch with no present slots.
    #[inline]
    pub fn seq_width(&self) -> usize {
        match self.num_present() {
            0 => 0,
            n => self.packed.len() / n,
        }
    }

    /// Compacts the batch down to the requested presence mask.
    ///
    /// Every slot kept by `present` must already be present in this batch;
    /// asking to keep an absent slot fails with
    /// [`PackSeqError::CannotReAddSequences`]. The result always carries a
    /// freshly allocated packed vector, even when the masks are equal.
    pub fn reduce(&self, present: &Present) -> PackSeqResult<Batch<V>> {
        if present.len() != self.present.len() {
            return Err(PackSeqError::PresentLengthMismatch {
                expected: self.present.len(),
                got: present.len(),
            });
        }
        let n = self.num_present();
        if n == 0 {
            return Err(PackSeqError::EmptyBatch);
        }
        let inc = self.packed.len() / n;
        let creator = self.packed.creator();

        // Contiguous runs of kept slots become single slices; the offset
        // advances by `inc` for every slot present in the source, kept or not.
        let mut chunks: Vec<V> = Vec::new();
        let mut chunk_start = 0;
        let mut chunk_size = 0;
        for (slot, keep) in present.iter().enumerate() {
            if keep {
                if !self.present[slot] {
                    return Err(PackSeqError::CannotReAddSequences { slot });
                }
                chunk_size += inc;
            } else if self.present[slot] {
                if chunk_size > 0 {
                    chunks.push(self.packed.slice(chunk_start, chunk_start + chunk_size));
                    chunk_start += chunk_size;
                    chunk_size = 0;
                }
                chunk_start += inc;
            }
        }
        if chunk_size > 0 {
            chunks.push(self.packed.slice(chunk_start, chunk_start + chunk_size));
        }

        Ok(Batch {
            packed: creator.concat(&chunks),
            present: present.clone(),
        })
    }

    /// Reverses [`Batch::reduce`] by inserting zero-filled chunks for every
    /// slot newly introduced by `present`.
    ///
    /// `present` must be a superset of this batch's mask; dropping a present
    /// slot fails with [`PackSeqError::ExpandNotSuperset`].
    pub fn expand(&self, present: &Present) -> PackSeqResult<Batch<V>> {
        if present.len() != self.present.len() {
            return Err(PackSeqError::PresentLengthMismatch {
                expected: self.present.len(),
                got: present.len(),
            });
        }
        let n = self.num_present();
        if n == 0 {
            return Err(PackSeqError::EmptyBatch);
        }
        let inc = self.packed.len() / n;
        let creator = self.packed.creator();
        // One shared zero chunk serves every insertion point; it is never
        // mutated.
        let filler = creator.make_vector(inc);

        let mut chunks: Vec<V> = Vec::new();
        let mut chunk_start = 0;
        let mut chunk_size = 0;
        for (slot, target) in present.iter().enumerate() {
            if self.present[slot] {
                if !target {
                    return Err(PackSeqError::ExpandNotSuperset { slot });
                }
                chunk_size += inc;
            } else if target {
                if chunk_size > 0 {
                    chunks.push(self.packed.slice(chunk_start, chunk_start + chunk_size));
                    chunk_start += chunk_size;
                    chunk_size = 0;
                }
                chunks.push(filler.clone());
            }
        }
        if chunk_size > 0 {
            chunks.push(self.packed.slice(chunk_start, chunk_start + chunk_size));
        }

        Ok(Batch {
            packed: creator.concat(&chunks),
            present: present.clone(),
        })
    }
}
