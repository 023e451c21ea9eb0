//! The sequence capability set and its leaf node types.
//!
//! A sequence yields one packed batch per timestep, earliest first, and can
//! route upstream gradients back to the leaf variables it was built from.
//! Graph nodes implement [`Seq`] and compose through `Arc<dyn Seq<V>>`,
//! forming a tree of shared ownership.

use crate::{
    batch::Batch,
    compat::*,
    error::{PackSeqError, PackSeqResult},
    grad::{Grad, Var, VarSet},
    present::Present,
    vector::Vector,
};
use core::fmt;

/// A differentiable sequence of packed batches.
pub trait Seq<V: Vector> {
    /// Returns the creator shared by every vector in this sequence.
    fn creator(&self) -> V::Creator;

    /// Returns the computed output, one batch per timestep, earliest first.
    ///
    /// The output is computed once at construction and cached for the
    /// lifetime of the node.
    fn output(&self) -> &[Batch<V>];

    /// Returns the identities of every leaf variable this sequence depends on.
    fn vars(&self) -> VarSet;

    /// Deposits gradient contributions into `grad`.
    ///
    /// `upstream` must hold one batch per output timestep, each shaped like
    /// the corresponding forward output (same mask, same packed length).
    fn propagate(&self, upstream: &[Batch<V>], grad: &mut Grad<V>) -> PackSeqResult<()>;
}

impl<V: Vector + fmt::Debug> fmt::Debug for dyn Seq<V> + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.output().iter()).finish()
    }
}

/// Validates that an upstream gradient list matches an output list, one
/// batch per timestep with identical masks.
pub(crate) fn check_upstream<V: Vector>(
    output: &[Batch<V>],
    upstream: &[Batch<V>],
) -> PackSeqResult<()> {
    if upstream.len() != output.len() {
        return Err(PackSeqError::UpstreamLengthMismatch {
            expected: output.len(),
            got: upstream.len(),
        });
    }
    for (timestep, (u, out)) in upstream.iter().zip(output).enumerate() {
        if u.present() != out.present() || u.packed().len() != out.packed().len() {
            return Err(PackSeqError::UpstreamMaskMismatch { timestep });
        }
    }
    Ok(())
}

/// Validates the batch list a leaf node is built from: equal mask lengths
/// and chunk widths across timesteps, no fully empty timestep, and monotone
/// presence (a slot that goes absent stays absent).
pub(crate) fn check_batch_list<V: Vector>(batches: &[Batch<V>]) -> PackSeqResult<()> {
    let Some(first) = batches.first() else {
        return Ok(());
    };
    let num_slots = first.present().len();
    let width = first.seq_width();
    let mut prev = first.present();
    for (t, batch) in batches.iter().enumerate() {
        if batch.present().len() != num_slots {
            return Err(PackSeqError::PresentLengthMismatch {
                expected: num_slots,
                got: batch.present().len(),
            });
        }
        if batch.num_present() == 0 {
            return Err(PackSeqError::EmptyBatch);
        }
        if batch.seq_width() != width {
            return Err(PackSeqError::InvalidPackedLength {
                len: batch.packed().len(),
                num_present: batch.num_present(),
            });
        }
        if t > 0 {
            for (slot, now) in batch.present().iter().enumerate() {
                if now && !prev[slot] {
                    return Err(PackSeqError::CannotReAddSequences { slot });
                }
            }
        }
        prev = batch.present();
    }
    Ok(())
}

/// A constant sequence: fixed batches, no variables, gradients discarded.
pub struct ConstSeq<V: Vector> {
    creator: V::Creator,
    out: Vec<Batch<V>>,
}

impl<V: Vector + fmt::Debug> fmt::Debug for ConstSeq<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.out.iter()).finish()
    }
}

impl<V: Vector> ConstSeq<V> {
    /// Creates a constant sequence from a validated batch list.
    pub fn new(creator: V::Creator, batches: Vec<Batch<V>>) -> PackSeqResult<Self> {
        check_batch_list(&batches)?;
        Ok(Self {
            creator,
            out: batches,
        })
    }
}

impl<V: Vector> Seq<V> for ConstSeq<V> {
    fn creator(&self) -> V::Creator {
        self.creator.clone()
    }

    fn output(&self) -> &[Batch<V>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        VarSet::new()
    }

    fn propagate(&self, upstream: &[Batch<V>], _grad: &mut Grad<V>) -> PackSeqResult<()> {
        check_upstream(&self.out, upstream)
    }
}

/// A leaf sequence whose per-timestep packed vectors are variables.
///
/// Propagation adds each upstream batch's packed vector into the matching
/// variable's gradient entry.
pub struct VarSeq<V: Vector> {
    creator: V::Creator,
    vars: Vec<Arc<Var<V>>>,
    out: Vec<Batch<V>>,
}

impl<V: Vector> VarSeq<V> {
    /// Creates a variable sequence from one `(variable, mask)` pair per
    /// timestep. Each variable's value becomes that timestep's packed vector.
    pub fn new(
        creator: V::Creator,
        steps: Vec<(Arc<Var<V>>, Present)>,
    ) -> PackSeqResult<Self> {
        let mut vars = Vec::with_capacity(steps.len());
        let mut out = Vec::with_capacity(steps.len());
        for (var, present) in steps {
            out.push(Batch::new(var.value().clone(), present)?);
            vars.push(var);
        }
        check_batch_list(&out)?;
        Ok(Self { creator, vars, out })
    }
}

impl<V: Vector> Seq<V> for VarSeq<V> {
    fn creator(&self) -> V::Creator {
        self.creator.clone()
    }

    fn output(&self) -> &[Batch<V>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        self.vars.iter().map(|v| v.id()).collect()
    }

    fn propagate(&self, upstream: &[Batch<V>], grad: &mut Grad<V>) -> PackSeqResult<()> {
        check_upstream(&self.out, upstream)?;
        for (u, var) in upstream.iter().zip(&self.vars) {
            grad.accumulate(var.id(), u.packed())?;
        }
        Ok(())
    }
}
