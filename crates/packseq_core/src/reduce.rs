//! Sequence-level compaction nodes: reduce and prune.

use crate::{
    batch::Batch,
    compat::*,
    error::{PackSeqError, PackSeqResult},
    grad::{Grad, VarSet},
    present::Present,
    seq::{check_upstream, Seq},
    vector::{Vector, VectorCreator},
};

struct ReduceSeq<V: Vector> {
    input: Arc<dyn Seq<V>>,
    out: Vec<Batch<V>>,
}

/// Reduces every timestep of `s` toward the target mask.
///
/// Unlike [`Batch::reduce`], `present` is unrestricted: it is intersected
/// with each timestep's own mask before reducing, so it may name slots that
/// are already absent. The output ends at the first timestep where the
/// intersection leaves no slot present; sequences end naturally there and
/// later timesteps are not represented.
///
/// Removed slots keep their indices within the mask. Use [`prune`] to drop
/// globally dead slots from the mask structure afterwards.
pub fn reduce<V: Vector + 'static>(
    s: Arc<dyn Seq<V>>,
    present: &Present,
) -> PackSeqResult<Arc<dyn Seq<V>>> {
    let mut out = Vec::with_capacity(s.output().len());
    for batch in s.output() {
        let p = present.intersect(batch.present())?;
        let reduced = batch.reduce(&p)?;
        if reduced.num_present() == 0 {
            break;
        }
        out.push(reduced);
    }
    let node: Arc<dyn Seq<V>> = Arc::new(ReduceSeq { input: s, out });
    Ok(node)
}

impl<V: Vector> Seq<V> for ReduceSeq<V> {
    fn creator(&self) -> V::Creator {
        self.input.creator()
    }

    fn output(&self) -> &[Batch<V>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: &[Batch<V>], grad: &mut Grad<V>) -> PackSeqResult<()> {
        check_upstream(&self.out, upstream)?;
        let in_out = self.input.output();

        // Expand each upstream batch back to the pre-reduction mask; dropped
        // slots recover a zero gradient.
        let mut new_upstream = Vec::with_capacity(in_out.len());
        for (u, orig) in upstream.iter().zip(in_out) {
            new_upstream.push(u.expand(orig.present())?);
        }

        // Timesteps the forward pass truncated still owe the input one
        // gradient batch each, shaped like its output there: all zeros.
        let creator = self.input.creator();
        for orig in &in_out[upstream.len()..] {
            let zeros = creator.make_vector(orig.packed().len());
            new_upstream.push(Batch::from_parts(zeros, orig.present().clone()));
        }

        self.input.propagate(&new_upstream, grad)
    }
}

struct PruneSeq<V: Vector> {
    input: Arc<dyn Seq<V>>,
    out: Vec<Batch<V>>,
}

/// Removes globally dead slots (absent at the first timestep) from every
/// timestep's mask.
///
/// The packed vectors are reused untouched; dead slots never contributed
/// data to them. A sequence with zero timesteps is returned unchanged.
///
/// Pruning assumes slots die uniformly across time: a slot absent at the
/// first timestep must be absent at every timestep. That assumption is
/// validated here and a violation fails with
/// [`PackSeqError::CannotReAddSequences`].
pub fn prune<V: Vector + 'static>(s: Arc<dyn Seq<V>>) -> PackSeqResult<Arc<dyn Seq<V>>> {
    if s.output().is_empty() {
        return Ok(s);
    }
    let out = {
        let s_out = s.output();
        let kept = s_out[0].present().clone();
        for batch in s_out {
            if batch.present().len() != kept.len() {
                return Err(PackSeqError::PresentLengthMismatch {
                    expected: kept.len(),
                    got: batch.present().len(),
                });
            }
            for (slot, now) in batch.present().iter().enumerate() {
                if now && !kept[slot] {
                    return Err(PackSeqError::CannotReAddSequences { slot });
                }
            }
        }
        s_out
            .iter()
            .map(|batch| {
                let mask: Present = kept
                    .iter()
                    .zip(batch.present().iter())
                    .filter(|&(keep, _)| keep)
                    .map(|(_, now)| now)
                    .collect();
                Batch::from_parts(batch.packed().clone(), mask)
            })
            .collect()
    };
    let node: Arc<dyn Seq<V>> = Arc::new(PruneSeq { input: s, out });
    Ok(node)
}

impl<V: Vector> Seq<V> for PruneSeq<V> {
    fn creator(&self) -> V::Creator {
        self.input.creator()
    }

    fn output(&self) -> &[Batch<V>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: &[Batch<V>], grad: &mut Grad<V>) -> PackSeqResult<()> {
        check_upstream(&self.out, upstream)?;
        let in_out = self.input.output();

        // Pure mask surgery in reverse: restore each timestep's original
        // mask and pass the data through unchanged.
        let mut new_upstream = Vec::with_capacity(upstream.len());
        for (u, orig) in upstream.iter().zip(in_out) {
            new_upstream.push(Batch::from_parts(u.packed().clone(), orig.present().clone()));
        }

        self.input.propagate(&new_upstream, grad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::be_cpu::{CpuCreator, CpuVector};
    use crate::grad::Var;
    use crate::seq::{ConstSeq, VarSeq};

    fn batch(data: &[f32], mask: &[bool]) -> Batch<CpuVector<f32>> {
        Batch::new(CpuVector::from_slice(data), Present::new(mask)).unwrap()
    }

    fn const_seq(batches: Vec<Batch<CpuVector<f32>>>) -> Arc<dyn Seq<CpuVector<f32>>> {
        Arc::new(ConstSeq::new(CpuCreator::new(), batches).unwrap())
    }

    #[test]
    fn test_reduce_applies_target_per_timestep() {
        // Masks {A,B}, {A}; keeping both A and B changes nothing.
        let s = const_seq(vec![
            batch(&[1.0, 2.0], &[true, true]),
            batch(&[3.0], &[true, false]),
        ]);
        let r = reduce(s, &Present::new(&[true, true])).unwrap();
        assert_eq!(r.output().len(), 2);
        assert_eq!(r.output()[0].packed().as_slice(), &[1.0, 2.0]);
        assert_eq!(r.output()[1].packed().as_slice(), &[3.0]);
    }

    #[test]
    fn test_reduce_truncates_at_first_empty_timestep() {
        // Masks {A,B}, {A}; keeping only B empties the second timestep, so
        // the output holds exactly one batch.
        let s = const_seq(vec![
            batch(&[1.0, 2.0], &[true, true]),
            batch(&[3.0], &[true, false]),
        ]);
        let r = reduce(s, &Present::new(&[false, true])).unwrap();
        assert_eq!(r.output().len(), 1);
        assert_eq!(r.output()[0].packed().as_slice(), &[2.0]);
        assert_eq!(r.output()[0].present(), &Present::new(&[false, true]));
    }

    #[test]
    fn test_reduce_mask_fidelity() {
        let s = const_seq(vec![batch(&[1.0, 2.0, 3.0], &[true, true, true])]);
        let target = Present::new(&[true, false, true]);
        let r = reduce(s, &target).unwrap();
        assert_eq!(r.output()[0].present(), &target);
        assert_eq!(r.output()[0].packed().as_slice(), &[1.0, 3.0]);
    }

    #[test]
    fn test_reduce_propagate_restores_input_shapes() {
        // Adjoint shape contract: the input receives one gradient batch per
        // input timestep, zeros at dropped slots and truncated timesteps.
        let v0 = Arc::new(Var::new(CpuVector::from_slice(&[1.0f32, 2.0])));
        let v1 = Arc::new(Var::new(CpuVector::from_slice(&[3.0f32])));
        let s: Arc<dyn Seq<CpuVector<f32>>> = Arc::new(
            VarSeq::new(
                CpuCreator::new(),
                vec![
                    (v0.clone(), Present::new(&[true, true])),
                    (v1.clone(), Present::new(&[true, false])),
                ],
            )
            .unwrap(),
        );
        let r = reduce(s, &Present::new(&[false, true])).unwrap();
        assert_eq!(r.output().len(), 1);

        let mut grad = Grad::new();
        grad.wrt(&v0);
        grad.wrt(&v1);
        r.propagate(&[batch(&[10.0], &[false, true])], &mut grad).unwrap();

        // Slot A was dropped at timestep 0; timestep 1 was truncated.
        assert_eq!(grad.get(v0.id()).unwrap().as_slice(), &[0.0, 10.0]);
        assert_eq!(grad.get(v1.id()).unwrap().as_slice(), &[0.0]);
    }

    #[test]
    fn test_reduce_propagate_rejects_wrong_length() {
        let s = const_seq(vec![batch(&[1.0, 2.0], &[true, true])]);
        let r = reduce(s, &Present::new(&[true, true])).unwrap();
        let mut grad = Grad::new();
        assert_eq!(
            r.propagate(&[], &mut grad).unwrap_err(),
            PackSeqError::UpstreamLengthMismatch { expected: 1, got: 0 }
        );
    }

    #[test]
    fn test_reduce_target_length_mismatch() {
        let s = const_seq(vec![batch(&[1.0], &[true])]);
        assert_eq!(
            reduce(s, &Present::new(&[true, false])).unwrap_err(),
            PackSeqError::PresentLengthMismatch { expected: 2, got: 1 }
        );
    }

    #[test]
    fn test_prune_drops_dead_slots() {
        // Slot 1 is dead everywhere; masks shrink, data stays put.
        let s = const_seq(vec![
            batch(&[1.0, 2.0, 3.0, 4.0], &[true, false, true]),
            batch(&[5.0, 6.0], &[true, false, false]),
        ]);
        let p = prune(s).unwrap();
        assert_eq!(p.output()[0].present(), &Present::new(&[true, true]));
        assert_eq!(p.output()[1].present(), &Present::new(&[true, false]));
        assert_eq!(p.output()[0].packed().as_slice(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.output()[1].packed().as_slice(), &[5.0, 6.0]);
    }

    #[test]
    fn test_prune_idempotent() {
        let s = const_seq(vec![
            batch(&[1.0, 2.0], &[true, true]),
            batch(&[3.0], &[true, false]),
        ]);
        let once = prune(s).unwrap();
        let twice = prune(once.clone()).unwrap();
        assert_eq!(once.output().len(), twice.output().len());
        for (a, b) in once.output().iter().zip(twice.output()) {
            assert_eq!(a.present(), b.present());
            assert_eq!(a.packed().as_slice(), b.packed().as_slice());
        }
    }

    #[test]
    fn test_prune_empty_seq_is_identity() {
        let s = const_seq(vec![]);
        let p = prune(s.clone()).unwrap();
        assert!(Arc::ptr_eq(&s, &p));
    }

    #[test]
    fn test_prune_propagate_restores_masks() {
        let v0 = Arc::new(Var::new(CpuVector::from_slice(&[1.0f32, 2.0])));
        let v1 = Arc::new(Var::new(CpuVector::from_slice(&[3.0f32])));
        let s: Arc<dyn Seq<CpuVector<f32>>> = Arc::new(
            VarSeq::new(
                CpuCreator::new(),
                vec![
                    (v0.clone(), Present::new(&[true, false, true])),
                    (v1.clone(), Present::new(&[true, false, false])),
                ],
            )
            .unwrap(),
        );
        let p = prune(s).unwrap();

        let mut grad = Grad::new();
        grad.wrt(&v0);
        grad.wrt(&v1);
        p.propagate(
            &[
                batch(&[10.0, 20.0], &[true, true]),
                batch(&[30.0], &[true, false]),
            ],
            &mut grad,
        )
        .unwrap();
        assert_eq!(grad.get(v0.id()).unwrap().as_slice(), &[10.0, 20.0]);
        assert_eq!(grad.get(v1.id()).unwrap().as_slice(), &[30.0]);
    }

    #[test]
    fn test_reduce_then_prune_gradient_flow() {
        // End to end: compact a three-slot sequence to its middle slot,
        // prune the dead slots away, and push a gradient all the way back.
        let v0 = Arc::new(Var::new(CpuVector::from_slice(&[1.0f32, 2.0, 3.0])));
        let v1 = Arc::new(Var::new(CpuVector::from_slice(&[4.0f32, 5.0])));
        let s: Arc<dyn Seq<CpuVector<f32>>> = Arc::new(
            VarSeq::new(
                CpuCreator::new(),
                vec![
                    (v0.clone(), Present::new(&[true, true, true])),
                    (v1.clone(), Present::new(&[true, true, false])),
                ],
            )
            .unwrap(),
        );
        let r = reduce(s, &Present::new(&[false, true, false])).unwrap();
        let p = prune(r).unwrap();
        assert_eq!(p.output().len(), 2);
        assert_eq!(p.output()[0].present(), &Present::new(&[true]));
        assert_eq!(p.output()[0].packed().as_slice(), &[2.0]);
        assert_eq!(p.output()[1].packed().as_slice(), &[5.0]);

        let mut grad = Grad::new();
        grad.wrt(&v0);
        grad.wrt(&v1);
        p.propagate(
            &[batch(&[7.0], &[true]), batch(&[9.0], &[true])],
            &mut grad,
        )
        .unwrap();
        assert_eq!(grad.get(v0.id()).unwrap().as_slice(), &[0.0, 7.0, 0.0]);
        assert_eq!(grad.get(v1.id()).unwrap().as_slice(), &[0.0, 9.0]);
    }

    #[test]
    fn test_reduce_vars_pass_through() {
        let v = Arc::new(Var::new(CpuVector::from_slice(&[1.0f32])));
        let s: Arc<dyn Seq<CpuVector<f32>>> = Arc::new(
            VarSeq::new(CpuCreator::new(), vec![(v.clone(), Present::new(&[true]))]).unwrap(),
        );
        let r = reduce(s, &Present::new(&[true])).unwrap();
        assert!(r.vars().contains(v.id()));
        assert_eq!(r.vars().len(), 1);
    }
}
