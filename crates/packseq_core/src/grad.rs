//! Leaf variables and the gradient accumulator.

use crate::{
    compat::*,
    error::PackSeqResult,
    vector::{Vector, VectorCreator},
};

/// Unique identity of a leaf variable.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(usize);

impl VarId {
    pub(crate) fn new() -> Self {
        static VAR_COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(VAR_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarId({})", self.0)
    }
}

/// A leaf differentiable variable holding one flat vector.
///
/// Variables are shared across the graph as `Arc<Var<V>>`; their identity,
/// not their value, is what gradients are keyed by.
pub struct Var<V: Vector> {
    id: VarId,
    value: V,
}

impl<V: Vector> Var<V> {
    /// Creates a fresh variable with a unique id.
    pub fn new(value: V) -> Self {
        Self {
            id: VarId::new(),
            value,
        }
    }

    /// Returns the variable's identity.
    #[inline]
    pub fn id(&self) -> VarId {
        self.id
    }

    /// Returns the variable's current value.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }
}

/// The set of variable identities a graph node depends on.
#[derive(Clone, Default)]
pub struct VarSet {
    ids: HashSet<VarId>,
}

impl VarSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable identity to the set.
    pub fn insert(&mut self, id: VarId) {
        self.ids.insert(id);
    }

    /// Returns true if the set contains the given identity.
    pub fn contains(&self, id: VarId) -> bool {
        self.ids.contains(&id)
    }

    /// Merges another set into this one.
    pub fn union_with(&mut self, other: &VarSet) {
        self.ids.extend(other.ids.iter().copied());
    }

    /// Returns the number of identities in the set.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<VarId> for VarSet {
    fn from_iter<I: IntoIterator<Item = VarId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Accumulated gradients keyed by variable identity.
///
/// Only registered variables are tracked; contributions for any other
/// identity are silently dropped. Registration seeds a zero vector, so an
/// entry is always the sum of every contribution made since registration.
pub struct Grad<V: Vector> {
    entries: HashMap<VarId, V>,
}

impl<V: Vector> Grad<V> {
    /// Creates an accumulator tracking no variables.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers a variable, seeding its entry with zeros of the value's length.
    pub fn wrt(&mut self, var: &Var<V>) {
        let zero = var.value().creator().make_vector(var.value().len());
        self.entries.insert(var.id(), zero);
    }

    /// Adds a contribution into a registered variable's entry.
    ///
    /// Unregistered identities are ignored. Fails if the contribution's
    /// length differs from the variable's.
    pub fn accumulate(&mut self, id: VarId, contribution: &V) -> PackSeqResult<()> {
        if let Some(entry) = self.entries.get_mut(&id) {
            *entry = entry.add(contribution)?;
        }
        Ok(())
    }

    /// Returns the accumulated gradient for a registered variable.
    pub fn get(&self, id: VarId) -> Option<&V> {
        self.entries.get(&id)
    }

    /// Returns the number of registered variables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no variables are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Vector> Default for Grad<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::be_cpu::CpuVector;
    use crate::error::PackSeqError;

    #[test]
    fn test_var_id_uniqueness() {
        let a = Var::new(CpuVector::from_slice(&[1.0f32]));
        let b = Var::new(CpuVector::from_slice(&[1.0f32]));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_wrt_seeds_zero() {
        let v = Var::new(CpuVector::from_slice(&[1.0f32, 2.0]));
        let mut grad = Grad::new();
        grad.wrt(&v);
        assert_eq!(grad.get(v.id()).unwrap().as_slice(), &[0.0, 0.0]);
        assert_eq!(grad.len(), 1);
    }

    #[test]
    fn test_accumulate_adds() {
        let v = Var::new(CpuVector::from_slice(&[1.0f32, 2.0]));
        let mut grad = Grad::new();
        grad.wrt(&v);
        grad.accumulate(v.id(), &CpuVector::from_slice(&[1.0, 10.0])).unwrap();
        grad.accumulate(v.id(), &CpuVector::from_slice(&[2.0, 20.0])).unwrap();
        assert_eq!(grad.get(v.id()).unwrap().as_slice(), &[3.0, 30.0]);
    }

    #[test]
    fn test_accumulate_ignores_unregistered() {
        let tracked = Var::new(CpuVector::from_slice(&[0.0f32]));
        let other = Var::new(CpuVector::from_slice(&[0.0f32]));
        let mut grad = Grad::new();
        grad.wrt(&tracked);
        grad.accumulate(other.id(), &CpuVector::from_slice(&[5.0])).unwrap();
        assert_eq!(grad.get(other.id()), None);
        assert_eq!(grad.len(), 1);
    }

    #[test]
    fn test_accumulate_size_mismatch() {
        let v = Var::new(CpuVector::from_slice(&[1.0f32, 2.0]));
        let mut grad = Grad::new();
        grad.wrt(&v);
        assert_eq!(
            grad.accumulate(v.id(), &CpuVector::from_slice(&[1.0])).unwrap_err(),
            PackSeqError::SizeMismatch { expected: 2, got: 1 }
        );
    }

    #[test]
    fn test_var_set() {
        let a = VarId::new();
        let b = VarId::new();
        let mut set = VarSet::new();
        set.insert(a);
        assert!(set.contains(a));
        assert!(!set.contains(b));

        let other: VarSet = [a, b].into_iter().collect();
        set.union_with(&other);
        assert_eq!(set.len(), 2);
    }
}
