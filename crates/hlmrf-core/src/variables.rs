// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Variable Arena
// ─────────────────────────────────────────────────────────────────────

use std::collections::HashMap;

use hlmrf_types::{clamp_unit, AtomId};

use crate::atoms::AtomProvider;

/// Contiguous value array for the unobserved atoms of one model, plus
/// the atom→slot map used to allocate it.
///
/// Slots are handed out once and never move during a run.
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    index: HashMap<AtomId, usize>,
    atoms: Vec<AtomId>,
    values: Vec<f64>,
    synced: Vec<f64>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the slot for `atom`, allocating it with `initial` on first
    /// sight. Later calls ignore `initial`.
    pub fn create(&mut self, atom: AtomId, initial: f64) -> usize {
        if let Some(&slot) = self.index.get(&atom) {
            return slot;
        }
        let slot = self.atoms.len();
        let value = clamp_unit(initial);
        self.index.insert(atom, slot);
        self.atoms.push(atom);
        self.values.push(value);
        self.synced.push(value);
        slot
    }

    pub fn slot(&self, atom: AtomId) -> Option<usize> {
        self.index.get(&atom).copied()
    }

    pub fn atom(&self, slot: usize) -> Option<AtomId> {
        self.atoms.get(slot).copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Push every value to `atoms` and return the L2 movement since the
    /// previous sync (or since creation).
    pub fn sync(&mut self, atoms: &mut dyn AtomProvider) -> f64 {
        let mut movement = 0.0;
        for ((atom, &value), last) in self.atoms.iter().zip(&self.values).zip(&mut self.synced) {
            atoms.set_value(*atom, value);
            let diff = value - *last;
            movement += diff * diff;
            *last = value;
        }
        movement.sqrt()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.atoms.clear();
        self.values.clear();
        self.synced.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::InMemoryAtoms;

    #[test]
    fn test_create_is_idempotent() {
        let mut vars = VariableStore::new();
        let a = vars.create(AtomId(10), 0.2);
        let b = vars.create(AtomId(11), 0.9);
        let again = vars.create(AtomId(10), 0.7);
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(vars.len(), 2);
        assert!((vars.values()[a] - 0.2).abs() < 1e-12);
        assert_eq!(vars.atom(b), Some(AtomId(11)));
    }

    #[test]
    fn test_initial_value_clamped() {
        let mut vars = VariableStore::new();
        let s = vars.create(AtomId(1), 3.0);
        assert_eq!(vars.values()[s], 1.0);
    }

    #[test]
    fn test_sync_movement_and_idempotence() {
        let mut vars = VariableStore::new();
        let mut atoms = InMemoryAtoms::new();
        let a = vars.create(AtomId(1), 0.0);
        let b = vars.create(AtomId(2), 0.0);
        vars.values_mut()[a] = 0.3;
        vars.values_mut()[b] = 0.4;

        let moved = vars.sync(&mut atoms);
        assert!((moved - 0.5).abs() < 1e-12);
        assert!((atoms.value(AtomId(2)) - 0.4).abs() < 1e-12);

        let again = vars.sync(&mut atoms);
        assert_eq!(again, 0.0);
    }

    #[test]
    fn test_clear() {
        let mut vars = VariableStore::new();
        vars.create(AtomId(1), 0.5);
        vars.clear();
        assert!(vars.is_empty());
        assert_eq!(vars.slot(AtomId(1)), None);
    }
}
