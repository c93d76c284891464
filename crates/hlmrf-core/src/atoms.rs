// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Ground Atom Provider
// ─────────────────────────────────────────────────────────────────────
//! Seam between the inference kernel and the external fact store.
//!
//! The kernel only asks three things of the fact store: whether an atom
//! is observed, its current truth value, and (at sync time) to accept a
//! new value. Databases plug in through `AtomProvider`; the in-memory
//! backend serves tests, benches and small embedders.

use std::collections::HashMap;

use hlmrf_types::AtomId;

/// Trait for ground atom backends.
pub trait AtomProvider: Send + Sync {
    /// Observed atoms are constants; everything else becomes a variable.
    fn is_observed(&self, atom: AtomId) -> bool;

    /// Current truth value in [0, 1]. Unknown atoms read as 0.
    fn value(&self, atom: AtomId) -> f64;

    /// Write back an inferred value for an unobserved atom.
    fn set_value(&mut self, atom: AtomId, value: f64);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AtomState {
    value: f64,
    observed: bool,
}

/// Hash-map backed atom store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAtoms {
    atoms: HashMap<AtomId, AtomState>,
}

impl InMemoryAtoms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an observed (fixed) atom.
    pub fn observe(&mut self, atom: AtomId, value: f64) {
        self.atoms.insert(
            atom,
            AtomState {
                value,
                observed: true,
            },
        );
    }

    /// Insert or replace an unobserved atom with its starting value.
    pub fn target(&mut self, atom: AtomId, value: f64) {
        self.atoms.insert(
            atom,
            AtomState {
                value,
                observed: false,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

impl AtomProvider for InMemoryAtoms {
    fn is_observed(&self, atom: AtomId) -> bool {
        self.atoms.get(&atom).is_some_and(|a| a.observed)
    }

    fn value(&self, atom: AtomId) -> f64 {
        self.atoms.get(&atom).map_or(0.0, |a| a.value)
    }

    fn set_value(&mut self, atom: AtomId, value: f64) {
        match self.atoms.get_mut(&atom) {
            Some(state) if state.observed => {
                log::warn!("refusing to overwrite observed {atom}");
            }
            Some(state) => state.value = value,
            None => self.target(atom, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_atom_is_open() {
        let atoms = InMemoryAtoms::new();
        assert!(!atoms.is_observed(AtomId(7)));
        assert_eq!(atoms.value(AtomId(7)), 0.0);
    }

    #[test]
    fn test_observe_and_target() {
        let mut atoms = InMemoryAtoms::new();
        atoms.observe(AtomId(1), 0.8);
        atoms.target(AtomId(2), 0.3);
        assert!(atoms.is_observed(AtomId(1)));
        assert!(!atoms.is_observed(AtomId(2)));
        assert!((atoms.value(AtomId(2)) - 0.3).abs() < 1e-12);
        assert_eq!(atoms.len(), 2);
    }

    #[test]
    fn test_set_value_skips_observed() {
        let mut atoms = InMemoryAtoms::new();
        atoms.observe(AtomId(1), 0.8);
        atoms.set_value(AtomId(1), 0.1);
        assert!((atoms.value(AtomId(1)) - 0.8).abs() < 1e-12);

        atoms.set_value(AtomId(5), 0.4);
        assert!(!atoms.is_observed(AtomId(5)));
        assert!((atoms.value(AtomId(5)) - 0.4).abs() < 1e-12);
    }
}
