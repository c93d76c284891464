// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Term Storage
// ─────────────────────────────────────────────────────────────────────
//! Term stores own the variable arena and the terms that reference it.
//!
//! Two backends:
//! - `MemoryTermStore`: every term in a `Vec`.
//! - `StreamingTermStore`: one resident page, the rest in fixed-record
//!   page files on local disk.

pub mod memory;
pub mod streaming;

use hlmrf_types::{AtomId, HlmrfResult};

use crate::atoms::AtomProvider;
use crate::term::Term;
use crate::variables::VariableStore;

pub use memory::MemoryTermStore;
pub use streaming::StreamingTermStore;

/// Callback for one pass over a store: each term together with the
/// mutable value array its indices point into.
pub type TermVisitor<'a> = &'a mut dyn FnMut(&Term, &mut [f64]) -> HlmrfResult<()>;

pub trait TermStore: Send {
    fn variables(&self) -> &VariableStore;

    fn variables_mut(&mut self) -> &mut VariableStore;

    /// Idempotent: returns the existing slot for a known atom.
    fn create_variable(&mut self, atom: AtomId, initial: f64) -> usize {
        self.variables_mut().create(atom, initial)
    }

    /// Returns `Ok(false)` if the store cannot hold this kind of term and
    /// dropped it.
    fn add_term(&mut self, term: Term) -> HlmrfResult<bool>;

    /// Number of stored terms.
    fn size(&self) -> usize;

    fn num_variables(&self) -> usize {
        self.variables().len()
    }

    fn values(&self) -> &[f64] {
        self.variables().values()
    }

    fn values_mut(&mut self) -> &mut [f64] {
        self.variables_mut().values_mut()
    }

    /// One full pass over every term. The visitation order depends on
    /// the store's shuffle settings.
    fn for_each_term(&mut self, visit: TermVisitor<'_>) -> HlmrfResult<()>;

    /// Push current values to the fact store; returns L2 movement since
    /// the previous sync.
    fn sync(&mut self, atoms: &mut dyn AtomProvider) -> f64 {
        self.variables_mut().sync(atoms)
    }

    /// Drop all terms and variables; the store stays usable.
    fn clear(&mut self) -> HlmrfResult<()>;

    /// Release every resource. Further use is a `State` error.
    fn close(&mut self) -> HlmrfResult<()>;

    fn supports_constraints(&self) -> bool;
}
