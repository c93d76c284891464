// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — In-Memory Term Store
// ─────────────────────────────────────────────────────────────────────

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use hlmrf_types::{HlmrfError, HlmrfResult};

use crate::store::{TermStore, TermVisitor};
use crate::term::Term;
use crate::variables::VariableStore;

/// Every term held in a `Vec`, visited in insertion order unless
/// per-pass shuffling is enabled.
#[derive(Debug, Default)]
pub struct MemoryTermStore {
    variables: VariableStore,
    terms: Vec<Term>,
    shuffle: Option<StdRng>,
    closed: bool,
}

impl MemoryTermStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shuffle the terms before every pass, seeded for reproducibility.
    pub fn with_shuffle(seed: u64) -> Self {
        Self {
            shuffle: Some(StdRng::seed_from_u64(seed)),
            ..Self::default()
        }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    fn check_open(&self) -> HlmrfResult<()> {
        if self.closed {
            return Err(HlmrfError::State("term store is closed".to_string()));
        }
        Ok(())
    }
}

impl TermStore for MemoryTermStore {
    fn variables(&self) -> &VariableStore {
        &self.variables
    }

    fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    fn add_term(&mut self, term: Term) -> HlmrfResult<bool> {
        self.check_open()?;
        self.terms.push(term);
        Ok(true)
    }

    fn size(&self) -> usize {
        self.terms.len()
    }

    fn for_each_term(&mut self, visit: TermVisitor<'_>) -> HlmrfResult<()> {
        self.check_open()?;
        if let Some(rng) = self.shuffle.as_mut() {
            self.terms.shuffle(rng);
        }
        for term in &self.terms {
            visit(term, self.variables.values_mut())?;
        }
        Ok(())
    }

    fn clear(&mut self) -> HlmrfResult<()> {
        self.terms.clear();
        self.variables.clear();
        Ok(())
    }

    fn close(&mut self) -> HlmrfResult<()> {
        self.clear()?;
        self.closed = true;
        Ok(())
    }

    fn supports_constraints(&self) -> bool {
        true
    }
}
