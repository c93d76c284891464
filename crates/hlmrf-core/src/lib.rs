// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — HL-MRF Kernel Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Term compilation and storage for hinge-loss MRF inference.
//!
//! Data flows `Hyperplane → TermGenerator → Term → TermStore →
//! Reasoner::optimize() → sync()` back to the fact store.
//!
//! # Invariants
//!
//! 1. **Values stay in [0, 1]**: every write a reasoner makes to the
//!    value array goes through `clamp_unit`.
//!
//! 2. **Slots never move**: `create_variable` is idempotent and a slot
//!    handed out once stays valid until `clear()` or `close()`.
//!
//! 3. **Terms are well formed**: every term has at least one variable,
//!    matching coefficient/index lengths, and at most `MAX_TERM_SIZE`
//!    entries, so any loss term can be paged.

pub mod atoms;
pub mod generator;
pub mod page;
pub mod reasoner;
pub mod store;
pub mod term;
pub mod variables;

pub use atoms::{AtomProvider, InMemoryAtoms};
pub use generator::{GenerationStats, Prepared, PreparedTerm, SkipReason, TermGenerator};
pub use reasoner::{compute_objective, should_stop, Reasoner, StopReason};
pub use store::{MemoryTermStore, StreamingTermStore, TermStore, TermVisitor};
pub use term::{loss, Term, TermKind, MAX_TERM_SIZE, VIOLATION_TOLERANCE};
pub use variables::VariableStore;
