// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — HL-MRF Gradient (SGD) Reasoner
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Stochastic gradient descent over a term store, with step-decay or
//! constant learning rates and optional ADAGRAD / ADAM steps.
//!
//! # Invariants
//!
//! 1. **Projected updates**: every value written during a sweep is
//!    clamped into [0, 1] before the next term reads it.
//!
//! 2. **Best assignment wins**: `optimize()` leaves the lowest-objective
//!    assignment seen (including the starting one) in the store.
//!
//! 3. **No hard constraints**: constraint terms are skipped; generators
//!    built with `TermGenerator::for_reasoner` never emit them.

pub mod reasoner;
pub mod step;

pub use reasoner::SgdReasoner;
pub use step::{learning_rate, partial, StepRule};
