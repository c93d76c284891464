// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — HL-MRF Consensus (ADMM) Reasoner
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Alternating direction method of multipliers over a term store.
//!
//! Every term type is convex, so the consensus scheme converges to the
//! global optimum of the relaxed program. The raw objective is not
//! guaranteed to fall monotonically; only the augmented Lagrangian is.
//!
//! # Safety Invariants
//!
//! 1. **Consensus stays feasible**: each z is the clamped mean of its
//!    local copies, so the value array never leaves [0, 1].
//!
//! 2. **Non-finite solves are fatal**: a NaN/Inf local solution aborts
//!    `optimize()` before it can reach z, and the store keeps its
//!    previous values.

pub mod reasoner;
pub mod term;

pub use reasoner::{AdmmReasoner, ConsensusInitializer};
pub use term::{local_objective, minimize, LocalTerm};
