// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — HL-MRF Optimization Reports
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

/// Clamp a variable value to [0, 1], mapping NaN to 0 and Inf to the
/// nearest bound.
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_unit: NaN detected, clamping to 0");
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Total weighted incompatibility plus the hard constraints it ignores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveResult {
    pub objective: f64,
    pub violated_constraints: usize,
}

/// Outcome of one `optimize()` call.
///
/// Running out of budget is not an error: `converged` is false and the
/// best assignment found is left in the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub iterations: usize,
    pub objective: f64,
    pub violated_constraints: usize,
    /// True if an early-stopping criterion fired before the budget ran out.
    pub converged: bool,
    /// ADMM only.
    pub primal_residual: f64,
    /// ADMM only.
    pub dual_residual: f64,
}
