// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Objective Terms
// ─────────────────────────────────────────────────────────────────────
//! One ground potential or hard constraint over a handful of variables.
//!
//! Terms are a closed tagged set. Per-kind behaviour lives in free
//! functions matched on `TermKind` so the reasoners' hot loops never go
//! through a vtable.

use serde::{Deserialize, Serialize};

use hlmrf_types::{Comparator, HlmrfError, HlmrfResult, RuleId};

/// Infeasibility above which a constraint counts as violated.
pub const VIOLATION_TOLERANCE: f64 = 1e-5;

/// Largest term a page record can hold (its size field is 2 bytes).
pub const MAX_TERM_SIZE: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermKind {
    /// `w·(a·x − c)`
    Linear,
    /// `w·(a·x − c)²`
    SquaredLinear,
    /// `w·max(0, a·x − c)`
    Hinge,
    /// `w·max(0, a·x − c)²`
    SquaredHinge,
    /// Hard `a·x (cmp) c`.
    Constraint(Comparator),
}

impl TermKind {
    pub fn loss(squared: bool, hinge: bool) -> Self {
        match (squared, hinge) {
            (false, false) => TermKind::Linear,
            (true, false) => TermKind::SquaredLinear,
            (false, true) => TermKind::Hinge,
            (true, true) => TermKind::SquaredHinge,
        }
    }

    pub fn is_squared(self) -> bool {
        matches!(self, TermKind::SquaredLinear | TermKind::SquaredHinge)
    }

    pub fn is_hinge(self) -> bool {
        matches!(self, TermKind::Hinge | TermKind::SquaredHinge)
    }

    pub fn is_constraint(self) -> bool {
        matches!(self, TermKind::Constraint(_))
    }
}

/// Unweighted loss of a term kind at inner potential `a·x − c`.
/// Constraints contribute nothing to the objective.
#[inline]
pub fn loss(kind: TermKind, inner: f64) -> f64 {
    match kind {
        TermKind::Linear => inner,
        TermKind::SquaredLinear => inner * inner,
        TermKind::Hinge => inner.max(0.0),
        TermKind::SquaredHinge => {
            let h = inner.max(0.0);
            h * h
        }
        TermKind::Constraint(_) => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub rule: RuleId,
    pub kind: TermKind,
    pub coefficients: Vec<f32>,
    /// Variable slots in the owning store.
    pub indices: Vec<u32>,
    pub constant: f32,
}

impl Term {
    pub fn new(
        rule: RuleId,
        kind: TermKind,
        coefficients: Vec<f32>,
        indices: Vec<u32>,
        constant: f32,
    ) -> HlmrfResult<Self> {
        if coefficients.is_empty() {
            return Err(HlmrfError::Validation(format!(
                "term for {rule} references no variables"
            )));
        }
        if coefficients.len() != indices.len() {
            return Err(HlmrfError::Validation(format!(
                "term for {rule} has {} coefficients but {} indices",
                coefficients.len(),
                indices.len()
            )));
        }
        if coefficients.len() > MAX_TERM_SIZE {
            return Err(HlmrfError::Validation(format!(
                "term for {rule} has {} variables (max {MAX_TERM_SIZE})",
                coefficients.len()
            )));
        }
        Ok(Self {
            rule,
            kind,
            coefficients,
            indices,
            constant,
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.coefficients.len()
    }

    /// `a·x` over the store's value array.
    #[inline]
    pub fn dot(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(&self.indices)
            .map(|(&a, &i)| a as f64 * values[i as usize])
            .sum()
    }

    /// `a·x − c`.
    #[inline]
    pub fn inner_potential(&self, values: &[f64]) -> f64 {
        self.dot(values) - self.constant as f64
    }

    /// Weighted incompatibility.
    pub fn evaluate(&self, weight: f64, values: &[f64]) -> f64 {
        weight * loss(self.kind, self.inner_potential(values))
    }

    /// True only for constraints whose infeasibility exceeds
    /// `VIOLATION_TOLERANCE`.
    pub fn is_violated(&self, values: &[f64]) -> bool {
        match self.kind {
            TermKind::Constraint(cmp) => {
                !cmp.holds(self.dot(values), self.constant as f64, VIOLATION_TOLERANCE)
            }
            _ => false,
        }
    }

    /// Squared L2 norm of the coefficient vector.
    pub fn coefficient_norm_sq(&self) -> f64 {
        self.coefficients.iter().map(|&a| (a as f64) * (a as f64)).sum()
    }
}
