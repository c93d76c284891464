// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — ADMM Local Terms (Proximal Solves)
// ─────────────────────────────────────────────────────────────────────
//! Each term keeps a private copy `x` of the variables it touches and
//! the scaled duals `y`. One local step solves
//!
//! ```text
//! argmin_x  f(x) + (ρ/2)·‖x − z + y/ρ‖²
//! ```
//!
//! in closed form. With `v = z − y/ρ`:
//! - Linear: `x = v − (w/ρ)·a`
//! - SquaredLinear: `x = v + a·2w(c − a·v) / (ρ + 2w‖a‖²)`
//! - Hinge: `v` if `a·v ≤ c`, else the linear step if it stays on the
//!   active side, else the projection of `v` onto `a·x = c`
//! - SquaredHinge: `v` if `a·v ≤ c`, else the SquaredLinear root
//! - Constraint: projection of `v` onto the (half-)space

use hlmrf_core::{loss, Term, TermKind, VIOLATION_TOLERANCE};
use hlmrf_types::{Comparator, RuleId};

#[inline]
fn dot(a: &[f64], x: &[f64]) -> f64 {
    a.iter().zip(x).map(|(a, x)| a * x).sum()
}

#[inline]
fn norm_sq(a: &[f64]) -> f64 {
    a.iter().map(|a| a * a).sum()
}

/// Move `x` onto `a·x = c` along `a`.
fn project(a: &[f64], c: f64, x: &mut [f64]) {
    let norm = norm_sq(a);
    if norm == 0.0 {
        return;
    }
    let t = (dot(a, x) - c) / norm;
    for (xi, ai) in x.iter_mut().zip(a) {
        *xi -= t * ai;
    }
}

fn squared_step(a: &[f64], c: f64, w: f64, rho: f64, x: &mut [f64]) {
    let t = 2.0 * w * (c - dot(a, x)) / (rho + 2.0 * w * norm_sq(a));
    for (xi, ai) in x.iter_mut().zip(a) {
        *xi += t * ai;
    }
}

/// Solve the local subproblem in place. On entry `x` holds
/// `v = z − y/ρ`; on exit it holds the minimizer.
pub fn minimize(kind: TermKind, a: &[f64], c: f64, w: f64, rho: f64, x: &mut [f64]) {
    match kind {
        TermKind::Linear => {
            let step = w / rho;
            for (xi, ai) in x.iter_mut().zip(a) {
                *xi -= step * ai;
            }
        }
        TermKind::SquaredLinear => squared_step(a, c, w, rho, x),
        TermKind::Hinge => {
            if dot(a, x) <= c {
                return;
            }
            // Linear candidate: the hinge stays active at the new point.
            let step = w / rho;
            let linear_side = dot(a, x) - step * norm_sq(a);
            if linear_side >= c {
                for (xi, ai) in x.iter_mut().zip(a) {
                    *xi -= step * ai;
                }
                return;
            }
            project(a, c, x);
        }
        TermKind::SquaredHinge => {
            if dot(a, x) <= c {
                return;
            }
            squared_step(a, c, w, rho, x);
        }
        TermKind::Constraint(cmp) => {
            let lhs = dot(a, x);
            let feasible = match cmp {
                Comparator::Equal => false,
                Comparator::LessEqual => lhs <= c,
                Comparator::GreaterEqual => lhs >= c,
            };
            if !feasible {
                project(a, c, x);
            }
        }
    }
}

/// `w·f(x) + (ρ/2)·‖x − v‖²`. Constraints contribute only the penalty.
pub fn local_objective(
    kind: TermKind,
    a: &[f64],
    c: f64,
    w: f64,
    rho: f64,
    v: &[f64],
    x: &[f64],
) -> f64 {
    let penalty: f64 = x.iter().zip(v).map(|(x, v)| (x - v) * (x - v)).sum();
    w * loss(kind, dot(a, x) - c) + 0.5 * rho * penalty
}

/// A term plus its ADMM local state.
#[derive(Debug, Clone)]
pub struct LocalTerm {
    pub rule: RuleId,
    pub kind: TermKind,
    pub coefficients: Vec<f64>,
    pub indices: Vec<usize>,
    pub constant: f64,
    /// Local copies of the referenced variables.
    pub x: Vec<f64>,
    /// Scaled duals, one per local copy.
    pub y: Vec<f64>,
}

impl LocalTerm {
    /// Local copies start at the current consensus values, duals at 0.
    pub fn new(term: &Term, z: &[f64]) -> Self {
        let indices: Vec<usize> = term.indices.iter().map(|&i| i as usize).collect();
        Self {
            rule: term.rule,
            kind: term.kind,
            coefficients: term.coefficients.iter().map(|&a| a as f64).collect(),
            x: indices.iter().map(|&i| z[i]).collect(),
            y: vec![0.0; indices.len()],
            constant: term.constant as f64,
            indices,
        }
    }

    pub fn size(&self) -> usize {
        self.indices.len()
    }

    /// Reset local copies to `z`, keeping the duals.
    pub fn reset_local(&mut self, z: &[f64]) {
        for (x, &i) in self.x.iter_mut().zip(&self.indices) {
            *x = z[i];
        }
    }

    /// One proximal step against consensus `z`. Returns false if the
    /// result is not finite.
    pub fn minimize(&mut self, weight: f64, rho: f64, z: &[f64]) -> bool {
        for ((x, y), &i) in self.x.iter_mut().zip(&self.y).zip(&self.indices) {
            *x = z[i] - y / rho;
        }
        minimize(
            self.kind,
            &self.coefficients,
            self.constant,
            weight,
            rho,
            &mut self.x,
        );
        self.x.iter().all(|x| x.is_finite())
    }

    fn dot(&self, z: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(&self.indices)
            .map(|(a, &i)| a * z[i])
            .sum()
    }

    /// `a·z − c` at the consensus point.
    pub fn inner_potential(&self, z: &[f64]) -> f64 {
        self.dot(z) - self.constant
    }

    /// Weighted incompatibility at the consensus point.
    pub fn evaluate(&self, weight: f64, z: &[f64]) -> f64 {
        weight * loss(self.kind, self.inner_potential(z))
    }

    pub fn is_violated(&self, z: &[f64]) -> bool {
        match self.kind {
            TermKind::Constraint(cmp) => {
                !cmp.holds(self.dot(z), self.constant, VIOLATION_TOLERANCE)
            }
            _ => false,
        }
    }
}
