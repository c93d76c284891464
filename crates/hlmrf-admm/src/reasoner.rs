// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — ADMM Reasoner (Consensus Optimization)
// ─────────────────────────────────────────────────────────────────────
//! Consensus ADMM over every term of a store.
//!
//! One outer iteration:
//!   1. Local minimization (parallel over terms)
//!   2. Consensus: z[v] = clamp(mean(x + y/ρ)) (parallel over variables)
//!   3. Dual update: y += ρ·(x − z) (parallel over terms)
//!   4. Residuals, objective and violated constraints on z
//!
//! Each phase is a separate rayon parallel loop, so the join at the end
//! of one phase is the barrier before the next. Terms only ever write
//! their own `x` and `y`; `z` is written only in phase 2.

use rayon::prelude::*;
use rayon::ThreadPool;

use hlmrf_core::{should_stop, Reasoner, StopReason, TermStore};
use hlmrf_types::{
    clamp_unit, AdmmConfig, HlmrfError, HlmrfResult, ObjectiveResult, OptimizationReport,
    RuleRegistry,
};

use crate::term::LocalTerm;

/// Warm-start hook run once before the iteration loop. It may rewrite
/// the consensus values; local copies are reset to them afterwards.
pub trait ConsensusInitializer: Send + Sync {
    fn initialize(&self, terms: &[LocalTerm], z: &mut [f64]);
}

impl<F> ConsensusInitializer for F
where
    F: Fn(&[LocalTerm], &mut [f64]) + Send + Sync,
{
    fn initialize(&self, terms: &[LocalTerm], z: &mut [f64]) {
        self(terms, z)
    }
}

/// Local-copy index: for variable `v`, `entries[offsets[v]..offsets[v + 1]]`
/// lists every `(term, position)` holding a copy of it.
struct CopyIndex {
    offsets: Vec<usize>,
    entries: Vec<(usize, usize)>,
}

impl CopyIndex {
    fn build(terms: &[LocalTerm], num_variables: usize) -> Self {
        let mut counts = vec![0usize; num_variables];
        for term in terms {
            for &v in &term.indices {
                counts[v] += 1;
            }
        }
        let mut offsets = Vec::with_capacity(num_variables + 1);
        offsets.push(0);
        for count in &counts {
            let last = offsets[offsets.len() - 1];
            offsets.push(last + count);
        }
        let mut cursor = offsets.clone();
        let mut entries = vec![(0, 0); offsets[num_variables]];
        for (t, term) in terms.iter().enumerate() {
            for (pos, &v) in term.indices.iter().enumerate() {
                entries[cursor[v]] = (t, pos);
                cursor[v] += 1;
            }
        }
        Self { offsets, entries }
    }

    fn copies(&self, v: usize) -> &[(usize, usize)] {
        &self.entries[self.offsets[v]..self.offsets[v + 1]]
    }

    fn num_copies(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct DualStats {
    primal: f64,
    x_norm: f64,
    z_norm: f64,
    y_norm: f64,
}

impl DualStats {
    fn merge(self, other: Self) -> Self {
        Self {
            primal: self.primal + other.primal,
            x_norm: self.x_norm + other.x_norm,
            z_norm: self.z_norm + other.z_norm,
            y_norm: self.y_norm + other.y_norm,
        }
    }
}

/// Consensus ADMM reasoner.
pub struct AdmmReasoner {
    config: AdmmConfig,
    pool: ThreadPool,
    initializer: Option<Box<dyn ConsensusInitializer>>,
}

impl AdmmReasoner {
    pub fn new(config: AdmmConfig) -> HlmrfResult<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|i| format!("hlmrf-admm-{i}"))
            .build()
            .map_err(|e| HlmrfError::Config(format!("ADMM thread pool: {e}")))?;
        Ok(Self {
            config,
            pool,
            initializer: None,
        })
    }

    pub fn with_initializer(mut self, initializer: impl ConsensusInitializer + 'static) -> Self {
        self.initializer = Some(Box::new(initializer));
        self
    }

    pub fn config(&self) -> &AdmmConfig {
        &self.config
    }

    fn run(
        &self,
        terms: &mut [LocalTerm],
        weights: &[f64],
        z: &mut [f64],
    ) -> HlmrfResult<OptimizationReport> {
        let cfg = &self.config;
        let rho = cfg.step_size;
        let index = CopyIndex::build(terms, z.len());
        let n = index.num_copies() as f64;
        let eps_abs_term = n.sqrt() * cfg.epsilon_abs;

        let mut report = OptimizationReport::default();
        let mut previous: Option<f64> = None;
        let mut iteration = 0;

        loop {
            iteration += 1;

            // 1. Local minimization.
            let z_ref: &[f64] = z;
            terms
                .par_iter_mut()
                .zip(weights.par_iter())
                .enumerate()
                .try_for_each(|(t, (term, &w))| {
                    if term.minimize(w, rho, z_ref) {
                        Ok(())
                    } else {
                        Err(t)
                    }
                })
                .map_err(|t| {
                    let rule = terms[t].rule;
                    log::error!("ADMM iteration {iteration}: non-finite local solution in term {t} ({rule})");
                    HlmrfError::Numerical(format!(
                        "non-finite local solution in term {t} ({rule}) at iteration {iteration}"
                    ))
                })?;

            // 2. Consensus.
            let terms_ref: &[LocalTerm] = terms;
            let dual_sq: f64 = z
                .par_iter_mut()
                .enumerate()
                .map(|(v, zv)| {
                    let copies = index.copies(v);
                    if copies.is_empty() {
                        return 0.0;
                    }
                    let sum: f64 = copies
                        .iter()
                        .map(|&(t, i)| terms_ref[t].x[i] + terms_ref[t].y[i] / rho)
                        .sum();
                    let new = clamp_unit(sum / copies.len() as f64);
                    let diff = new - *zv;
                    *zv = new;
                    diff * diff * copies.len() as f64
                })
                .sum();

            // 3. Dual update.
            let z_ref: &[f64] = z;
            let stats = terms
                .par_iter_mut()
                .map(|term| {
                    let mut s = DualStats::default();
                    for ((x, y), &v) in term.x.iter().zip(term.y.iter_mut()).zip(&term.indices) {
                        let diff = x - z_ref[v];
                        *y += rho * diff;
                        s.primal += diff * diff;
                        s.x_norm += x * x;
                        s.z_norm += z_ref[v] * z_ref[v];
                        s.y_norm += *y * *y;
                    }
                    s
                })
                .reduce(DualStats::default, DualStats::merge);

            // 4. Convergence.
            let current = terms
                .par_iter()
                .zip(weights.par_iter())
                .map(|(term, &w)| {
                    if term.kind.is_constraint() {
                        ObjectiveResult {
                            objective: 0.0,
                            violated_constraints: usize::from(term.is_violated(z_ref)),
                        }
                    } else {
                        ObjectiveResult {
                            objective: term.evaluate(w, z_ref),
                            violated_constraints: 0,
                        }
                    }
                })
                .reduce(ObjectiveResult::default, |a, b| ObjectiveResult {
                    objective: a.objective + b.objective,
                    violated_constraints: a.violated_constraints + b.violated_constraints,
                });

            let primal_res = stats.primal.sqrt();
            let dual_res = rho * dual_sq.sqrt();
            let eps_primal =
                eps_abs_term + cfg.epsilon_rel * stats.x_norm.sqrt().max(stats.z_norm.sqrt());
            let eps_dual = eps_abs_term + cfg.epsilon_rel * stats.y_norm.sqrt();

            if iteration % cfg.reasoner.compute_period == 0 {
                log::trace!(
                    "ADMM iteration {iteration}: objective {:.6}, violated {}, primal {primal_res:.3e} (eps {eps_primal:.3e}), dual {dual_res:.3e} (eps {eps_dual:.3e})",
                    current.objective,
                    current.violated_constraints
                );
            }

            report.iterations = iteration;
            report.objective = current.objective;
            report.violated_constraints = current.violated_constraints;
            report.primal_residual = primal_res;
            report.dual_residual = dual_res;

            let residuals_converged = primal_res < eps_primal && dual_res < eps_dual;
            if let Some(reason) = should_stop(
                &cfg.reasoner,
                iteration,
                current,
                previous,
                residuals_converged,
            ) {
                report.converged = reason.is_convergence();
                if reason == StopReason::Budget {
                    log::debug!("ADMM stopped on iteration budget");
                }
                break;
            }
            previous = Some(current.objective);
        }

        Ok(report)
    }
}

impl Reasoner for AdmmReasoner {
    fn optimize(
        &mut self,
        store: &mut dyn TermStore,
        rules: &RuleRegistry,
    ) -> HlmrfResult<OptimizationReport> {
        let mut z = store.values().to_vec();
        let mut terms = Vec::with_capacity(store.size());
        store.for_each_term(&mut |term, values| {
            terms.push(LocalTerm::new(term, values));
            Ok(())
        })?;
        log::debug!(
            "ADMM optimize: {} variables, {} terms, {} threads",
            z.len(),
            terms.len(),
            self.pool.current_num_threads()
        );
        if terms.is_empty() {
            return Ok(OptimizationReport {
                converged: true,
                ..OptimizationReport::default()
            });
        }

        if let Some(init) = &self.initializer {
            init.initialize(&terms, &mut z);
            for v in z.iter_mut() {
                *v = clamp_unit(*v);
            }
            for term in &mut terms {
                term.reset_local(&z);
            }
        }

        let weights: Vec<f64> = terms.iter().map(|t| rules.weight(t.rule)).collect();
        let report = self.pool.install(|| self.run(&mut terms, &weights, &mut z))?;

        store.values_mut().copy_from_slice(&z);
        log::info!(
            "ADMM finished after {} iterations: objective {:.6}, {} violated constraints{}",
            report.iterations,
            report.objective,
            report.violated_constraints,
            if report.converged { "" } else { " (budget exhausted)" }
        );
        Ok(report)
    }

    fn supports_hard_constraints(&self) -> bool {
        true
    }

    fn set_budget(&mut self, budget: f64) -> HlmrfResult<()> {
        let mut reasoner = self.config.reasoner.clone();
        reasoner.budget = budget;
        reasoner.validate()?;
        self.config.reasoner = reasoner;
        Ok(())
    }
}
