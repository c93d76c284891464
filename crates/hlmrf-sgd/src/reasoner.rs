// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — SGD Reasoner
// ─────────────────────────────────────────────────────────────────────
//! Projected stochastic gradient descent over the soft terms of a store.
//!
//! One epoch is one pass of `for_each_term`. Each visited term pushes
//! its variables against their partial derivatives, then every updated
//! value is clamped back into [0, 1]. Store shuffling supplies the
//! stochastic visitation order.
//!
//! Hard constraints are not representable; the generator drops them
//! before they reach a store driven by this reasoner. Constraint terms
//! already in a store are skipped with a warning but still counted as
//! violated.
//!
//! The first-order stop uses the gradient at the values the epoch ends
//! on, recomputed in the same pass as the objective.
//!
//! The sweep is sequential. Values written by one term are read by the
//! next term in the same epoch.

use hlmrf_core::{loss, should_stop, Reasoner, StopReason, TermStore};
use hlmrf_types::{
    clamp_unit, HlmrfError, HlmrfResult, ObjectiveResult, OptimizationReport, RuleRegistry,
    SgdConfig,
};

use crate::step::{learning_rate, partial, StepRule};

/// Gradient-descent reasoner with optional ADAGRAD / ADAM steps.
#[derive(Debug, Clone)]
pub struct SgdReasoner {
    config: SgdConfig,
}

impl SgdReasoner {
    pub fn new(config: SgdConfig) -> HlmrfResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SgdConfig {
        &self.config
    }

    /// One epoch of term-by-term updates.
    fn sweep(
        &self,
        store: &mut dyn TermStore,
        rules: &RuleRegistry,
        steps: &mut StepRule,
        iteration: usize,
    ) -> HlmrfResult<()> {
        let lr = learning_rate(&self.config, iteration);
        let coordinate = self.config.coordinate_step;

        store.for_each_term(&mut |term, values| {
            if term.kind.is_constraint() {
                return Ok(());
            }
            let weight = rules.weight(term.rule);
            let mut inner = term.inner_potential(values);
            for (&a, &slot) in term.coefficients.iter().zip(&term.indices) {
                let v = slot as usize;
                let a = a as f64;
                let g = partial(term.kind, weight, inner, a);

                let old = values[v];
                let next = old - steps.step(v, g, lr, iteration);
                if !next.is_finite() {
                    log::error!(
                        "SGD iteration {iteration}: non-finite update for variable {v} ({})",
                        term.rule
                    );
                    return Err(HlmrfError::Numerical(format!(
                        "non-finite update for variable {v} ({}) at iteration {iteration}",
                        term.rule
                    )));
                }
                let next = clamp_unit(next);
                values[v] = next;
                if coordinate {
                    inner += a * (next - old);
                }
            }
            Ok(())
        })?;
        Ok(())
    }
}

/// Objective, violations and projected gradient at the store's current
/// values, in one pass. Returns the number of constraint terms seen.
fn evaluate(
    store: &mut dyn TermStore,
    rules: &RuleRegistry,
    gradient: &mut [f64],
) -> HlmrfResult<(ObjectiveResult, usize)> {
    gradient.iter_mut().for_each(|g| *g = 0.0);
    let mut result = ObjectiveResult::default();
    let mut constraints = 0;
    store.for_each_term(&mut |term, values| {
        if term.kind.is_constraint() {
            constraints += 1;
            if term.is_violated(values) {
                result.violated_constraints += 1;
            }
            return Ok(());
        }
        let weight = rules.weight(term.rule);
        let inner = term.inner_potential(values);
        result.objective += weight * loss(term.kind, inner);
        for (&a, &slot) in term.coefficients.iter().zip(&term.indices) {
            gradient[slot as usize] += partial(term.kind, weight, inner, a as f64);
        }
        Ok(())
    })?;

    // Components pushing a bound variable further out of [0, 1]
    // cannot move it.
    for (g, &x) in gradient.iter_mut().zip(store.values()) {
        if (x <= 0.0 && *g > 0.0) || (x >= 1.0 && *g < 0.0) {
            *g = 0.0;
        }
    }
    Ok((result, constraints))
}

impl Reasoner for SgdReasoner {
    fn optimize(
        &mut self,
        store: &mut dyn TermStore,
        rules: &RuleRegistry,
    ) -> HlmrfResult<OptimizationReport> {
        let cfg = &self.config;
        let n = store.num_variables();
        log::debug!(
            "SGD optimize: {} variables, {} terms, {:?} schedule, {:?} extension",
            n,
            store.size(),
            cfg.learning_schedule,
            cfg.extension
        );
        if store.size() == 0 {
            return Ok(OptimizationReport {
                converged: true,
                ..OptimizationReport::default()
            });
        }

        let mut steps = StepRule::new(cfg, n);
        let mut gradient = vec![0.0; n];

        let (initial, constraints) = evaluate(store, rules, &mut gradient)?;
        if constraints > 0 {
            log::warn!(
                "SGD ignores {constraints} hard constraint terms ({} violated); violated constraints block early stopping",
                initial.violated_constraints
            );
        }
        let mut best = initial;
        let mut best_values = store.values().to_vec();

        let mut report = OptimizationReport::default();
        let mut previous: Option<f64> = None;
        let mut iteration = 0;

        loop {
            iteration += 1;
            self.sweep(store, rules, &mut steps, iteration)?;

            let (current, _) = evaluate(store, rules, &mut gradient)?;
            let gradient_norm = cfg.first_order_norm.apply(&gradient);

            if iteration % cfg.reasoner.compute_period == 0 {
                log::trace!(
                    "SGD iteration {iteration}: objective {:.6}, gradient norm {gradient_norm:.3e}, learning rate {:.3e}",
                    current.objective,
                    learning_rate(cfg, iteration)
                );
            }

            if current.objective < best.objective {
                best = current;
                best_values.copy_from_slice(store.values());
            }

            report.iterations = iteration;
            let first_order =
                cfg.first_order_break && gradient_norm <= cfg.first_order_tolerance;
            if let Some(reason) =
                should_stop(&cfg.reasoner, iteration, current, previous, first_order)
            {
                report.converged = reason.is_convergence();
                if reason == StopReason::Budget {
                    log::debug!("SGD stopped on iteration budget");
                }
                if best.objective < current.objective {
                    store.values_mut().copy_from_slice(&best_values);
                } else {
                    best = current;
                }
                break;
            }
            previous = Some(current.objective);
        }

        let ObjectiveResult {
            objective,
            violated_constraints,
        } = best;
        report.objective = objective;
        report.violated_constraints = violated_constraints;

        log::info!(
            "SGD finished after {} iterations: objective {:.6}{}",
            report.iterations,
            report.objective,
            if report.converged { "" } else { " (budget exhausted)" }
        );
        Ok(report)
    }

    fn supports_hard_constraints(&self) -> bool {
        false
    }

    fn set_budget(&mut self, budget: f64) -> HlmrfResult<()> {
        let mut reasoner = self.config.reasoner.clone();
        reasoner.budget = budget;
        reasoner.validate()?;
        self.config.reasoner = reasoner;
        Ok(())
    }
}
