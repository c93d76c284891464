// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reasoner Contract + Stopping Policy
// ─────────────────────────────────────────────────────────────────────
//! Every reasoner minimizes the total weighted incompatibility of a
//! term store, leaving the result in the store's value array.
//!
//! The stopping policy is shared so both algorithms agree on what
//! "converged" means:
//! 1. the iteration budget always stops the run,
//! 2. full-iteration mode never stops early,
//! 3. violated hard constraints never stop early,
//! 4. otherwise a stagnant objective or a reasoner-specific
//!    convergence signal stops the run.

use serde::{Deserialize, Serialize};

use hlmrf_types::{HlmrfResult, ObjectiveResult, OptimizationReport, ReasonerConfig, RuleRegistry};

use crate::store::TermStore;

pub trait Reasoner {
    /// Minimize the store's objective in place.
    fn optimize(
        &mut self,
        store: &mut dyn TermStore,
        rules: &RuleRegistry,
    ) -> HlmrfResult<OptimizationReport>;

    fn supports_hard_constraints(&self) -> bool;

    /// Shrink (or restore) the fraction of `max_iterations` the next
    /// `optimize()` may use.
    fn set_budget(&mut self, budget: f64) -> HlmrfResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Iteration budget exhausted.
    Budget,
    /// Objective unchanged within tolerance.
    Stagnant,
    /// Reasoner-specific signal (residuals, gradient norm).
    Converged,
}

impl StopReason {
    pub fn is_convergence(self) -> bool {
        !matches!(self, StopReason::Budget)
    }
}

/// Decide whether to stop after `iteration` (1-based) completed
/// iterations.
pub fn should_stop(
    config: &ReasonerConfig,
    iteration: usize,
    current: ObjectiveResult,
    previous_objective: Option<f64>,
    converged: bool,
) -> Option<StopReason> {
    if iteration >= config.iteration_limit() {
        return Some(StopReason::Budget);
    }
    if config.run_full_iterations || current.violated_constraints > 0 {
        return None;
    }
    if config.objective_break {
        if let Some(previous) = previous_objective {
            if (current.objective - previous).abs() <= config.tolerance {
                return Some(StopReason::Stagnant);
            }
        }
    }
    if converged {
        return Some(StopReason::Converged);
    }
    None
}

/// Objective and violated-constraint count for the store's current
/// values. One full pass over the store.
pub fn compute_objective(
    store: &mut dyn TermStore,
    rules: &RuleRegistry,
) -> HlmrfResult<ObjectiveResult> {
    let mut result = ObjectiveResult::default();
    store.for_each_term(&mut |term, values| {
        if term.kind.is_constraint() {
            if term.is_violated(values) {
                result.violated_constraints += 1;
            }
        } else {
            result.objective += term.evaluate(rules.weight(term.rule), values);
        }
        Ok(())
    })?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTermStore;
    use crate::term::{Term, TermKind};
    use hlmrf_types::{AtomId, Comparator, RuleInfo};

    fn obj(objective: f64, violated: usize) -> ObjectiveResult {
        ObjectiveResult {
            objective,
            violated_constraints: violated,
        }
    }

    fn config() -> ReasonerConfig {
        ReasonerConfig {
            max_iterations: 10,
            ..ReasonerConfig::default()
        }
    }

    #[test]
    fn test_budget_always_stops() {
        let mut cfg = config();
        cfg.run_full_iterations = true;
        assert_eq!(
            should_stop(&cfg, 10, obj(1.0, 3), Some(2.0), false),
            Some(StopReason::Budget)
        );
        cfg.budget = 0.5;
        assert_eq!(
            should_stop(&cfg, 5, obj(1.0, 0), None, false),
            Some(StopReason::Budget)
        );
    }

    #[test]
    fn test_full_iterations_never_stop_early() {
        let mut cfg = config();
        cfg.run_full_iterations = true;
        assert_eq!(should_stop(&cfg, 2, obj(1.0, 0), Some(1.0), true), None);
    }

    #[test]
    fn test_violations_block_early_stop() {
        let cfg = config();
        assert_eq!(should_stop(&cfg, 2, obj(1.0, 1), Some(1.0), true), None);
    }

    #[test]
    fn test_stagnant_objective() {
        let cfg = config();
        assert_eq!(
            should_stop(&cfg, 2, obj(1.0, 0), Some(1.0 + 1e-7), false),
            Some(StopReason::Stagnant)
        );
        assert_eq!(should_stop(&cfg, 2, obj(1.0, 0), Some(1.5), false), None);
        assert_eq!(should_stop(&cfg, 1, obj(1.0, 0), None, false), None);
    }

    #[test]
    fn test_objective_break_disabled() {
        let mut cfg = config();
        cfg.objective_break = false;
        assert_eq!(should_stop(&cfg, 2, obj(1.0, 0), Some(1.0), false), None);
        assert_eq!(
            should_stop(&cfg, 2, obj(1.0, 0), Some(1.0), true),
            Some(StopReason::Converged)
        );
    }

    #[test]
    fn test_compute_objective() {
        let mut rules = RuleRegistry::new();
        let soft = rules.add(RuleInfo::weighted("soft", 2.0, false)).unwrap();
        let hard = rules.add(RuleInfo::hard("hard")).unwrap();
        let mut store = MemoryTermStore::new();
        let a = store.create_variable(AtomId(0), 0.9) as u32;
        let b = store.create_variable(AtomId(1), 0.4) as u32;
        // 2·max(0, x0 − 0.5) = 0.8
        store
            .add_term(Term::new(soft, TermKind::Hinge, vec![1.0], vec![a], 0.5).unwrap())
            .unwrap();
        // x0 + x1 = 1 is violated (1.3)
        store
            .add_term(
                Term::new(
                    hard,
                    TermKind::Constraint(Comparator::Equal),
                    vec![1.0, 1.0],
                    vec![a, b],
                    1.0,
                )
                .unwrap(),
            )
            .unwrap();
        let result = compute_objective(&mut store, &rules).unwrap();
        assert!((result.objective - 0.8).abs() < 1e-9);
        assert_eq!(result.violated_constraints, 1);
        assert!(StopReason::Stagnant.is_convergence());
        assert!(!StopReason::Budget.is_convergence());
    }
}
