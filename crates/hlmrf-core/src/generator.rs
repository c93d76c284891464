// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Term Generator
// ─────────────────────────────────────────────────────────────────────
//! Compiles grounded hyperplanes into optimizer terms.
//!
//! For every hyperplane the generator:
//! 1. picks the term kind from the rule (weighted loss or hard
//!    constraint) and the hyperplane's comparator,
//! 2. folds observed atoms into the constant and merges repeated
//!    references to the same unobserved atom,
//! 3. allocates variable slots in the target store and appends the term.
//!
//! Each call yields at most one term. Shapes the destination cannot
//! handle are dropped with a single warning per generator rather than
//! failing the grounding pass.

use parking_lot::Mutex;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use hlmrf_types::{
    AtomId, Comparator, GeneratorConfig, HlmrfError, HlmrfResult, Hyperplane, InitialValue,
    RuleId, RuleInfo, RuleRegistry,
};

use crate::atoms::AtomProvider;
use crate::reasoner::Reasoner;
use crate::store::TermStore;
use crate::term::{Term, TermKind, MAX_TERM_SIZE};

/// Why a hyperplane produced no term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Every atom was observed or cancelled out.
    Empty,
    /// A logical rule mentions the same atom with both signs.
    Trivial,
    /// Hard constraint for a reasoner without constraint support.
    ConstraintUnsupported,
    /// Weighted unsquared equality; grounding should split it.
    UnsquaredEquality,
    /// Unweighted rule without a comparator.
    Unrecognized,
}

/// A term whose atoms are not yet bound to variable slots.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTerm {
    pub rule: RuleId,
    pub kind: TermKind,
    pub atoms: Vec<(f32, AtomId)>,
    pub constant: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    Term(PreparedTerm),
    Skipped(SkipReason),
}

/// Running counts for one generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub generated: usize,
    pub empty: usize,
    pub trivial: usize,
    pub constraint_unsupported: usize,
    pub unsquared_equality: usize,
    pub unrecognized: usize,
    /// Terms the store itself refused (e.g. constraints in a paged store).
    pub store_rejected: usize,
}

impl GenerationStats {
    fn bump(&mut self, reason: SkipReason) -> usize {
        let slot = match reason {
            SkipReason::Empty => &mut self.empty,
            SkipReason::Trivial => &mut self.trivial,
            SkipReason::ConstraintUnsupported => &mut self.constraint_unsupported,
            SkipReason::UnsquaredEquality => &mut self.unsquared_equality,
            SkipReason::Unrecognized => &mut self.unrecognized,
        };
        *slot += 1;
        *slot
    }
}

/// Hyperplane → term compiler.
///
/// Thread-safe: statistics are guarded by a `parking_lot::Mutex`, so
/// `prepare` may run on many threads at once.
pub struct TermGenerator {
    config: GeneratorConfig,
    supports_constraints: bool,
    stats: Mutex<GenerationStats>,
}

impl TermGenerator {
    pub fn new(config: GeneratorConfig, supports_constraints: bool) -> Self {
        Self {
            config,
            supports_constraints,
            stats: Mutex::new(GenerationStats::default()),
        }
    }

    /// Generator matched to the constraint support of `reasoner`.
    pub fn for_reasoner(config: GeneratorConfig, reasoner: &dyn Reasoner) -> Self {
        Self::new(config, reasoner.supports_hard_constraints())
    }

    pub fn stats(&self) -> GenerationStats {
        self.stats.lock().clone()
    }

    /// Term kind plus whether the hyperplane must be negated.
    fn kind_for(
        &self,
        rule: &RuleInfo,
        comparator: Option<Comparator>,
    ) -> Result<(TermKind, bool), SkipReason> {
        if rule.is_weighted() {
            return match comparator {
                None => Ok((TermKind::loss(rule.squared, rule.hinge), false)),
                Some(Comparator::LessEqual) => Ok((TermKind::loss(rule.squared, true), false)),
                Some(Comparator::GreaterEqual) => Ok((TermKind::loss(rule.squared, true), true)),
                Some(Comparator::Equal) if rule.squared => Ok((TermKind::SquaredLinear, false)),
                Some(Comparator::Equal) => Err(SkipReason::UnsquaredEquality),
            };
        }
        match comparator {
            Some(_) if !self.supports_constraints => Err(SkipReason::ConstraintUnsupported),
            Some(cmp) => Ok((TermKind::Constraint(cmp), false)),
            None => Err(SkipReason::Unrecognized),
        }
    }

    /// Resolve kind, observed atoms and duplicates without touching any
    /// store.
    pub fn prepare(
        &self,
        rule_id: RuleId,
        rule: &RuleInfo,
        hyperplane: &Hyperplane,
        atoms: &dyn AtomProvider,
    ) -> HlmrfResult<Prepared> {
        let (kind, negate) = match self.kind_for(rule, hyperplane.comparator) {
            Ok(found) => found,
            Err(reason) => return Ok(Prepared::Skipped(reason)),
        };
        let logical = rule.hinge && rule.is_weighted() && hyperplane.comparator.is_none();

        let mut constant = hyperplane.constant as f64;
        let mut merged: Vec<(f64, AtomId)> = Vec::with_capacity(hyperplane.atoms.len());
        for &(coeff, atom) in &hyperplane.atoms {
            if !coeff.is_finite() {
                return Err(HlmrfError::Validation(format!(
                    "{rule_id}: non-finite coefficient {coeff} on {atom}"
                )));
            }
            let coeff = coeff as f64;
            if atoms.is_observed(atom) {
                constant -= coeff * atoms.value(atom);
                continue;
            }
            let existing = if self.config.merge_duplicate_atoms {
                merged.iter_mut().find(|(_, a)| *a == atom)
            } else {
                None
            };
            match existing {
                Some(entry) => {
                    if logical && entry.0 * coeff < 0.0 {
                        return Ok(Prepared::Skipped(SkipReason::Trivial));
                    }
                    entry.0 += coeff;
                }
                None => merged.push((coeff, atom)),
            }
        }

        merged.retain(|(c, _)| *c != 0.0);
        if merged.is_empty() {
            return Ok(Prepared::Skipped(SkipReason::Empty));
        }
        if merged.len() > MAX_TERM_SIZE {
            return Err(HlmrfError::Validation(format!(
                "{rule_id}: term references {} variables (max {MAX_TERM_SIZE})",
                merged.len()
            )));
        }

        let sign = if negate { -1.0 } else { 1.0 };
        Ok(Prepared::Term(PreparedTerm {
            rule: rule_id,
            kind,
            atoms: merged
                .into_iter()
                .map(|(c, a)| ((sign * c) as f32, a))
                .collect(),
            constant: (sign * constant) as f32,
        }))
    }

    fn initial_value(&self, atom: AtomId, atoms: &dyn AtomProvider) -> f64 {
        match self.config.initial_value {
            InitialValue::Atom => atoms.value(atom),
            InitialValue::Zero => 0.0,
            InitialValue::Half => 0.5,
        }
    }

    fn record_skip(&self, reason: SkipReason) {
        let count = self.stats.lock().bump(reason);
        if count != 1 {
            return;
        }
        match reason {
            SkipReason::ConstraintUnsupported => log::warn!(
                "reasoner does not support hard constraints; dropping constraint terms"
            ),
            SkipReason::UnsquaredEquality => log::warn!(
                "weighted equality must be squared; dropping unsquared equality terms"
            ),
            SkipReason::Unrecognized => log::warn!(
                "unweighted hyperplane without comparator; dropping unrecognized terms"
            ),
            SkipReason::Empty | SkipReason::Trivial => {}
        }
    }

    /// Bind a prepared term to variable slots and append it.
    /// Returns the number of terms added (0 or 1). Slots are only
    /// allocated for terms the store accepts.
    pub fn insert(
        &self,
        store: &mut dyn TermStore,
        atoms: &dyn AtomProvider,
        prepared: Prepared,
    ) -> HlmrfResult<usize> {
        let prepared = match prepared {
            Prepared::Term(t) => t,
            Prepared::Skipped(reason) => {
                self.record_skip(reason);
                return Ok(0);
            }
        };

        if prepared.kind.is_constraint() && !store.supports_constraints() {
            let rejected = {
                let mut stats = self.stats.lock();
                stats.store_rejected += 1;
                stats.store_rejected
            };
            if rejected == 1 {
                log::warn!(
                    "term store cannot hold hard constraints; dropping constraint terms (first from {})",
                    prepared.rule
                );
            }
            return Ok(0);
        }

        let mut coefficients = Vec::with_capacity(prepared.atoms.len());
        let mut indices = Vec::with_capacity(prepared.atoms.len());
        for (coeff, atom) in prepared.atoms {
            let slot = store.create_variable(atom, self.initial_value(atom, atoms));
            let slot = u32::try_from(slot).map_err(|_| {
                HlmrfError::Validation(format!("variable slot {slot} exceeds u32"))
            })?;
            coefficients.push(coeff);
            indices.push(slot);
        }

        let term = Term::new(
            prepared.rule,
            prepared.kind,
            coefficients,
            indices,
            prepared.constant,
        )?;
        let added = store.add_term(term)?;
        let mut stats = self.stats.lock();
        if added {
            stats.generated += 1;
            Ok(1)
        } else {
            stats.store_rejected += 1;
            Ok(0)
        }
    }

    /// Generate the term for one ground rule.
    pub fn generate(
        &self,
        store: &mut dyn TermStore,
        atoms: &dyn AtomProvider,
        rules: &RuleRegistry,
        rule_id: RuleId,
        hyperplane: &Hyperplane,
    ) -> HlmrfResult<usize> {
        let rule = rules.get(rule_id)?;
        let prepared = self.prepare(rule_id, rule, hyperplane, atoms)?;
        self.insert(store, atoms, prepared)
    }

    /// Generate terms for a batch of ground rules. Preparation runs in
    /// parallel; insertion keeps the batch order.
    pub fn generate_all(
        &self,
        store: &mut dyn TermStore,
        atoms: &dyn AtomProvider,
        rules: &RuleRegistry,
        ground: &[(RuleId, Hyperplane)],
    ) -> HlmrfResult<usize> {
        let prepared = ground
            .par_iter()
            .map(|(rule_id, hyperplane)| {
                let rule = rules.get(*rule_id)?;
                self.prepare(*rule_id, rule, hyperplane, atoms)
            })
            .collect::<HlmrfResult<Vec<_>>>()?;

        let mut added = 0;
        for p in prepared {
            added += self.insert(store, atoms, p)?;
        }
        log::debug!(
            "generated {added} terms from {} ground rules ({} variables)",
            ground.len(),
            store.num_variables()
        );
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::InMemoryAtoms;
    use crate::store::{MemoryTermStore, StreamingTermStore};
    use hlmrf_types::StreamingConfig;

    fn setup() -> (RuleRegistry, InMemoryAtoms) {
        let mut atoms = InMemoryAtoms::new();
        atoms.target(AtomId(0), 0.2);
        atoms.target(AtomId(1), 0.4);
        atoms.observe(AtomId(9), 0.5);
        (RuleRegistry::new(), atoms)
    }

    fn only_term(store: &MemoryTermStore) -> &Term {
        assert_eq!(store.size(), 1);
        &store.terms()[0]
    }

    // ── Loss terms ─────────────────────────────────────────────────

    #[test]
    fn test_weighted_hinge_folds_observed() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false)).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        // x0 + 2·obs(0.5) − x1 − 1.0
        let h = Hyperplane::new(
            vec![(1.0, AtomId(0)), (2.0, AtomId(9)), (-1.0, AtomId(1))],
            1.0,
        );
        assert_eq!(gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap(), 1);
        let t = only_term(&store);
        assert_eq!(t.kind, TermKind::Hinge);
        assert_eq!(t.coefficients, vec![1.0, -1.0]);
        assert!((t.constant - 0.0).abs() < 1e-6);
        assert_eq!(store.num_variables(), 2);
        // Initial values come from the provider.
        assert!((store.values()[0] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_greater_equal_is_negated() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, true).linear()).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(0)), (1.0, AtomId(1))], 1.0)
            .with_comparator(Comparator::GreaterEqual);
        gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap();
        let t = only_term(&store);
        assert_eq!(t.kind, TermKind::SquaredHinge);
        assert_eq!(t.coefficients, vec![-1.0, -1.0]);
        assert!((t.constant + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_weighted_equality() {
        let (mut rules, atoms) = setup();
        let sq = rules.add(RuleInfo::weighted("sq", 1.0, true).linear()).unwrap();
        let lin = rules.add(RuleInfo::weighted("lin", 1.0, false).linear()).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(0))], 0.5).with_comparator(Comparator::Equal);

        assert_eq!(gen.generate(&mut store, &atoms, &rules, sq, &h).unwrap(), 1);
        assert_eq!(store.terms()[0].kind, TermKind::SquaredLinear);
        assert_eq!(gen.generate(&mut store, &atoms, &rules, lin, &h).unwrap(), 0);
        assert_eq!(gen.generate(&mut store, &atoms, &rules, lin, &h).unwrap(), 0);
        assert_eq!(gen.stats().unsquared_equality, 2);
    }

    #[test]
    fn test_duplicates_merged() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false).linear()).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(
            vec![(1.0, AtomId(0)), (0.5, AtomId(1)), (2.0, AtomId(0))],
            0.0,
        );
        gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap();
        let t = only_term(&store);
        assert_eq!(t.size(), 2);
        assert_eq!(t.coefficients, vec![3.0, 0.5]);
    }

    #[test]
    fn test_duplicates_kept_when_merging_disabled() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false)).unwrap();
        let cfg = GeneratorConfig {
            merge_duplicate_atoms: false,
            ..GeneratorConfig::default()
        };
        let gen = TermGenerator::new(cfg, true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(0)), (1.0, AtomId(0))], 0.0);
        gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap();
        let t = only_term(&store);
        assert_eq!(t.indices, vec![0, 0]);
    }

    #[test]
    fn test_logical_tautology_is_trivial() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false)).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        // Foo(a) || !Foo(a)
        let h = Hyperplane::new(vec![(1.0, AtomId(0)), (-1.0, AtomId(0))], 0.0);
        assert_eq!(gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap(), 0);
        assert_eq!(gen.stats().trivial, 1);
        // Trivial terms allocate no variables.
        assert_eq!(store.num_variables(), 0);
    }

    #[test]
    fn test_arithmetic_cancellation_is_empty() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false).linear()).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(0)), (-1.0, AtomId(0))], 0.0);
        assert_eq!(gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap(), 0);
        assert_eq!(gen.stats().empty, 1);
    }

    #[test]
    fn test_all_observed_is_empty() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false)).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(9))], 0.0);
        assert_eq!(gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap(), 0);
        assert_eq!(store.size(), 0);
    }

    // ── Hard constraints ───────────────────────────────────────────

    #[test]
    fn test_hard_rule_becomes_constraint() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::hard("sum")).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(
            vec![(1.0, AtomId(0)), (1.0, AtomId(1)), (1.0, AtomId(9))],
            1.0,
        )
        .with_comparator(Comparator::Equal);
        gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap();
        let t = only_term(&store);
        assert_eq!(t.kind, TermKind::Constraint(Comparator::Equal));
        assert!((t.constant - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_constraint_dropped_without_support() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::hard("sum")).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), false);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(0))], 1.0).with_comparator(Comparator::LessEqual);
        for _ in 0..3 {
            assert_eq!(gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap(), 0);
        }
        assert_eq!(gen.stats().constraint_unsupported, 3);
        assert_eq!(store.size(), 0);
    }

    #[test]
    fn test_hard_rule_without_comparator_dropped() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::hard("bad")).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(0))], 1.0);
        assert_eq!(gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap(), 0);
        assert_eq!(gen.stats().unrecognized, 1);
    }

    // ── Validation and batching ────────────────────────────────────

    #[test]
    fn test_unknown_rule_is_error() {
        let (rules, atoms) = setup();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(0))], 1.0);
        assert!(gen
            .generate(&mut store, &atoms, &rules, RuleId(3), &h)
            .is_err());
    }

    #[test]
    fn test_non_finite_coefficient_is_error() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false)).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(f32::NAN, AtomId(0))], 1.0);
        assert!(gen.generate(&mut store, &atoms, &rules, rule, &h).is_err());
    }

    #[test]
    fn test_initial_value_policy() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false)).unwrap();
        let cfg = GeneratorConfig {
            initial_value: InitialValue::Half,
            ..GeneratorConfig::default()
        };
        let gen = TermGenerator::new(cfg, true);
        let mut store = MemoryTermStore::new();
        let h = Hyperplane::new(vec![(1.0, AtomId(0))], 0.0);
        gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap();
        assert!((store.values()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_generate_all_keeps_order() {
        let (mut rules, mut atoms) = setup();
        let rule = rules.add(RuleInfo::weighted("r", 1.0, false)).unwrap();
        let hard = rules.add(RuleInfo::hard("h")).unwrap();
        for i in 100..200 {
            atoms.target(AtomId(i), 0.0);
        }
        let mut ground: Vec<(RuleId, Hyperplane)> = (100..200)
            .map(|i| (rule, Hyperplane::new(vec![(1.0, AtomId(i))], i as f32)))
            .collect();
        ground.push((
            hard,
            Hyperplane::new(vec![(1.0, AtomId(100))], 1.0).with_comparator(Comparator::Equal),
        ));

        let gen = TermGenerator::new(GeneratorConfig::default(), false);
        let mut store = MemoryTermStore::new();
        let added = gen.generate_all(&mut store, &atoms, &rules, &ground).unwrap();
        assert_eq!(added, 100);
        let constants: Vec<f32> = store.terms().iter().map(|t| t.constant).collect();
        assert_eq!(constants, (100..200).map(|i| i as f32).collect::<Vec<_>>());
        assert_eq!(gen.stats().generated, 100);
        assert_eq!(gen.stats().constraint_unsupported, 1);
    }

    #[test]
    fn test_store_without_constraints_gets_no_slots() {
        let (mut rules, atoms) = setup();
        let rule = rules.add(RuleInfo::hard("sum")).unwrap();
        let soft = rules.add(RuleInfo::weighted("r", 1.0, false)).unwrap();
        let gen = TermGenerator::new(GeneratorConfig::default(), true);
        let dir = tempfile::tempdir().unwrap();
        let mut store = StreamingTermStore::new(StreamingConfig {
            page_location: Some(dir.path().to_path_buf()),
            ..StreamingConfig::default()
        })
        .unwrap();
        let h = Hyperplane::new(vec![(1.0, AtomId(0)), (1.0, AtomId(1))], 1.0)
            .with_comparator(Comparator::Equal);
        for _ in 0..2 {
            assert_eq!(gen.generate(&mut store, &atoms, &rules, rule, &h).unwrap(), 0);
        }
        assert_eq!(store.size(), 0);
        assert_eq!(store.num_variables(), 0);
        assert_eq!(gen.stats().store_rejected, 2);

        let h = Hyperplane::new(vec![(1.0, AtomId(1))], 0.0);
        assert_eq!(gen.generate(&mut store, &atoms, &rules, soft, &h).unwrap(), 1);
        assert_eq!(store.num_variables(), 1);
        assert_eq!(store.variables().slot(AtomId(1)), Some(0));
    }
}
