// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — HL-MRF Model Value Types
// ─────────────────────────────────────────────────────────────────────
//! Arena-indexed handles for ground atoms and rules, and the linear form
//! (`Hyperplane`) that grounding hands to term generation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HlmrfError, HlmrfResult};

/// Handle of a ground atom in the external fact provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AtomId(pub u32);

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom#{}", self.0)
    }
}

/// Small integer assigned to a rule at registration time.
/// Carried in serialized term records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(pub u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Equal,
    LessEqual,
    GreaterEqual,
}

impl Comparator {
    /// Whether `lhs (cmp) rhs` holds within `tolerance`.
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Comparator::Equal => (lhs - rhs).abs() <= tolerance,
            Comparator::LessEqual => lhs <= rhs + tolerance,
            Comparator::GreaterEqual => lhs >= rhs - tolerance,
        }
    }
}

/// Linear form produced by grounding: `Σ coeff·atom (cmp) constant`.
///
/// With no comparator the hyperplane is a plain loss expression whose
/// argument is `Σ coeff·atom − constant`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hyperplane {
    pub atoms: Vec<(f32, AtomId)>,
    pub constant: f32,
    pub comparator: Option<Comparator>,
}

impl Hyperplane {
    pub fn new(atoms: Vec<(f32, AtomId)>, constant: f32) -> Self {
        Self {
            atoms,
            constant,
            comparator: None,
        }
    }

    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = Some(comparator);
        self
    }
}

/// Rule metadata needed to turn a hyperplane into a term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleInfo {
    pub name: String,
    /// `None` for an unweighted (hard) rule.
    pub weight: Option<f64>,
    pub squared: bool,
    /// Logical rules produce hinge losses; arithmetic objectives do not.
    pub hinge: bool,
}

impl RuleInfo {
    pub fn weighted(name: impl Into<String>, weight: f64, squared: bool) -> Self {
        Self {
            name: name.into(),
            weight: Some(weight),
            squared,
            hinge: true,
        }
    }

    pub fn hard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: None,
            squared: false,
            hinge: false,
        }
    }

    /// Mark the rule as an arithmetic (non-hinge) objective.
    pub fn linear(mut self) -> Self {
        self.hinge = false;
        self
    }

    pub fn is_weighted(&self) -> bool {
        self.weight.is_some()
    }
}

/// Rule arena. Ids are dense and assigned in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleRegistry {
    rules: Vec<RuleInfo>,
}

fn check_weight(name: &str, weight: f64) -> HlmrfResult<()> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(HlmrfError::Validation(format!(
            "rule '{name}' has invalid weight {weight}"
        )));
    }
    Ok(())
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rule: RuleInfo) -> HlmrfResult<RuleId> {
        if let Some(w) = rule.weight {
            check_weight(&rule.name, w)?;
        }
        let id = u32::try_from(self.rules.len())
            .map_err(|_| HlmrfError::Validation("too many rules".to_string()))?;
        self.rules.push(rule);
        Ok(RuleId(id))
    }

    pub fn get(&self, id: RuleId) -> HlmrfResult<&RuleInfo> {
        self.rules
            .get(id.0 as usize)
            .ok_or_else(|| HlmrfError::Validation(format!("unknown {id}")))
    }

    /// Weight of a soft rule; hard rules report 0.
    pub fn weight(&self, id: RuleId) -> f64 {
        self.rules
            .get(id.0 as usize)
            .and_then(|r| r.weight)
            .unwrap_or(0.0)
    }

    /// Replace the weight of a soft rule between optimization runs.
    pub fn set_weight(&mut self, id: RuleId, weight: f64) -> HlmrfResult<()> {
        let rule = self
            .rules
            .get_mut(id.0 as usize)
            .ok_or_else(|| HlmrfError::Validation(format!("unknown {id}")))?;
        check_weight(&rule.name, weight)?;
        if rule.weight.is_none() {
            return Err(HlmrfError::Validation(format!(
                "rule '{}' is unweighted",
                rule.name
            )));
        }
        rule.weight = Some(weight);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
