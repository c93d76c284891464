// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — HL-MRF Kernel Configuration
// ─────────────────────────────────────────────────────────────────────
//! Explicit configuration for term generation, term storage and the two
//! reasoners. Every struct is built by the caller and handed to the
//! component that needs it; there is no global option registry.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{HlmrfError, HlmrfResult};

/// Stopping policy shared by every reasoner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasonerConfig {
    /// Hard cap on outer iterations (epochs for SGD).
    pub max_iterations: usize,

    /// Fraction of `max_iterations` actually allowed, in (0, 1].
    /// Outer loops tighten this to cut a run short.
    pub budget: f64,

    /// Ignore every early-stopping signal and run the whole budget.
    pub run_full_iterations: bool,

    /// Stop once the objective stops changing (within `tolerance`).
    pub objective_break: bool,

    /// How close two objective values must be to count as unchanged.
    pub tolerance: f64,

    /// Iteration cadence for trace-level progress logging.
    pub compute_period: usize,
}

impl Default for ReasonerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 25_000,
            budget: 1.0,
            run_full_iterations: false,
            objective_break: true,
            tolerance: 1e-5,
            compute_period: 50,
        }
    }
}

impl ReasonerConfig {
    /// Number of iterations the current budget allows (at least one).
    pub fn iteration_limit(&self) -> usize {
        ((self.max_iterations as f64 * self.budget).ceil() as usize).max(1)
    }

    pub fn validate(&self) -> HlmrfResult<()> {
        if self.max_iterations == 0 {
            return Err(HlmrfError::Config(
                "max_iterations must be > 0".to_string(),
            ));
        }
        if !(self.budget > 0.0 && self.budget <= 1.0) {
            return Err(HlmrfError::Config(format!(
                "budget must be in (0, 1], got {}",
                self.budget
            )));
        }
        if !(self.tolerance >= 0.0) {
            return Err(HlmrfError::Config(format!(
                "tolerance must be >= 0, got {}",
                self.tolerance
            )));
        }
        if self.compute_period == 0 {
            return Err(HlmrfError::Config(
                "compute_period must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Consensus (ADMM) reasoner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmmConfig {
    pub reasoner: ReasonerConfig,

    /// Penalty parameter ρ. Higher values take smaller local steps.
    pub step_size: f64,

    /// Absolute component of the residual stopping test.
    pub epsilon_abs: f64,

    /// Relative component of the residual stopping test.
    pub epsilon_rel: f64,

    /// Worker threads for the parallel phases. 0 = one per core.
    pub num_threads: usize,
}

impl Default for AdmmConfig {
    fn default() -> Self {
        Self {
            reasoner: ReasonerConfig::default(),
            step_size: 1.0,
            epsilon_abs: 1e-5,
            epsilon_rel: 1e-3,
            num_threads: 0,
        }
    }
}

impl AdmmConfig {
    pub fn validate(&self) -> HlmrfResult<()> {
        self.reasoner.validate()?;
        if !(self.step_size > 0.0 && self.step_size.is_finite()) {
            return Err(HlmrfError::Config(format!(
                "step_size must be positive and finite, got {}",
                self.step_size
            )));
        }
        if !(self.epsilon_abs > 0.0) {
            return Err(HlmrfError::Config(format!(
                "epsilon_abs must be > 0, got {}",
                self.epsilon_abs
            )));
        }
        if !(self.epsilon_rel > 0.0) {
            return Err(HlmrfError::Config(format!(
                "epsilon_rel must be > 0, got {}",
                self.epsilon_rel
            )));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> HlmrfResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| HlmrfError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Learning-rate schedule for SGD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LearningSchedule {
    /// `lr = lr0`.
    Constant,
    /// `lr = lr0 / iteration^exponent`.
    StepDecay,
}

/// Per-variable step rule layered on top of the raw partial derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SgdExtension {
    None,
    Adagrad,
    Adam,
}

/// Norm used for the first-order (gradient magnitude) stopping test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GradientNorm {
    L1,
    L2,
    Infinity,
}

impl GradientNorm {
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            GradientNorm::L1 => values.iter().map(|v| v.abs()).sum(),
            GradientNorm::L2 => values.iter().map(|v| v * v).sum::<f64>().sqrt(),
            GradientNorm::Infinity => values.iter().fold(0.0, |m, v| m.max(v.abs())),
        }
    }
}

/// Stochastic gradient reasoner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SgdConfig {
    pub reasoner: ReasonerConfig,
    pub learning_rate: f64,
    pub learning_schedule: LearningSchedule,
    /// Exponent of the STEPDECAY schedule.
    pub inverse_time_exponent: f64,
    pub extension: SgdExtension,
    pub adam_beta1: f64,
    pub adam_beta2: f64,
    /// Denominator guard for ADAGRAD and ADAM.
    pub epsilon: f64,
    /// Recompute the inner potential after every variable update inside
    /// a term (Gauss–Seidel) instead of once per term (Jacobi).
    pub coordinate_step: bool,
    pub first_order_break: bool,
    pub first_order_tolerance: f64,
    pub first_order_norm: GradientNorm,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            reasoner: ReasonerConfig {
                max_iterations: 200,
                ..ReasonerConfig::default()
            },
            learning_rate: 1.0,
            learning_schedule: LearningSchedule::StepDecay,
            inverse_time_exponent: 1.0,
            extension: SgdExtension::None,
            adam_beta1: 0.9,
            adam_beta2: 0.999,
            epsilon: 1e-8,
            coordinate_step: false,
            first_order_break: true,
            first_order_tolerance: 0.01,
            first_order_norm: GradientNorm::Infinity,
        }
    }
}

impl SgdConfig {
    pub fn validate(&self) -> HlmrfResult<()> {
        self.reasoner.validate()?;
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(HlmrfError::Config(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if !(self.inverse_time_exponent >= 0.0) {
            return Err(HlmrfError::Config(format!(
                "inverse_time_exponent must be >= 0, got {}",
                self.inverse_time_exponent
            )));
        }
        for (name, beta) in [("adam_beta1", self.adam_beta1), ("adam_beta2", self.adam_beta2)] {
            if !(0.0..1.0).contains(&beta) {
                return Err(HlmrfError::Config(format!(
                    "{name} must be in [0, 1), got {beta}"
                )));
            }
        }
        if !(self.epsilon > 0.0) {
            return Err(HlmrfError::Config(format!(
                "epsilon must be > 0, got {}",
                self.epsilon
            )));
        }
        if !(self.first_order_tolerance >= 0.0) {
            return Err(HlmrfError::Config(format!(
                "first_order_tolerance must be >= 0, got {}",
                self.first_order_tolerance
            )));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> HlmrfResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| HlmrfError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}

/// Starting value for a freshly created variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InitialValue {
    /// The atom's current truth value in the fact provider.
    Atom,
    Zero,
    Half,
}

/// Term generation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Sum coefficients of repeated atom references into one entry.
    /// Disabling this is a correctness hazard: ADMM would hold two
    /// independent local copies of one variable inside a single term.
    pub merge_duplicate_atoms: bool,
    pub initial_value: InitialValue,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            merge_duplicate_atoms: true,
            initial_value: InitialValue::Atom,
        }
    }
}

/// Paged term store options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Number of terms in a single page.
    pub page_size: usize,
    /// Directory for page files. `None` = fresh temp directory.
    pub page_location: Option<PathBuf>,
    /// Shuffle terms within a page each time it is paged in.
    pub shuffle_page: bool,
    /// Visit pages in a random order on every pass.
    pub randomize_page_access: bool,
    pub seed: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            page_size: 10_000,
            page_location: None,
            shuffle_page: true,
            randomize_page_access: true,
            seed: 4,
        }
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> HlmrfResult<()> {
        if self.page_size == 0 {
            return Err(HlmrfError::Config("page_size must be > 0".to_string()));
        }
        Ok(())
    }

    /// Load from JSON string.
    pub fn from_json(json: &str) -> HlmrfResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| HlmrfError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
