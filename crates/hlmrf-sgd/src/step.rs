// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — SGD Step Rules
// ─────────────────────────────────────────────────────────────────────
//! Learning-rate schedules, per-term partial derivatives, and the
//! per-variable step extensions (plain, ADAGRAD, ADAM).

use hlmrf_core::TermKind;
use hlmrf_types::{LearningSchedule, SgdConfig, SgdExtension};

/// Base learning rate for a 1-based iteration.
pub fn learning_rate(config: &SgdConfig, iteration: usize) -> f64 {
    match config.learning_schedule {
        LearningSchedule::Constant => config.learning_rate,
        LearningSchedule::StepDecay => {
            config.learning_rate / (iteration.max(1) as f64).powf(config.inverse_time_exponent)
        }
    }
}

/// d(loss)/d(x_i) for one term, given the inner potential `a·x − c` and
/// the coefficient `a_i`. Inactive hinges contribute nothing.
#[inline]
pub fn partial(kind: TermKind, weight: f64, inner: f64, coefficient: f64) -> f64 {
    match kind {
        TermKind::Linear => weight * coefficient,
        TermKind::SquaredLinear => 2.0 * weight * inner * coefficient,
        TermKind::Hinge if inner <= 0.0 => 0.0,
        TermKind::Hinge => weight * coefficient,
        TermKind::SquaredHinge if inner <= 0.0 => 0.0,
        TermKind::SquaredHinge => 2.0 * weight * inner * coefficient,
        TermKind::Constraint(_) => 0.0,
    }
}

/// Per-variable optimizer state for the configured extension.
#[derive(Debug, Clone)]
pub struct StepRule {
    extension: SgdExtension,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    /// ADAGRAD: running sum of squared gradients.
    /// ADAM: first-moment EMA.
    first: Vec<f64>,
    /// ADAM: second-moment EMA.
    second: Vec<f64>,
}

impl StepRule {
    pub fn new(config: &SgdConfig, num_variables: usize) -> Self {
        let (first, second) = match config.extension {
            SgdExtension::None => (Vec::new(), Vec::new()),
            SgdExtension::Adagrad => (vec![0.0; num_variables], Vec::new()),
            SgdExtension::Adam => (vec![0.0; num_variables], vec![0.0; num_variables]),
        };
        Self {
            extension: config.extension,
            beta1: config.adam_beta1,
            beta2: config.adam_beta2,
            epsilon: config.epsilon,
            first,
            second,
        }
    }

    /// Amount to subtract from variable `v` for raw gradient `g`.
    pub fn step(&mut self, v: usize, g: f64, lr: f64, iteration: usize) -> f64 {
        match self.extension {
            SgdExtension::None => g * lr,
            SgdExtension::Adagrad => {
                let acc = &mut self.first[v];
                *acc += g * g;
                g * lr / (*acc + self.epsilon).sqrt()
            }
            SgdExtension::Adam => {
                let t = iteration.max(1) as i32;
                let m = &mut self.first[v];
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                let m_hat = *m / (1.0 - self.beta1.powi(t));
                let s = &mut self.second[v];
                *s = self.beta2 * *s + (1.0 - self.beta2) * g * g;
                let s_hat = *s / (1.0 - self.beta2.powi(t));
                m_hat * lr / (s_hat.sqrt() + self.epsilon)
            }
        }
    }
}
