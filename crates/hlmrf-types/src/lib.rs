// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — HL-MRF Kernel Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! hinge-loss MRF inference kernel.
//!
//! Everything here is plain data: atom and rule handles, hyperplanes
//! produced by grounding, reasoner/store configuration, and the report
//! returned by an optimization run.

pub mod config;
pub mod error;
pub mod model;
pub mod report;

pub use config::{
    AdmmConfig, GeneratorConfig, GradientNorm, InitialValue, LearningSchedule, ReasonerConfig,
    SgdConfig, SgdExtension, StreamingConfig,
};
pub use error::{HlmrfError, HlmrfResult};
pub use model::{AtomId, Comparator, Hyperplane, RuleId, RuleInfo, RuleRegistry};
pub use report::{clamp_unit, ObjectiveResult, OptimizationReport};
