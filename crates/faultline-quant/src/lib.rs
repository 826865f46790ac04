#![allow(dead_code, unused_variables, unused_imports)]
//! # Faultline Quant
//!
//! Quantification of minimal cut sets:
//! - [`probability`]: rare-event, min-cut upper bound, and truncated
//!   inclusion-exclusion evaluation;
//! - [`importance`]: Fussell-Vesely, Birnbaum, criticality, RRW, RAW;
//! - [`uncertainty`]: seeded Monte-Carlo propagation with quantiles and
//!   histograms.

use thiserror::Error;

pub mod importance;
pub mod probability;
pub mod uncertainty;

pub use importance::{importance, ImportanceFactors};
pub use probability::{
    cut_set_probability, inclusion_exclusion, mcub, probability, rare_event, Approximation,
};
pub use uncertainty::{monte_carlo, quantile, HistogramBin, UncertaintyAnalysis};

/// Quantification-phase errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuantError {
    #[error("{failed} of {trials} uncertainty trials failed numerically")]
    ExcessiveTrialFailures { failed: usize, trials: usize },
    #[error(transparent)]
    Numerical(#[from] faultline_model::NumericalError),
}
