//! Analysis settings and their validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use faultline_quant::Approximation;

/// Contradictory or out-of-range analysis configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettingsError {
    #[error("limit_order must be at least 1, got {0}")]
    LimitOrder(usize),
    #[error("num_sums must be at least 1, got {0}")]
    NumSums(usize),
    #[error("cut_off must lie in [0, 1), got {0}")]
    CutOff(f64),
    #[error("mission_time must be positive, got {0}")]
    MissionTime(f64),
    #[error("num_trials must be at least 1, got {0}")]
    NumTrials(usize),
    #[error("importance analysis requires probability analysis")]
    ImportanceWithoutProbability,
    #[error("uncertainty analysis requires probability analysis")]
    UncertaintyWithoutProbability,
}

/// Settings of one analysis run.
///
/// Builder methods consume and return the value so settings chain:
///
/// ```
/// use faultline::Settings;
/// let settings = Settings::default().probability_analysis(true).num_sums(3);
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub probability_analysis: bool,
    pub importance_analysis: bool,
    pub uncertainty_analysis: bool,
    pub ccf_analysis: bool,
    /// Maximum cut set cardinality.
    pub limit_order: usize,
    /// Inclusion-exclusion truncation level.
    pub num_sums: usize,
    /// Post-minimization probability filter on quantified cut sets.
    pub cut_off: f64,
    pub mission_time: f64,
    pub num_trials: usize,
    /// Master seed; derived from the wall clock when absent.
    pub seed: Option<u64>,
    pub approximation: Approximation,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probability_analysis: false,
            importance_analysis: false,
            uncertainty_analysis: false,
            ccf_analysis: false,
            limit_order: 20,
            num_sums: 7,
            cut_off: 0.0,
            mission_time: 8760.0,
            num_trials: 1000,
            seed: None,
            approximation: Approximation::None,
        }
    }
}

impl Settings {
    pub fn probability_analysis(mut self, flag: bool) -> Self {
        self.probability_analysis = flag;
        self
    }

    pub fn importance_analysis(mut self, flag: bool) -> Self {
        self.importance_analysis = flag;
        self
    }

    pub fn uncertainty_analysis(mut self, flag: bool) -> Self {
        self.uncertainty_analysis = flag;
        self
    }

    pub fn ccf_analysis(mut self, flag: bool) -> Self {
        self.ccf_analysis = flag;
        self
    }

    pub fn limit_order(mut self, limit: usize) -> Self {
        self.limit_order = limit;
        self
    }

    pub fn num_sums(mut self, sums: usize) -> Self {
        self.num_sums = sums;
        self
    }

    pub fn cut_off(mut self, cut_off: f64) -> Self {
        self.cut_off = cut_off;
        self
    }

    pub fn mission_time(mut self, time: f64) -> Self {
        self.mission_time = time;
        self
    }

    pub fn num_trials(mut self, trials: usize) -> Self {
        self.num_trials = trials;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn approximation(mut self, approximation: Approximation) -> Self {
        self.approximation = approximation;
        self
    }

    /// Rejects contradictory combinations and out-of-range values.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.limit_order < 1 {
            return Err(SettingsError::LimitOrder(self.limit_order));
        }
        if self.num_sums < 1 {
            return Err(SettingsError::NumSums(self.num_sums));
        }
        if !(0.0..1.0).contains(&self.cut_off) {
            return Err(SettingsError::CutOff(self.cut_off));
        }
        if self.mission_time <= 0.0 {
            return Err(SettingsError::MissionTime(self.mission_time));
        }
        if self.num_trials < 1 {
            return Err(SettingsError::NumTrials(self.num_trials));
        }
        if self.importance_analysis && !self.probability_analysis {
            return Err(SettingsError::ImportanceWithoutProbability);
        }
        if self.uncertainty_analysis && !self.probability_analysis {
            return Err(SettingsError::UncertaintyWithoutProbability);
        }
        Ok(())
    }
}
