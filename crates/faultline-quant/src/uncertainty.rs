//! Monte-Carlo uncertainty propagation.
//!
//! Each trial samples every distribution-valued parameter once, recomputes
//! the basic event probabilities, and re-quantifies the fixed cut set
//! structure. Trials that violate numeric domains (a sampled probability
//! outside [0, 1]) are discarded and counted; the run fails once the
//! discarded fraction reaches one percent of the requested trials.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use faultline_model::NumericalError;

use crate::QuantError;

/// Number of bins in the reported histogram.
pub const HISTOGRAM_BINS: usize = 20;

/// Fraction of failed trials tolerated before the run is aborted.
pub const TRIAL_FAILURE_LIMIT: f64 = 0.01;

/// One histogram bin: the inclusive upper edge and the sample count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub upper: f64,
    pub count: usize,
}

/// Statistics of a Monte-Carlo uncertainty run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyAnalysis {
    pub mean: f64,
    pub std_dev: f64,
    /// 5% quantile by nearest rank, ties high.
    pub quantile_05: f64,
    /// 95% quantile by nearest rank, ties high.
    pub quantile_95: f64,
    /// `sqrt(q95 / q05)`, the log-normal style error factor.
    pub error_factor: f64,
    pub histogram: Vec<HistogramBin>,
    /// Sorted sample values; the empirical CDF.
    pub samples: Vec<f64>,
    pub discarded_trials: usize,
}

impl UncertaintyAnalysis {
    /// The empirical CDF as (value, cumulative probability) points.
    pub fn cdf(&self) -> Vec<(f64, f64)> {
        let n = self.samples.len() as f64;
        self.samples
            .iter()
            .enumerate()
            .map(|(i, &v)| (v, (i + 1) as f64 / n))
            .collect()
    }
}

/// Nearest-rank quantile over an ascending sorted slice, ties broken high.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Runs `num_trials` Monte-Carlo trials.
///
/// `sample_probabilities` draws one full probability vector per trial;
/// `quantify` evaluates the top event probability from that vector over
/// the fixed cut sets.
pub fn monte_carlo(
    num_trials: usize,
    seed: u64,
    mut sample_probabilities: impl FnMut(&mut StdRng) -> Result<Vec<f64>, NumericalError>,
    quantify: impl Fn(&[f64]) -> f64,
) -> Result<UncertaintyAnalysis, QuantError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(num_trials);
    let mut discarded = 0usize;
    let failure_limit =
        ((num_trials as f64 * TRIAL_FAILURE_LIMIT).ceil() as usize).max(1);

    for _ in 0..num_trials {
        match sample_probabilities(&mut rng) {
            Ok(probabilities)
                if probabilities.iter().all(|p| (0.0..=1.0).contains(p)) =>
            {
                samples.push(quantify(&probabilities));
            }
            _ => {
                discarded += 1;
                if discarded >= failure_limit {
                    return Err(QuantError::ExcessiveTrialFailures {
                        failed: discarded,
                        trials: num_trials,
                    });
                }
            }
        }
    }
    debug!(trials = samples.len(), discarded, "uncertainty sampling finished");
    Ok(statistics(samples, discarded))
}

fn statistics(mut samples: Vec<f64>, discarded_trials: usize) -> UncertaintyAnalysis {
    samples.sort_unstable_by(|a, b| a.partial_cmp(b).expect("samples are finite"));
    let n = samples.len();
    let mean = samples.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };
    let quantile_05 = quantile(&samples, 0.05);
    let quantile_95 = quantile(&samples, 0.95);
    let error_factor = if quantile_05 > 0.0 {
        (quantile_95 / quantile_05).sqrt()
    } else {
        f64::INFINITY
    };

    let low = samples[0];
    let high = samples[n - 1];
    let width = (high - low) / HISTOGRAM_BINS as f64;
    let mut histogram: Vec<HistogramBin> = (0..HISTOGRAM_BINS)
        .map(|i| HistogramBin { upper: low + width * (i + 1) as f64, count: 0 })
        .collect();
    for &sample in &samples {
        let bin = if width > 0.0 {
            (((sample - low) / width) as usize).min(HISTOGRAM_BINS - 1)
        } else {
            0
        };
        histogram[bin].count += 1;
    }

    UncertaintyAnalysis {
        mean,
        std_dev: variance.sqrt(),
        quantile_05,
        quantile_95,
        error_factor,
        histogram,
        samples,
        discarded_trials,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_nearest_rank() {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(quantile(&sorted, 0.05), 1.0);
        assert_eq!(quantile(&sorted, 0.5), 5.0);
        assert_eq!(quantile(&sorted, 0.95), 10.0);
        assert_eq!(quantile(&sorted, 1.0), 10.0);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let run = |seed| {
            monte_carlo(
                200,
                seed,
                |rng| {
                    use rand::Rng;
                    Ok(vec![rng.gen_range(0.0..1.0)])
                },
                |p| p[0],
            )
            .unwrap()
        };
        let first = run(42);
        let second = run(42);
        assert_eq!(first, second);
        let other = run(43);
        assert_ne!(first.mean, other.mean);
    }

    #[test]
    fn test_constant_samples() {
        let result = monte_carlo(50, 1, |_| Ok(vec![0.25]), |p| p[0]).unwrap();
        assert_eq!(result.mean, 0.25);
        assert_eq!(result.std_dev, 0.0);
        assert_eq!(result.quantile_05, 0.25);
        assert_eq!(result.quantile_95, 0.25);
        assert_eq!(result.histogram.iter().map(|b| b.count).sum::<usize>(), 50);
    }

    #[test]
    fn test_failure_threshold_aborts() {
        // Every trial yields an out-of-range probability.
        let result = monte_carlo(100, 1, |_| Ok(vec![1.5]), |p| p[0]);
        assert!(matches!(
            result,
            Err(QuantError::ExcessiveTrialFailures { .. })
        ));
    }

    #[test]
    fn test_uniform_moments() {
        let result = monte_carlo(
            20_000,
            7,
            |rng| {
                use rand::Rng;
                Ok(vec![rng.gen_range(0.0..1.0)])
            },
            |p| p[0],
        )
        .unwrap();
        assert!((result.mean - 0.5).abs() < 0.02);
        // Uniform std dev is 1/sqrt(12).
        assert!((result.std_dev - 0.2887).abs() < 0.01);
        assert!((result.quantile_05 - 0.05).abs() < 0.02);
        assert!((result.quantile_95 - 0.95).abs() < 0.02);
    }
}
