//! Importance measures of basic events.
//!
//! Each variable appearing in the minimal cut sets is ranked by
//! re-evaluating the top event probability with the variable forced to
//! certain failure (p = 1) and certain success (p = 0) under the same
//! quantification mode as the main result.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use faultline_core::CutSetCollection;

use crate::probability::{probability, Approximation};

/// Importance measures of one working-graph variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceFactors {
    pub variable: usize,
    /// Number of minimal cut sets containing the variable.
    pub occurrences: usize,
    /// Fussell-Vesely: fractional contribution to the top event.
    pub fussell_vesely: f64,
    /// Birnbaum: sensitivity of the top event to the variable.
    pub birnbaum: f64,
    /// Criticality: Birnbaum weighted by the event probability.
    pub criticality: f64,
    /// Risk reduction worth (ratio form).
    pub rrw: f64,
    /// Risk achievement worth.
    pub raw: f64,
}

/// Ratio with the conventional infinite sentinel for a zero denominator.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::INFINITY
    } else {
        numerator / denominator
    }
}

/// Computes importance measures for every variable present in the cut sets.
///
/// `p_total` is the already-computed top event probability under the same
/// mode. The output is ordered by variable index.
pub fn importance(
    collection: &CutSetCollection,
    probabilities: &[f64],
    approximation: Approximation,
    num_sums: usize,
    cut_off: f64,
    p_total: f64,
) -> Vec<ImportanceFactors> {
    let variables: BTreeSet<usize> = collection
        .iter()
        .flat_map(|s| s.iter().map(|l| l.variable))
        .collect();
    let mut results = Vec::with_capacity(variables.len());
    let mut scratch = probabilities.to_vec();
    for variable in variables {
        let original = scratch[variable];
        scratch[variable] = 1.0;
        let p_up = probability(collection, &scratch, approximation, num_sums, cut_off);
        scratch[variable] = 0.0;
        let p_down = probability(collection, &scratch, approximation, num_sums, cut_off);
        scratch[variable] = original;

        let birnbaum = p_up - p_down;
        results.push(ImportanceFactors {
            variable,
            occurrences: collection
                .iter()
                .filter(|s| s.iter().any(|l| l.variable == variable))
                .count(),
            fussell_vesely: ratio(p_total - p_down, p_total),
            birnbaum,
            criticality: ratio(birnbaum * original, p_total),
            rrw: ratio(p_total, p_down),
            raw: ratio(p_up, p_total),
        });
    }
    results
}
