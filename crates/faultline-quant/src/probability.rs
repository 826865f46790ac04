//! Top event probability from minimal cut sets.
//!
//! Three evaluation modes:
//! - rare-event approximation: the first inclusion-exclusion sum;
//! - min-cut upper bound (MCUB): `1 - prod(1 - P(C_j))`;
//! - truncated inclusion-exclusion: exact up to `num_sums` alternating
//!   levels, via `P(C | R) = P(C) + P(R) - P(C & R)` where unions with
//!   complementary literals vanish.
//!
//! Literal probabilities treat a complemented variable as `1 - p`.

use serde::{Deserialize, Serialize};

use faultline_core::{CutSet, CutSetCollection, Literal};

/// Quantification mode selected by the analysis settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Approximation {
    /// Sum of cut set probabilities.
    RareEvent,
    /// Min-cut upper bound.
    Mcub,
    /// Truncated inclusion-exclusion; exact for enough sums.
    #[default]
    None,
}

/// Probability of a single literal.
pub fn literal_probability(literal: Literal, probabilities: &[f64]) -> f64 {
    let p = probabilities[literal.variable];
    if literal.complement {
        1.0 - p
    } else {
        p
    }
}

/// Product probability of one cut set; the empty set has probability one.
pub fn cut_set_probability(set: &CutSet, probabilities: &[f64]) -> f64 {
    set.iter()
        .map(|&l| literal_probability(l, probabilities))
        .product()
}

/// Rare-event approximation: the first inclusion-exclusion sum.
pub fn rare_event(sets: &[CutSet], probabilities: &[f64]) -> f64 {
    sets.iter().map(|s| cut_set_probability(s, probabilities)).sum()
}

/// Min-cut upper bound.
pub fn mcub(sets: &[CutSet], probabilities: &[f64]) -> f64 {
    1.0 - sets
        .iter()
        .map(|s| 1.0 - cut_set_probability(s, probabilities))
        .product::<f64>()
}

/// Inclusion-exclusion truncated to `num_sums` alternating levels.
///
/// Exact when `num_sums` reaches the collection size and the literals are
/// statistically independent.
pub fn inclusion_exclusion(sets: &[CutSet], probabilities: &[f64], num_sums: usize) -> f64 {
    if num_sums == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for (i, set) in sets.iter().enumerate() {
        total += cut_set_probability(set, probabilities);
        // Subtract P(set & (union of the remaining sets)); an intersection
        // containing a complementary pair contributes nothing.
        let combined: Vec<CutSet> =
            sets[i + 1..].iter().filter_map(|rest| set.union(rest)).collect();
        total -= inclusion_exclusion(&combined, probabilities, num_sums - 1);
    }
    total
}

/// Evaluates the collection probability under the given mode.
///
/// `cut_off` filters already-minimized cut sets out of quantification by
/// probability; it never affects the reported cut sets themselves.
pub fn probability(
    collection: &CutSetCollection,
    probabilities: &[f64],
    approximation: Approximation,
    num_sums: usize,
    cut_off: f64,
) -> f64 {
    let sets: Vec<CutSet> = collection
        .iter()
        .filter(|s| cut_set_probability(s, probabilities) >= cut_off)
        .cloned()
        .collect();
    match approximation {
        Approximation::RareEvent => rare_event(&sets, probabilities),
        Approximation::Mcub => mcub(&sets, probabilities),
        Approximation::None => inclusion_exclusion(&sets, probabilities, num_sums),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(literals: &[(usize, bool)]) -> CutSet {
        CutSet::from_literals(
            literals
                .iter()
                .map(|&(v, c)| Literal { variable: v, complement: c })
                .collect(),
        )
    }

    const P: [f64; 3] = [0.1, 0.2, 0.3];

    #[test]
    fn test_singletons_exact() {
        // P(a | b | c) = 0.496 for independent events.
        let sets = vec![set(&[(0, false)]), set(&[(1, false)]), set(&[(2, false)])];
        let p = inclusion_exclusion(&sets, &P, 7);
        assert!((p - 0.496).abs() < 1e-12);
    }

    #[test]
    fn test_shared_event_intersection() {
        // P(ab | bc) = 0.02 + 0.06 - 0.006 = 0.074.
        let sets = vec![set(&[(0, false), (1, false)]), set(&[(1, false), (2, false)])];
        let p = inclusion_exclusion(&sets, &P, 7);
        assert!((p - 0.074).abs() < 1e-12);
    }

    #[test]
    fn test_truncation_levels() {
        let sets = vec![set(&[(0, false)]), set(&[(1, false)]), set(&[(2, false)])];
        // One sum equals the rare-event approximation.
        let level1 = inclusion_exclusion(&sets, &P, 1);
        assert!((level1 - 0.6).abs() < 1e-12);
        let level2 = inclusion_exclusion(&sets, &P, 2);
        assert!((level2 - (0.6 - 0.11)).abs() < 1e-12);
        let level3 = inclusion_exclusion(&sets, &P, 3);
        assert!((level3 - 0.496).abs() < 1e-12);
    }

    #[test]
    fn test_unity_and_null() {
        let unity = CutSetCollection::unity();
        assert_eq!(probability(&unity, &P, Approximation::None, 7, 0.0), 1.0);
        let null = CutSetCollection::null();
        assert_eq!(probability(&null, &P, Approximation::None, 7, 0.0), 0.0);
    }

    #[test]
    fn test_complementary_intersection_vanishes() {
        // P(a | !a) = 1; the pairwise intersection is contradictory.
        let sets = vec![set(&[(0, false)]), set(&[(0, true)])];
        let p = inclusion_exclusion(&sets, &P, 7);
        assert!((p - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_literal_probability() {
        // P(a & !b) = 0.1 * 0.8.
        let sets = vec![set(&[(0, false), (1, true)])];
        let p = inclusion_exclusion(&sets, &P, 7);
        assert!((p - 0.08).abs() < 1e-12);
    }

    #[test]
    fn test_approximation_ordering() {
        let sets = vec![
            set(&[(0, false)]),
            set(&[(1, false)]),
            set(&[(1, false), (2, false)]),
        ];
        let collection = CutSetCollection::new(sets.clone());
        let exact = probability(&collection, &P, Approximation::None, sets.len(), 0.0);
        let upper = mcub(&sets, &P);
        let rare = rare_event(&sets, &P);
        assert!(rare >= upper);
        assert!(upper >= exact);
        assert!(exact >= 0.0);
    }

    #[test]
    fn test_cut_off_filters_small_sets() {
        let sets = vec![set(&[(0, false)]), set(&[(1, false), (2, false)])];
        let collection = CutSetCollection::new(sets);
        let all = probability(&collection, &P, Approximation::RareEvent, 1, 0.0);
        let filtered = probability(&collection, &P, Approximation::RareEvent, 1, 0.07);
        assert!((all - 0.16).abs() < 1e-12);
        assert!((filtered - 0.1).abs() < 1e-12);
    }
}
