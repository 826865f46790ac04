//! Shared helpers for the benchmark tests.
#![allow(dead_code)]

use std::collections::BTreeSet;

use faultline::{RiskAnalysis, Settings};
use faultline_model::{BasicEventId, Expression, Model};

/// Adds the canonical a/b/c basic events with probabilities 0.1/0.2/0.3.
pub fn abc_events(model: &mut Model) -> (BasicEventId, BasicEventId, BasicEventId) {
    let pa = model.add_expression(Expression::Constant(0.1));
    let pb = model.add_expression(Expression::Constant(0.2));
    let pc = model.add_expression(Expression::Constant(0.3));
    let a = model.add_basic_event("a", Some(pa)).unwrap();
    let b = model.add_basic_event("b", Some(pb)).unwrap();
    let c = model.add_basic_event("c", Some(pc)).unwrap();
    (a, b, c)
}

/// Validates, runs, and returns the finished analysis.
pub fn run(mut model: Model, settings: Settings) -> RiskAnalysis {
    model.validate().unwrap();
    let mut analysis = RiskAnalysis::new(model, settings).unwrap();
    analysis.analyze().unwrap();
    analysis
}

/// Minimal cut sets of the first target as sets of names, complements
/// rendered as `not <name>`.
pub fn min_cut_sets(analysis: &RiskAnalysis) -> BTreeSet<BTreeSet<String>> {
    analysis.results()[0]
        .fault_tree
        .as_ref()
        .expect("qualitative analysis must be present")
        .named_sets()
        .into_iter()
        .map(|set| set.into_iter().collect())
        .collect()
}

/// Top event probability of the first target.
pub fn p_total(analysis: &RiskAnalysis) -> f64 {
    analysis.results()[0]
        .probability
        .as_ref()
        .expect("probability analysis must be present")
        .p_total
}

/// Builds the expected cut set container from name slices.
pub fn expected(sets: &[&[&str]]) -> BTreeSet<BTreeSet<String>> {
    sets.iter()
        .map(|set| set.iter().map(|s| s.to_string()).collect())
        .collect()
}
