#![allow(dead_code, unused_variables, unused_imports)]
//! # Faultline Core
//!
//! Working-graph machinery of the analysis engine:
//! - [`pdag`]: the per-target propositional DAG built from the model,
//!   including operator normalization and CCF expansion;
//! - [`preprocess`]: rewriting passes (constant folding, complement
//!   pushing, coalescing, common subexpression merging, module detection);
//! - [`mocus`]: top-down minimal cut set generation with order cut-off;
//! - [`cut_set`]: the cut set containers with subsumption minimization.

pub mod cut_set;
pub mod mocus;
pub mod pdag;
pub mod preprocess;

pub use cut_set::{CutSet, CutSetCollection, Literal};
pub use mocus::Mocus;
pub use pdag::{Pdag, PdagNode, PdagOp, SignedRef, Variable, VariableOrigin};
pub use preprocess::preprocess;

/// All k-element combinations of `0..n` in lexicographic order.
pub(crate) fn k_combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    fn recurse(
        start: usize,
        n: usize,
        k: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if current.len() == k {
            out.push(current.clone());
            return;
        }
        for i in start..n {
            if n - i < k - current.len() {
                break;
            }
            current.push(i);
            recurse(i + 1, n, k, current, out);
            current.pop();
        }
    }
    let mut out = Vec::new();
    if k <= n {
        let mut current = Vec::new();
        recurse(0, n, k, &mut current, &mut out);
    }
    out
}
