//! Top-down minimal cut set generation.
//!
//! MOCUS-style expansion over the normalized working graph: candidates hold
//! a set of signed literals plus a queue of unresolved gates. AND splices
//! its arguments into the candidate, OR forks one successor per argument,
//! AtLeast(k) forks per k-combination. Module gates become pseudo-variables
//! whose own cut sets are computed independently and substituted
//! multiplicatively at the end.
//!
//! Pruning drops candidates that exceed the order limit or contain a
//! complementary literal pair; subsumption after emission guarantees
//! minimality.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::cut_set::{CutSet, CutSetCollection, Literal};
use crate::k_combinations;
use crate::pdag::{Pdag, PdagNode, PdagOp, SignedRef};

/// Cut set generator over one preprocessed working graph.
pub struct Mocus<'p> {
    pdag: &'p Pdag,
    limit_order: usize,
    module_cache: HashMap<usize, Rc<Vec<CutSet>>>,
}

#[derive(Debug, Clone, Default)]
struct Candidate {
    literals: CutSet,
    /// Module gates collected as pseudo-variables, sorted by node index.
    modules: Vec<usize>,
    /// Unresolved gate nodes.
    queue: Vec<usize>,
}

impl<'p> Mocus<'p> {
    pub fn new(pdag: &'p Pdag, limit_order: usize) -> Self {
        Self { pdag, limit_order, module_cache: HashMap::new() }
    }

    /// Generates the minimal cut sets of the graph root.
    pub fn minimal_cut_sets(&mut self) -> CutSetCollection {
        let root = self.pdag.root();
        let collection = match self.pdag.node(root.node) {
            PdagNode::Constant(value) => {
                if value ^ root.complement {
                    CutSetCollection::unity()
                } else {
                    CutSetCollection::null()
                }
            }
            PdagNode::Variable(variable) => {
                let literal = Literal { variable: *variable, complement: root.complement };
                CutSetCollection::new(vec![CutSet::from_literals(vec![literal])])
            }
            PdagNode::Gate(_) => {
                let sets = self.expand(root.node);
                let mut collection = CutSetCollection::new(sets);
                collection.minimize();
                collection
            }
        };
        debug!(cut_sets = collection.len(), "cut set generation finished");
        collection
    }

    /// Full expansion of a gate node into flat literal sets.
    fn expand(&mut self, top: usize) -> Vec<CutSet> {
        let raw = self.expand_candidates(top);
        let mut resolved = Vec::new();
        for (literals, modules) in raw {
            self.substitute_modules(literals, &modules, 0, &mut resolved);
        }
        resolved
    }

    fn expand_candidates(&mut self, top: usize) -> Vec<(CutSet, Vec<usize>)> {
        let pdag = self.pdag;
        let mut results = Vec::new();
        let mut stack = vec![Candidate { queue: vec![top], ..Default::default() }];
        while let Some(mut candidate) = stack.pop() {
            let Some(gate_index) = candidate.queue.pop() else {
                results.push((candidate.literals, candidate.modules));
                continue;
            };
            let PdagNode::Gate(gate) = pdag.node(gate_index) else {
                continue; // only gates are queued
            };
            match gate.op {
                PdagOp::And => {
                    if let Some(successor) =
                        self.apply_args(&candidate, gate.args.iter().copied())
                    {
                        stack.push(successor);
                    }
                }
                PdagOp::Or => {
                    for &arg in &gate.args {
                        if let Some(successor) =
                            self.apply_args(&candidate, std::iter::once(arg))
                        {
                            stack.push(successor);
                        }
                    }
                }
                PdagOp::AtLeast(min) => {
                    for combination in k_combinations(gate.args.len(), min) {
                        let chosen = combination.iter().map(|&i| gate.args[i]);
                        if let Some(successor) = self.apply_args(&candidate, chosen) {
                            stack.push(successor);
                        }
                    }
                }
            }
        }
        results
    }

    /// Applies a conjunction of arguments to a candidate.
    ///
    /// Returns `None` when the candidate dies: a complementary literal pair,
    /// the order limit, or an absorbing constant.
    fn apply_args(
        &self,
        base: &Candidate,
        args: impl Iterator<Item = SignedRef>,
    ) -> Option<Candidate> {
        let mut candidate = base.clone();
        for arg in args {
            match self.pdag.node(arg.node) {
                PdagNode::Constant(value) => {
                    if !(value ^ arg.complement) {
                        return None;
                    }
                }
                PdagNode::Variable(variable) => {
                    let literal =
                        Literal { variable: *variable, complement: arg.complement };
                    if !candidate.literals.insert(literal) {
                        return None;
                    }
                    if candidate.literals.order() > self.limit_order {
                        return None;
                    }
                }
                PdagNode::Gate(gate) => {
                    if gate.module {
                        if let Err(position) = candidate.modules.binary_search(&arg.node) {
                            candidate.modules.insert(position, arg.node);
                        }
                    } else {
                        candidate.queue.push(arg.node);
                    }
                }
            }
        }
        Some(candidate)
    }

    /// Solves a module gate once and caches its minimal cut sets.
    fn solve_module(&mut self, index: usize) -> Rc<Vec<CutSet>> {
        if let Some(cached) = self.module_cache.get(&index) {
            return cached.clone();
        }
        let sets = self.expand(index);
        let mut collection = CutSetCollection::new(sets);
        collection.minimize();
        let sets = Rc::new(collection.sets().to_vec());
        self.module_cache.insert(index, sets.clone());
        sets
    }

    /// Cartesian substitution of module cut sets into a candidate,
    /// lowest node index first.
    fn substitute_modules(
        &mut self,
        literals: CutSet,
        modules: &[usize],
        next: usize,
        out: &mut Vec<CutSet>,
    ) {
        if next == modules.len() {
            if literals.order() <= self.limit_order {
                out.push(literals);
            }
            return;
        }
        let module_sets = self.solve_module(modules[next]);
        for set in module_sets.iter() {
            if let Some(merged) = literals.union(set) {
                if merged.order() <= self.limit_order {
                    self.substitute_modules(merged, modules, next + 1, out);
                }
            }
        }
    }
}
