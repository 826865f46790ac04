//! Graph rewriting passes over the working graph.
//!
//! The passes transform an arbitrary fault tree graph into the normalized
//! form the cut set engine expects:
//!
//! 1. complement pushing: every gate is referenced positively, with NOT
//!    resolved into the leaves by De Morgan and the AtLeast dual;
//! 2. constant folding: house event constants propagate upward, absorbing
//!    and neutral elements are removed, single-argument gates are elided;
//! 3. coalescing: an AND child of an AND parent (likewise OR) with a single
//!    parent is spliced into the parent;
//! 4. common subexpression detection: gates are hash-consed by
//!    (operator, sorted argument set);
//! 5. module detection: gates whose descendants have no connection to the
//!    rest of the graph become atomic module nodes solved independently.
//!
//! All passes preserve the Boolean function of the graph.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::pdag::{Pdag, PdagGate, PdagNode, PdagOp, SignedRef};

/// Runs every rewrite pass to fixed point and marks modules.
pub fn preprocess(pdag: &mut Pdag) {
    normalize(pdag);
    loop {
        let coalesced = coalesce(pdag);
        let normalized = normalize(pdag);
        if !coalesced && !normalized {
            break;
        }
    }
    detect_modules(pdag);
    debug!(
        nodes = pdag.node_count(),
        variables = pdag.variables().len(),
        "preprocessing finished"
    );
}

// ============================================================================
// Complement pushing, constant folding, hash-consing
// ============================================================================

struct Normalizer<'p> {
    old: &'p [PdagNode],
    nodes: Vec<PdagNode>,
    memo: HashMap<(usize, bool), SignedRef>,
    variable_nodes: HashMap<usize, usize>,
    cse: HashMap<(PdagOp, Vec<SignedRef>), usize>,
    constants: [Option<usize>; 2],
    changed: bool,
}

/// Rebuilds the graph with complements pushed to the leaves, constants
/// folded, and structurally equal gates merged. Returns whether anything
/// was rewritten.
fn normalize(pdag: &mut Pdag) -> bool {
    let old = std::mem::take(&mut pdag.nodes);
    let mut normalizer = Normalizer {
        old: &old,
        nodes: Vec::new(),
        memo: HashMap::new(),
        variable_nodes: HashMap::new(),
        cse: HashMap::new(),
        constants: [None, None],
        changed: false,
    };
    let root = normalizer.rewrite(pdag.root);
    pdag.root = root;
    pdag.nodes = normalizer.nodes;
    normalizer.changed
}

impl Normalizer<'_> {
    fn constant(&mut self, value: bool) -> SignedRef {
        let slot = usize::from(value);
        let node = match self.constants[slot] {
            Some(node) => node,
            None => {
                let node = self.nodes.len();
                self.nodes.push(PdagNode::Constant(value));
                self.constants[slot] = Some(node);
                node
            }
        };
        SignedRef::positive(node)
    }

    fn rewrite(&mut self, reference: SignedRef) -> SignedRef {
        let key = (reference.node, reference.complement);
        if let Some(&cached) = self.memo.get(&key) {
            return cached;
        }
        let result = match &self.old[reference.node] {
            PdagNode::Constant(value) => {
                if reference.complement {
                    self.changed = true;
                }
                self.constant(value ^ reference.complement)
            }
            PdagNode::Variable(variable) => {
                let variable = *variable;
                let node = match self.variable_nodes.get(&variable) {
                    Some(&node) => node,
                    None => {
                        let node = self.nodes.len();
                        self.nodes.push(PdagNode::Variable(variable));
                        self.variable_nodes.insert(variable, node);
                        node
                    }
                };
                SignedRef { node, complement: reference.complement }
            }
            PdagNode::Gate(gate) => {
                let (op, args) = if reference.complement {
                    // De Morgan / AtLeast dual pushes the complement down.
                    self.changed = true;
                    let op = match gate.op {
                        PdagOp::And => PdagOp::Or,
                        PdagOp::Or => PdagOp::And,
                        PdagOp::AtLeast(min) => PdagOp::AtLeast(gate.args.len() - min + 1),
                    };
                    let args: Vec<SignedRef> =
                        gate.args.iter().map(|a| a.complemented()).collect();
                    (op, args)
                } else {
                    (gate.op, gate.args.clone())
                };
                let args: Vec<SignedRef> = args.into_iter().map(|a| self.rewrite(a)).collect();
                self.simplify(op, args)
            }
        };
        self.memo.insert(key, result);
        result
    }

    /// Folds constants and degenerate shapes out of a gate.
    fn simplify(&mut self, op: PdagOp, args: Vec<SignedRef>) -> SignedRef {
        match op {
            PdagOp::And | PdagOp::Or => self.simplify_flat(op, args),
            PdagOp::AtLeast(min) => self.simplify_atleast(min, args),
        }
    }

    fn simplify_flat(&mut self, op: PdagOp, args: Vec<SignedRef>) -> SignedRef {
        // For AND: true is neutral, false absorbing; dual for OR.
        let absorbing = matches!(op, PdagOp::Or);
        let mut kept: Vec<SignedRef> = Vec::with_capacity(args.len());
        let mut seen: HashSet<SignedRef> = HashSet::new();
        for arg in args {
            if let PdagNode::Constant(value) = self.nodes[arg.node] {
                self.changed = true;
                if value ^ arg.complement == absorbing {
                    return self.constant(absorbing);
                }
                continue; // neutral element
            }
            if seen.contains(&arg.complemented()) {
                // x AND !x is false; x OR !x is true.
                self.changed = true;
                return self.constant(absorbing);
            }
            if seen.insert(arg) {
                kept.push(arg);
            } else {
                self.changed = true;
            }
        }
        match kept.len() {
            0 => {
                self.changed = true;
                self.constant(!absorbing)
            }
            1 => {
                self.changed = true;
                kept[0]
            }
            _ => self.cons_gate(op, kept),
        }
    }

    fn simplify_atleast(&mut self, min: usize, args: Vec<SignedRef>) -> SignedRef {
        let mut min = min;
        let mut kept: Vec<SignedRef> = Vec::with_capacity(args.len());
        for arg in args {
            if let PdagNode::Constant(value) = self.nodes[arg.node] {
                self.changed = true;
                if value ^ arg.complement {
                    min = min.saturating_sub(1);
                }
                continue;
            }
            kept.push(arg);
        }
        // A complementary pair always contributes exactly one truth.
        loop {
            let pair = kept.iter().enumerate().find_map(|(i, &a)| {
                kept.iter()
                    .position(|&b| b == a.complemented())
                    .map(|j| (i.min(j), i.max(j)))
            });
            match pair {
                Some((i, j)) => {
                    self.changed = true;
                    kept.remove(j);
                    kept.remove(i);
                    min = min.saturating_sub(1);
                }
                None => break,
            }
        }
        let n = kept.len();
        if min == 0 {
            self.changed = true;
            return self.constant(true);
        }
        if min > n {
            self.changed = true;
            return self.constant(false);
        }
        if min == n {
            self.changed = true;
            return self.simplify_flat(PdagOp::And, kept);
        }
        if min == 1 {
            self.changed = true;
            return self.simplify_flat(PdagOp::Or, kept);
        }
        self.cons_gate(PdagOp::AtLeast(min), kept)
    }

    fn cons_gate(&mut self, op: PdagOp, args: Vec<SignedRef>) -> SignedRef {
        let mut key_args = args.clone();
        key_args.sort_unstable_by_key(|a| (a.node, a.complement));
        let key = (op, key_args);
        if let Some(&node) = self.cse.get(&key) {
            self.changed = true;
            return SignedRef::positive(node);
        }
        let node = self.nodes.len();
        self.nodes.push(PdagNode::Gate(PdagGate { op, args, module: false }));
        self.cse.insert(key, node);
        SignedRef::positive(node)
    }
}

// ============================================================================
// Gate coalescing
// ============================================================================

/// Splices single-parent AND-of-AND and OR-of-OR children into their
/// parents. Returns whether anything was spliced.
fn coalesce(pdag: &mut Pdag) -> bool {
    let counts = reference_counts(pdag);
    let old = std::mem::take(&mut pdag.nodes);
    let mut memo: HashMap<usize, usize> = HashMap::new();
    let mut nodes: Vec<PdagNode> = Vec::new();
    let mut changed = false;
    let root_node = rewrite_coalesce(
        pdag.root.node,
        &old,
        &counts,
        &mut memo,
        &mut nodes,
        &mut changed,
    );
    pdag.root = SignedRef { node: root_node, complement: pdag.root.complement };
    pdag.nodes = nodes;
    changed
}

fn rewrite_coalesce(
    index: usize,
    old: &[PdagNode],
    counts: &HashMap<usize, usize>,
    memo: &mut HashMap<usize, usize>,
    nodes: &mut Vec<PdagNode>,
    changed: &mut bool,
) -> usize {
    if let Some(&cached) = memo.get(&index) {
        return cached;
    }
    let rebuilt = match &old[index] {
        PdagNode::Constant(value) => PdagNode::Constant(*value),
        PdagNode::Variable(variable) => PdagNode::Variable(*variable),
        PdagNode::Gate(gate) => {
            let mut args: Vec<SignedRef> = Vec::with_capacity(gate.args.len());
            for arg in &gate.args {
                let node = rewrite_coalesce(arg.node, old, counts, memo, nodes, changed);
                let reference = SignedRef { node, complement: arg.complement };
                let spliceable = !reference.complement
                    && matches!(gate.op, PdagOp::And | PdagOp::Or)
                    && counts.get(&arg.node).copied().unwrap_or(0) == 1
                    && matches!(&nodes[node],
                        PdagNode::Gate(child) if child.op == gate.op && !child.module);
                if spliceable {
                    if let PdagNode::Gate(child) = nodes[node].clone() {
                        args.extend(child.args);
                        *changed = true;
                        continue;
                    }
                }
                args.push(reference);
            }
            PdagNode::Gate(PdagGate { op: gate.op, args, module: gate.module })
        }
    };
    let node = nodes.len();
    nodes.push(rebuilt);
    memo.insert(index, node);
    node
}

/// How many gate arguments reference each node, plus the root.
fn reference_counts(pdag: &Pdag) -> HashMap<usize, usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    *counts.entry(pdag.root.node).or_insert(0) += 1;
    let mut stack = vec![pdag.root.node];
    let mut visited = HashSet::new();
    while let Some(index) = stack.pop() {
        if !visited.insert(index) {
            continue;
        }
        if let PdagNode::Gate(gate) = pdag.node(index) {
            for arg in &gate.args {
                *counts.entry(arg.node).or_insert(0) += 1;
                stack.push(arg.node);
            }
        }
    }
    counts
}

// ============================================================================
// Module detection
// ============================================================================

/// Marks gates whose sub-DAGs share nothing with the rest of the graph.
///
/// Such a gate behaves as an independent variable of its parent: its cut
/// sets are computed separately and substituted multiplicatively.
fn detect_modules(pdag: &mut Pdag) {
    let mut parents: HashMap<usize, HashSet<usize>> = HashMap::new();
    let mut reachable: Vec<usize> = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![pdag.root.node];
    while let Some(index) = stack.pop() {
        if !visited.insert(index) {
            continue;
        }
        reachable.push(index);
        if let PdagNode::Gate(gate) = pdag.node(index) {
            for arg in &gate.args {
                parents.entry(arg.node).or_default().insert(index);
                stack.push(arg.node);
            }
        }
    }

    let mut modules = Vec::new();
    for &index in &reachable {
        if index == pdag.root.node {
            continue;
        }
        if !matches!(pdag.node(index), PdagNode::Gate(_)) {
            continue;
        }
        let descendants = descendants_of(pdag, index);
        let exclusive = descendants.iter().all(|d| {
            parents
                .get(d)
                .map(|ps| ps.iter().all(|p| *p == index || descendants.contains(p)))
                .unwrap_or(true)
        });
        if exclusive {
            modules.push(index);
        }
    }
    for index in modules {
        if let PdagNode::Gate(gate) = &mut pdag.nodes[index] {
            gate.module = true;
        }
    }
}

fn descendants_of(pdag: &Pdag, index: usize) -> HashSet<usize> {
    let mut result = HashSet::new();
    let mut stack: Vec<usize> = match pdag.node(index) {
        PdagNode::Gate(gate) => gate.args.iter().map(|a| a.node).collect(),
        _ => Vec::new(),
    };
    while let Some(node) = stack.pop() {
        if !result.insert(node) {
            continue;
        }
        if let PdagNode::Gate(gate) = pdag.node(node) {
            stack.extend(gate.args.iter().map(|a| a.node));
        }
    }
    result
}
