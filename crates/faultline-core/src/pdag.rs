//! Working graph for cut set generation.
//!
//! The PDAG (propositional DAG) is a per-target arena of Boolean nodes built
//! from the read-only model. Construction already performs operator
//! normalization: NOT becomes a complemented reference, NAND/NOR become
//! complemented AND/OR, XOR is expanded pairwise, NULL is elided, and house
//! events become constants. CCF expansion replaces member events with
//! disjunctions over derived common-cause variables.
//!
//! The arena lives for one analysis target and is dropped afterward; the
//! input model is never mutated.

use std::collections::HashMap;

use faultline_model::{
    BasicEventId, CcfGroupId, EventRef, Formula, GateId, HouseEventId, Model, Operator,
};
use serde::{Deserialize, Serialize};

use crate::k_combinations;

/// Signed reference to a PDAG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignedRef {
    pub node: usize,
    pub complement: bool,
}

impl SignedRef {
    pub fn positive(node: usize) -> Self {
        Self { node, complement: false }
    }

    pub fn negative(node: usize) -> Self {
        Self { node, complement: true }
    }

    pub fn complemented(self) -> Self {
        Self { node: self.node, complement: !self.complement }
    }
}

/// Normalized gate operator of the working graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PdagOp {
    And,
    Or,
    AtLeast(usize),
}

/// A gate node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdagGate {
    pub op: PdagOp,
    pub args: Vec<SignedRef>,
    /// Set by module detection; module gates are solved independently.
    pub module: bool,
}

/// One node of the working graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PdagNode {
    Constant(bool),
    /// Index into the variable table.
    Variable(usize),
    Gate(PdagGate),
}

/// Where an analysis variable comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableOrigin {
    Basic(BasicEventId),
    /// Derived common-cause event covering a subset of a CCF group.
    Ccf { group: CcfGroupId, members: Vec<BasicEventId> },
}

/// An analysis variable of the working graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub origin: VariableOrigin,
}

/// The working graph of one analysis target.
#[derive(Debug, Clone)]
pub struct Pdag {
    pub(crate) nodes: Vec<PdagNode>,
    pub(crate) variables: Vec<Variable>,
    pub(crate) root: SignedRef,
}

impl Pdag {
    /// Builds the working graph for a top gate of the model.
    pub fn from_gate(
        model: &Model,
        top: GateId,
        house_overrides: &HashMap<HouseEventId, bool>,
        expand_ccf: bool,
    ) -> Self {
        let mut builder = Builder::new(model, house_overrides, expand_ccf);
        let root = builder.build_event(EventRef::Gate(top));
        builder.finish(root)
    }

    /// Builds the working graph of a conjunction of detached formulas.
    ///
    /// Used by event-tree analysis where the collected formulas of a path
    /// are AND-composed into one target.
    pub fn from_formulas(
        model: &Model,
        formulas: &[Formula],
        house_overrides: &HashMap<HouseEventId, bool>,
        expand_ccf: bool,
    ) -> Self {
        let mut builder = Builder::new(model, house_overrides, expand_ccf);
        let args: Vec<SignedRef> =
            formulas.iter().map(|f| builder.build_formula(f)).collect();
        let root = match args.len() {
            0 => SignedRef::positive(builder.constant(true)),
            1 => args[0],
            _ => SignedRef::positive(builder.add_gate(PdagOp::And, args)),
        };
        builder.finish(root)
    }

    pub fn root(&self) -> SignedRef {
        self.root
    }

    pub fn node(&self, index: usize) -> &PdagNode {
        &self.nodes[index]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, index: usize) -> &Variable {
        &self.variables[index]
    }

    /// Evaluates the graph under a truth assignment of the variables.
    ///
    /// Used to verify that preprocessing preserves the Boolean function.
    pub fn evaluate(&self, assignment: &[bool]) -> bool {
        let mut memo = vec![None; self.nodes.len()];
        self.eval_node(self.root.node, assignment, &mut memo) ^ self.root.complement
    }

    fn eval_node(&self, index: usize, assignment: &[bool], memo: &mut Vec<Option<bool>>) -> bool {
        if let Some(value) = memo[index] {
            return value;
        }
        let value = match &self.nodes[index] {
            PdagNode::Constant(b) => *b,
            PdagNode::Variable(v) => assignment[*v],
            PdagNode::Gate(gate) => {
                let values =
                    gate.args.iter().map(|arg| {
                        self.eval_node(arg.node, assignment, memo) ^ arg.complement
                    });
                match gate.op {
                    PdagOp::And => values.into_iter().all(|v| v),
                    PdagOp::Or => values.into_iter().any(|v| v),
                    PdagOp::AtLeast(min) => values.into_iter().filter(|&v| v).count() >= min,
                }
            }
        };
        memo[index] = Some(value);
        value
    }
}

// ============================================================================
// Construction from the model
// ============================================================================

struct Builder<'m> {
    model: &'m Model,
    house_overrides: &'m HashMap<HouseEventId, bool>,
    expand_ccf: bool,
    nodes: Vec<PdagNode>,
    variables: Vec<Variable>,
    gate_memo: HashMap<GateId, SignedRef>,
    basic_memo: HashMap<BasicEventId, SignedRef>,
    ccf_vars: HashMap<(usize, Vec<usize>), usize>,
    constants: [Option<usize>; 2],
}

impl<'m> Builder<'m> {
    fn new(
        model: &'m Model,
        house_overrides: &'m HashMap<HouseEventId, bool>,
        expand_ccf: bool,
    ) -> Self {
        Self {
            model,
            house_overrides,
            expand_ccf,
            nodes: Vec::new(),
            variables: Vec::new(),
            gate_memo: HashMap::new(),
            basic_memo: HashMap::new(),
            ccf_vars: HashMap::new(),
            constants: [None, None],
        }
    }

    fn finish(self, root: SignedRef) -> Pdag {
        Pdag { nodes: self.nodes, variables: self.variables, root }
    }

    fn add_node(&mut self, node: PdagNode) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        index
    }

    fn add_gate(&mut self, op: PdagOp, args: Vec<SignedRef>) -> usize {
        self.add_node(PdagNode::Gate(PdagGate { op, args, module: false }))
    }

    fn constant(&mut self, value: bool) -> usize {
        let slot = usize::from(value);
        if let Some(index) = self.constants[slot] {
            return index;
        }
        let index = self.add_node(PdagNode::Constant(value));
        self.constants[slot] = Some(index);
        index
    }

    fn build_event(&mut self, event: EventRef) -> SignedRef {
        match event {
            EventRef::House(id) => {
                let state = *self
                    .house_overrides
                    .get(&id)
                    .unwrap_or(&self.model.house_event(id).state);
                SignedRef::positive(self.constant(state))
            }
            EventRef::Basic(id) => self.build_basic(id),
            EventRef::Gate(id) => {
                if let Some(&cached) = self.gate_memo.get(&id) {
                    return cached;
                }
                let formula = self.model.gate(id).formula.clone();
                let reference = self.build_formula(&formula);
                self.gate_memo.insert(id, reference);
                reference
            }
        }
    }

    fn build_basic(&mut self, id: BasicEventId) -> SignedRef {
        if let Some(&cached) = self.basic_memo.get(&id) {
            return cached;
        }
        let group = self.model.basic_event(id).ccf_group.filter(|_| self.expand_ccf);
        let reference = match group {
            None => {
                let variable = self.variables.len();
                self.variables.push(Variable {
                    name: self.model.basic_event(id).name.clone(),
                    origin: VariableOrigin::Basic(id),
                });
                SignedRef::positive(self.add_node(PdagNode::Variable(variable)))
            }
            Some(group_id) => {
                let args = self.ccf_member_events(group_id, id);
                SignedRef::positive(self.add_gate(PdagOp::Or, args))
            }
        };
        self.basic_memo.insert(id, reference);
        reference
    }

    /// Variables for every subset of the group containing the member.
    fn ccf_member_events(&mut self, group_id: CcfGroupId, member: BasicEventId) -> Vec<SignedRef> {
        let group = self.model.ccf_group(group_id);
        let members = group.members.clone();
        let multiplicities = group.multiplicities();
        let mut args = Vec::new();
        for k in multiplicities {
            for combination in k_combinations(members.len(), k) {
                let subset: Vec<BasicEventId> =
                    combination.iter().map(|&i| members[i]).collect();
                if !subset.contains(&member) {
                    continue;
                }
                let variable = self.ccf_variable(group_id, &subset);
                let node = self.add_node(PdagNode::Variable(variable));
                args.push(SignedRef::positive(node));
            }
        }
        args
    }

    fn ccf_variable(&mut self, group_id: CcfGroupId, subset: &[BasicEventId]) -> usize {
        let key = (group_id.0, subset.iter().map(|m| m.0).collect::<Vec<_>>());
        if let Some(&variable) = self.ccf_vars.get(&key) {
            return variable;
        }
        let mut names: Vec<&str> = subset
            .iter()
            .map(|&m| self.model.basic_event(m).name.as_str())
            .collect();
        names.sort_unstable();
        let variable = self.variables.len();
        self.variables.push(Variable {
            name: format!("[{}]", names.join(" ")),
            origin: VariableOrigin::Ccf { group: group_id, members: subset.to_vec() },
        });
        self.ccf_vars.insert(key, variable);
        variable
    }

    fn build_formula(&mut self, formula: &Formula) -> SignedRef {
        let args: Vec<SignedRef> =
            formula.args.iter().map(|&arg| self.build_event(arg)).collect();
        match formula.operator {
            Operator::And => SignedRef::positive(self.add_gate(PdagOp::And, args)),
            Operator::Or => SignedRef::positive(self.add_gate(PdagOp::Or, args)),
            Operator::Nand => SignedRef::negative(self.add_gate(PdagOp::And, args)),
            Operator::Nor => SignedRef::negative(self.add_gate(PdagOp::Or, args)),
            Operator::AtLeast { min } => {
                SignedRef::positive(self.add_gate(PdagOp::AtLeast(min as usize), args))
            }
            Operator::Null => args[0],
            Operator::Not => args[0].complemented(),
            Operator::Xor => {
                // Pairwise parity expansion:
                // xor(a, b) = (a & !b) | (!a & b), folded left over the args.
                let mut accumulated = args[0];
                for &next in &args[1..] {
                    let left = self.add_gate(PdagOp::And, vec![accumulated, next.complemented()]);
                    let right = self.add_gate(PdagOp::And, vec![accumulated.complemented(), next]);
                    accumulated = SignedRef::positive(self.add_gate(
                        PdagOp::Or,
                        vec![SignedRef::positive(left), SignedRef::positive(right)],
                    ));
                }
                accumulated
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_model::{CcfModel, Expression};

    fn no_overrides() -> HashMap<HouseEventId, bool> {
        HashMap::new()
    }

    #[test]
    fn test_xor_expansion_matches_parity() {
        let mut model = Model::new();
        let a = model.add_basic_event("a", None).unwrap();
        let b = model.add_basic_event("b", None).unwrap();
        let c = model.add_basic_event("c", None).unwrap();
        let top = model
            .add_gate(
                "top",
                Formula::new(
                    Operator::Xor,
                    vec![EventRef::Basic(a), EventRef::Basic(b), EventRef::Basic(c)],
                ),
            )
            .unwrap();
        model.add_fault_tree("ft", vec![top]).unwrap();
        model.validate().unwrap();

        let overrides = no_overrides();
        let pdag = Pdag::from_gate(&model, top, &overrides, false);
        for bits in 0..8u32 {
            let assignment: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
            let expected = assignment.iter().filter(|&&v| v).count() % 2 == 1;
            assert_eq!(pdag.evaluate(&assignment), expected, "bits {bits:03b}");
        }
    }

    #[test]
    fn test_house_events_become_constants() {
        let mut model = Model::new();
        let a = model.add_basic_event("a", None).unwrap();
        let h = model.add_house_event("maintenance", false).unwrap();
        let top = model
            .add_gate(
                "top",
                Formula::new(Operator::And, vec![EventRef::Basic(a), EventRef::House(h)]),
            )
            .unwrap();
        model.add_fault_tree("ft", vec![top]).unwrap();
        model.validate().unwrap();

        let overrides = no_overrides();
        let pdag = Pdag::from_gate(&model, top, &overrides, false);
        assert!(!pdag.evaluate(&[true]));

        let mut on = HashMap::new();
        on.insert(h, true);
        let pdag = Pdag::from_gate(&model, top, &on, false);
        assert!(pdag.evaluate(&[true]));
    }

    #[test]
    fn test_shared_gates_are_memoized() {
        let mut model = Model::new();
        let a = model.add_basic_event("a", None).unwrap();
        let b = model.add_basic_event("b", None).unwrap();
        let shared = model
            .add_gate(
                "shared",
                Formula::new(Operator::And, vec![EventRef::Basic(a), EventRef::Basic(b)]),
            )
            .unwrap();
        let top = model
            .add_gate(
                "top",
                Formula::new(Operator::Or, vec![EventRef::Gate(shared), EventRef::Gate(shared)]),
            )
            .unwrap();
        model.add_fault_tree("ft", vec![top]).unwrap();

        let overrides = no_overrides();
        let pdag = Pdag::from_gate(&model, top, &overrides, false);
        let gate_nodes = pdag
            .nodes
            .iter()
            .filter(|n| matches!(n, PdagNode::Gate(_)))
            .count();
        assert_eq!(gate_nodes, 2); // one shared AND, one OR
    }

    #[test]
    fn test_beta_ccf_expansion_variables() {
        let mut model = Model::new();
        let q = model.add_expression(Expression::Constant(0.1));
        let beta = model.add_expression(Expression::Constant(0.2));
        let p1 = model.add_basic_event("pumpone", None).unwrap();
        let p2 = model.add_basic_event("pumptwo", None).unwrap();
        let p3 = model.add_basic_event("pumpthree", None).unwrap();
        model
            .add_ccf_group("pumps", CcfModel::BetaFactor, vec![p1, p2, p3], q, vec![beta])
            .unwrap();
        let top = model
            .add_gate(
                "top",
                Formula::new(
                    Operator::And,
                    vec![EventRef::Basic(p1), EventRef::Basic(p2), EventRef::Basic(p3)],
                ),
            )
            .unwrap();
        model.add_fault_tree("ft", vec![top]).unwrap();
        model.validate().unwrap();

        let overrides = no_overrides();
        let pdag = Pdag::from_gate(&model, top, &overrides, true);
        // Beta model: three singleton variables plus the whole-group variable.
        let names: Vec<&str> = pdag.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names.len(), 4);
        assert!(names.contains(&"[pumpone]"));
        assert!(names.contains(&"[pumpone pumpthree pumptwo]"));
    }
}
