//! Model container and builder.
//!
//! The [`Model`] owns every construct (events, formulas, expressions, fault
//! trees, event trees, CCF groups, parameters); everything else refers to
//! constructs by id. Construction goes through the `add_*` methods; a final
//! [`Model::validate`] enforces the structural invariants and freezes the
//! model for analysis.

use std::collections::HashMap;

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::ccf::{CcfGroup, CcfGroupId, CcfModel};
use crate::error::{ModelError, ValidationErrors};
use crate::event::{
    BasicEvent, BasicEventId, EventRef, FaultTree, FaultTreeId, Gate, GateId, HouseEvent,
    HouseEventId, ParameterId,
};
use crate::event_tree::{
    Branch, BranchTarget, EventTree, EventTreeId, FunctionalEvent, FunctionalEventId,
    InitiatingEvent, InitiatingEventId, Sequence, SequenceId,
};
use crate::expression::{EvalContext, ExprId, Expression, ExpressionPool, Parameter};
use crate::formula::{Formula, Operator};

/// Immutable in-memory analysis model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    gates: Vec<Gate>,
    basic_events: Vec<BasicEvent>,
    house_events: Vec<HouseEvent>,
    parameters: Vec<Parameter>,
    expressions: ExpressionPool,
    fault_trees: Vec<FaultTree>,
    ccf_groups: Vec<CcfGroup>,
    event_trees: Vec<EventTree>,
    sequences: Vec<Sequence>,
    functional_events: Vec<FunctionalEvent>,
    initiating_events: Vec<InitiatingEvent>,
    /// Shared namespace of event identifiers.
    event_names: IndexMap<String, EventRef>,
    parameter_names: IndexMap<String, ParameterId>,
    frozen: bool,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<(), ModelError> {
        if self.frozen {
            Err(ModelError::Frozen)
        } else {
            Ok(())
        }
    }

    fn register_event_name(&mut self, name: &str, event: EventRef) -> Result<(), ModelError> {
        if self.event_names.contains_key(name) {
            return Err(ModelError::DuplicateName(name.to_string()));
        }
        self.event_names.insert(name.to_string(), event);
        Ok(())
    }

    // ========================================================================
    // Builder interface
    // ========================================================================

    pub fn add_gate(&mut self, name: &str, formula: Formula) -> Result<GateId, ModelError> {
        self.check_open()?;
        let id = GateId(self.gates.len());
        self.register_event_name(name, EventRef::Gate(id))?;
        self.gates.push(Gate { name: name.to_string(), formula });
        Ok(id)
    }

    pub fn add_basic_event(
        &mut self,
        name: &str,
        expression: Option<ExprId>,
    ) -> Result<BasicEventId, ModelError> {
        self.check_open()?;
        let id = BasicEventId(self.basic_events.len());
        self.register_event_name(name, EventRef::Basic(id))?;
        self.basic_events.push(BasicEvent {
            name: name.to_string(),
            expression,
            ccf_group: None,
        });
        Ok(id)
    }

    pub fn add_house_event(&mut self, name: &str, state: bool) -> Result<HouseEventId, ModelError> {
        self.check_open()?;
        let id = HouseEventId(self.house_events.len());
        self.register_event_name(name, EventRef::House(id))?;
        self.house_events.push(HouseEvent { name: name.to_string(), state });
        Ok(id)
    }

    pub fn add_parameter(&mut self, name: &str, expression: ExprId) -> Result<ParameterId, ModelError> {
        self.check_open()?;
        if self.parameter_names.contains_key(name) {
            return Err(ModelError::DuplicateName(name.to_string()));
        }
        let id = ParameterId(self.parameters.len());
        self.parameter_names.insert(name.to_string(), id);
        self.parameters.push(Parameter { name: name.to_string(), expression });
        Ok(id)
    }

    pub fn add_expression(&mut self, expression: Expression) -> ExprId {
        self.expressions.add(expression)
    }

    pub fn add_fault_tree(&mut self, name: &str, gates: Vec<GateId>) -> Result<FaultTreeId, ModelError> {
        self.check_open()?;
        let id = FaultTreeId(self.fault_trees.len());
        self.fault_trees.push(FaultTree { name: name.to_string(), gates });
        Ok(id)
    }

    /// Declares a CCF group over existing basic events.
    ///
    /// Member disjointness across groups is enforced at insertion.
    pub fn add_ccf_group(
        &mut self,
        name: &str,
        model: CcfModel,
        members: Vec<BasicEventId>,
        distribution: ExprId,
        factors: Vec<ExprId>,
    ) -> Result<CcfGroupId, ModelError> {
        self.check_open()?;
        let id = CcfGroupId(self.ccf_groups.len());
        for &member in &members {
            let event = &self.basic_events[member.0];
            if event.ccf_group.is_some() {
                return Err(ModelError::InvalidCcfGroup {
                    group: name.to_string(),
                    reason: format!("member `{}` already belongs to another group", event.name),
                });
            }
        }
        for &member in &members {
            self.basic_events[member.0].ccf_group = Some(id);
        }
        self.ccf_groups.push(CcfGroup {
            name: name.to_string(),
            model,
            members,
            distribution,
            factors,
        });
        Ok(id)
    }

    pub fn add_event_tree(&mut self, name: &str, root: Branch) -> Result<EventTreeId, ModelError> {
        self.check_open()?;
        let id = EventTreeId(self.event_trees.len());
        self.event_trees.push(EventTree { name: name.to_string(), root });
        Ok(id)
    }

    pub fn add_sequence(&mut self, name: &str, expression: Option<ExprId>) -> Result<SequenceId, ModelError> {
        self.check_open()?;
        let id = SequenceId(self.sequences.len());
        self.sequences.push(Sequence { name: name.to_string(), expression });
        Ok(id)
    }

    pub fn add_functional_event(&mut self, name: &str) -> Result<FunctionalEventId, ModelError> {
        self.check_open()?;
        let id = FunctionalEventId(self.functional_events.len());
        self.functional_events.push(FunctionalEvent { name: name.to_string() });
        Ok(id)
    }

    pub fn add_initiating_event(
        &mut self,
        name: &str,
        event_tree: EventTreeId,
    ) -> Result<InitiatingEventId, ModelError> {
        self.check_open()?;
        let id = InitiatingEventId(self.initiating_events.len());
        self.initiating_events.push(InitiatingEvent { name: name.to_string(), event_tree });
        Ok(id)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn gate(&self, id: GateId) -> &Gate {
        &self.gates[id.0]
    }

    pub fn basic_events(&self) -> &[BasicEvent] {
        &self.basic_events
    }

    pub fn basic_event(&self, id: BasicEventId) -> &BasicEvent {
        &self.basic_events[id.0]
    }

    pub fn house_events(&self) -> &[HouseEvent] {
        &self.house_events
    }

    pub fn house_event(&self, id: HouseEventId) -> &HouseEvent {
        &self.house_events[id.0]
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn expressions(&self) -> &ExpressionPool {
        &self.expressions
    }

    pub fn fault_trees(&self) -> &[FaultTree] {
        &self.fault_trees
    }

    pub fn ccf_groups(&self) -> &[CcfGroup] {
        &self.ccf_groups
    }

    pub fn ccf_group(&self, id: CcfGroupId) -> &CcfGroup {
        &self.ccf_groups[id.0]
    }

    pub fn event_trees(&self) -> &[EventTree] {
        &self.event_trees
    }

    pub fn event_tree(&self, id: EventTreeId) -> &EventTree {
        &self.event_trees[id.0]
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn sequence(&self, id: SequenceId) -> &Sequence {
        &self.sequences[id.0]
    }

    pub fn functional_events(&self) -> &[FunctionalEvent] {
        &self.functional_events
    }

    pub fn initiating_events(&self) -> &[InitiatingEvent] {
        &self.initiating_events
    }

    pub fn event_by_name(&self, name: &str) -> Option<EventRef> {
        self.event_names.get(name).copied()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// The unique top gate of a fault tree, if it has one.
    ///
    /// A top gate is a gate of the tree that no other gate references.
    pub fn top_gate(&self, tree: FaultTreeId) -> Option<GateId> {
        let referenced = self.referenced_gates();
        let mut tops = self.fault_trees[tree.0]
            .gates
            .iter()
            .filter(|g| !referenced.contains_key(g));
        match (tops.next(), tops.next()) {
            (Some(&top), None) => Some(top),
            _ => None,
        }
    }

    fn referenced_gates(&self) -> HashMap<GateId, usize> {
        let mut counts = HashMap::new();
        for gate in &self.gates {
            for arg in &gate.formula.args {
                if let EventRef::Gate(g) = arg {
                    *counts.entry(*g).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Validates the structural invariants and freezes the model.
    ///
    /// All diagnostics found are returned together rather than only the
    /// first.
    pub fn validate(&mut self) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();

        for gate in &self.gates {
            if let Err(e) = gate.formula.validate_arity(&gate.name) {
                errors.push(e);
            }
        }

        self.check_gate_cycles(&mut errors);
        self.check_parameter_cycles(&mut errors);

        for group in &self.ccf_groups {
            if let Err(e) = group.validate() {
                errors.push(e);
            }
        }

        for (i, tree) in self.fault_trees.iter().enumerate() {
            if self.top_gate(FaultTreeId(i)).is_none() {
                errors.push(ModelError::InvalidFaultTree {
                    tree: tree.name.clone(),
                    reason: "the tree must have exactly one top gate".into(),
                });
            }
        }

        if errors.is_empty() {
            self.frozen = true;
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    /// Checks that every basic event has an evaluable probability in [0, 1].
    ///
    /// Run by the analysis driver when quantification is requested; the
    /// structural [`Self::validate`] does not need probability data.
    pub fn validate_probabilities(&self, mission_time: f64) -> Result<(), ValidationErrors> {
        let mut errors = Vec::new();
        let mut ctx = EvalContext::new(&self.expressions, &self.parameters, mission_time);
        for event in &self.basic_events {
            match (event.expression, event.ccf_group) {
                (Some(expr), _) => match ctx.value(expr) {
                    Ok(p) if (0.0..=1.0).contains(&p) => {}
                    Ok(p) => errors.push(ModelError::ProbabilityRange {
                        event: event.name.clone(),
                        value: p,
                    }),
                    Err(e) => errors.push(ModelError::InvalidFormula {
                        gate: event.name.clone(),
                        reason: e.to_string(),
                    }),
                },
                (None, Some(_)) => {} // probability comes from the group distribution
                (None, None) => errors.push(ModelError::MissingProbability(event.name.clone())),
            }
        }
        for group in &self.ccf_groups {
            match ctx.value(group.distribution) {
                Ok(q) if (0.0..=1.0).contains(&q) => {}
                Ok(q) => errors.push(ModelError::InvalidCcfGroup {
                    group: group.name.clone(),
                    reason: format!("total failure probability {q} is outside [0, 1]"),
                }),
                Err(e) => errors.push(ModelError::InvalidCcfGroup {
                    group: group.name.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }

    fn check_gate_cycles(&self, errors: &mut Vec<ModelError>) {
        let mut graph = DiGraph::<GateId, ()>::new();
        let nodes: Vec<NodeIndex> =
            (0..self.gates.len()).map(|i| graph.add_node(GateId(i))).collect();
        for (i, gate) in self.gates.iter().enumerate() {
            for arg in &gate.formula.args {
                if let EventRef::Gate(g) = arg {
                    if g.0 < self.gates.len() {
                        graph.add_edge(nodes[i], nodes[g.0], ());
                    }
                }
            }
        }
        for scc in tarjan_scc(&graph) {
            let cyclic = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
            if cyclic {
                let gate = &self.gates[graph[scc[0]].0];
                errors.push(ModelError::GateCycle(gate.name.clone()));
            }
        }
    }

    fn check_parameter_cycles(&self, errors: &mut Vec<ModelError>) {
        let mut graph = DiGraph::<ParameterId, ()>::new();
        let nodes: Vec<NodeIndex> =
            (0..self.parameters.len()).map(|i| graph.add_node(ParameterId(i))).collect();
        for (i, parameter) in self.parameters.iter().enumerate() {
            let mut referenced = Vec::new();
            self.expressions.referenced_parameters(parameter.expression, &mut referenced);
            for p in referenced {
                if p.0 < self.parameters.len() {
                    graph.add_edge(nodes[i], nodes[p.0], ());
                }
            }
        }
        for scc in tarjan_scc(&graph) {
            let cyclic = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
            if cyclic {
                let parameter = &self.parameters[graph[scc[0]].0];
                errors.push(ModelError::ParameterCycle(parameter.name.clone()));
            }
        }
    }

    // ========================================================================
    // Direct evaluation
    // ========================================================================

    /// Evaluates an event under a truth assignment of the basic events.
    ///
    /// House events take their declared state unless overridden. Used by
    /// verification tooling to cross-check cut sets against the original
    /// (unpreprocessed) model.
    pub fn evaluate(
        &self,
        target: EventRef,
        basic_states: &[bool],
        house_overrides: &HashMap<HouseEventId, bool>,
    ) -> bool {
        match target {
            EventRef::Basic(id) => basic_states[id.0],
            EventRef::House(id) => *house_overrides
                .get(&id)
                .unwrap_or(&self.house_events[id.0].state),
            EventRef::Gate(id) => {
                self.evaluate_formula(&self.gates[id.0].formula, basic_states, house_overrides)
            }
        }
    }

    /// Evaluates a detached formula under a truth assignment.
    pub fn evaluate_formula(
        &self,
        formula: &Formula,
        basic_states: &[bool],
        house_overrides: &HashMap<HouseEventId, bool>,
    ) -> bool {
        let values: Vec<bool> = formula
            .args
            .iter()
            .map(|arg| self.evaluate(*arg, basic_states, house_overrides))
            .collect();
        match formula.operator {
            Operator::And => values.iter().all(|&v| v),
            Operator::Or => values.iter().any(|&v| v),
            Operator::Xor => values.iter().filter(|&&v| v).count() % 2 == 1,
            Operator::Not => !values[0],
            Operator::Null => values[0],
            Operator::Nand => !values.iter().all(|&v| v),
            Operator::Nor => !values.iter().any(|&v| v),
            Operator::AtLeast { min } => values.iter().filter(|&&v| v).count() >= min as usize,
        }
    }
}
