//! Event tree constructs: branches, forks, sequences, initiating events.

use serde::{Deserialize, Serialize};

use crate::event::HouseEventId;
use crate::expression::ExprId;
use crate::formula::Formula;

/// Identifier of an event tree within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventTreeId(pub usize);

/// Identifier of a sequence within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceId(pub usize);

/// Identifier of a functional event within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FunctionalEventId(pub usize);

/// Identifier of an initiating event within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InitiatingEventId(pub usize);

/// Condition questioned at an event tree fork (e.g. a safety system demand).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionalEvent {
    pub name: String,
}

/// Terminal outcome of an event tree path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    /// Optional explicit probability multiplier for the sequence.
    pub expression: Option<ExprId>,
}

/// Occurrence that starts the event tree walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatingEvent {
    pub name: String,
    pub event_tree: EventTreeId,
}

/// Side effect applied while traversing a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Instruction {
    /// Override the state of a house event for the rest of the path.
    SetHouseEvent { house: HouseEventId, state: bool },
    /// AND the formula into the conjunctive memory of the path.
    CollectFormula(Formula),
    /// Multiply the path probability by the expression value.
    CollectExpression(ExprId),
}

/// Where a branch leads after its instructions are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BranchTarget {
    Fork(Fork),
    Sequence(SequenceId),
}

/// One edge of the event tree walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub instructions: Vec<Instruction>,
    pub target: BranchTarget,
}

impl Branch {
    pub fn sequence(sequence: SequenceId) -> Self {
        Self { instructions: Vec::new(), target: BranchTarget::Sequence(sequence) }
    }

    pub fn fork(fork: Fork) -> Self {
        Self { instructions: Vec::new(), target: BranchTarget::Fork(fork) }
    }

    pub fn with_instructions(mut self, instructions: Vec<Instruction>) -> Self {
        self.instructions = instructions;
        self
    }
}

/// Split over the outcomes of a functional event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fork {
    pub functional_event: FunctionalEventId,
    pub paths: Vec<Path>,
}

/// A labeled outgoing path of a fork (e.g. "success" / "failure").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub state: String,
    pub branch: Branch,
}

/// Named rooted tree of branches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventTree {
    pub name: String,
    pub root: Branch,
}
