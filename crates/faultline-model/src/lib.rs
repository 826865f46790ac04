#![allow(dead_code, unused_variables, unused_imports)]
//! # Faultline Model
//!
//! Immutable in-memory representation of a probabilistic risk analysis model:
//! - events (gates, basic events, house events) and their Boolean formulas
//! - numeric expressions with built-in uncertainty distributions
//! - fault trees, event trees, sequences, initiating events
//! - common cause failure (CCF) groups
//!
//! The model is built through [`model::Model`]'s `add_*` methods and frozen
//! by [`model::Model::validate`], after which analysis code treats it as
//! read-only.

pub mod ccf;
pub mod error;
pub mod event;
pub mod event_tree;
pub mod expression;
pub mod formula;
pub mod model;

pub use ccf::{CcfGroup, CcfGroupId, CcfModel};
pub use error::{ModelError, NumericalError, ValidationErrors};
pub use event::{
    BasicEvent, BasicEventId, EventRef, FaultTree, FaultTreeId, Gate, GateId, HouseEvent,
    HouseEventId, ParameterId,
};
pub use event_tree::{
    Branch, BranchTarget, EventTree, EventTreeId, Fork, FunctionalEvent, FunctionalEventId,
    InitiatingEvent, InitiatingEventId, Instruction, Path, Sequence, SequenceId,
};
pub use expression::{EvalContext, ExprId, Expression, ExpressionPool, Parameter};
pub use formula::{Formula, Operator};
pub use model::Model;
