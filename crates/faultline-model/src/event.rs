//! Event constructs: gates, basic events, house events.
//!
//! Events are addressed by integer newtype ids into the owning [`Model`]'s
//! storage; cross-references use the tagged [`EventRef`] handle instead of
//! trait objects.
//!
//! [`Model`]: crate::model::Model

use serde::{Deserialize, Serialize};

use crate::ccf::CcfGroupId;
use crate::expression::ExprId;
use crate::formula::Formula;

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    };
}

define_id!(
    /// Identifier of a gate within a model.
    GateId
);
define_id!(
    /// Identifier of a basic event within a model.
    BasicEventId
);
define_id!(
    /// Identifier of a house event within a model.
    HouseEventId
);
define_id!(
    /// Identifier of a named parameter within a model.
    ParameterId
);
define_id!(
    /// Identifier of a fault tree within a model.
    FaultTreeId
);

/// Tagged handle to any event kind.
///
/// Formula arguments and analysis targets are `EventRef`s; the variant tag
/// replaces virtual dispatch over an event hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventRef {
    Gate(GateId),
    Basic(BasicEventId),
    House(HouseEventId),
}

/// Internal Boolean node combining events through a formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gate {
    pub name: String,
    pub formula: Formula,
}

/// Terminal failure event with an associated probability expression.
///
/// Members of a CCF group draw their probability from the group distribution
/// and may omit their own expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicEvent {
    pub name: String,
    pub expression: Option<ExprId>,
    pub ccf_group: Option<CcfGroupId>,
}

/// Fixed Boolean constant used to switch model branches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseEvent {
    pub name: String,
    pub state: bool,
}

/// Named container of gates with a single top event per analysis target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultTree {
    pub name: String,
    pub gates: Vec<GateId>,
}
