//! Boolean formulas attached to gates.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::event::EventRef;

/// Boolean connective of a formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    And,
    Or,
    Xor,
    Not,
    Nand,
    Nor,
    /// Pass-through of a single argument.
    Null,
    /// At least `min` of the arguments hold.
    AtLeast { min: u32 },
}

impl Operator {
    /// Human-readable operator name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Xor => "xor",
            Operator::Not => "not",
            Operator::Nand => "nand",
            Operator::Nor => "nor",
            Operator::Null => "null",
            Operator::AtLeast { .. } => "atleast",
        }
    }
}

/// Operator applied to an ordered list of event references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub operator: Operator,
    pub args: Vec<EventRef>,
}

impl Formula {
    pub fn new(operator: Operator, args: Vec<EventRef>) -> Self {
        Self { operator, args }
    }

    /// Checks the argument count against the operator arity.
    pub fn validate_arity(&self, gate_name: &str) -> Result<(), ModelError> {
        let n = self.args.len();
        let reason = match self.operator {
            Operator::Not | Operator::Null if n != 1 => {
                Some(format!("{} operator takes exactly one argument, got {}", self.operator.name(), n))
            }
            Operator::And | Operator::Or | Operator::Xor | Operator::Nand | Operator::Nor
                if n < 2 =>
            {
                Some(format!("{} operator takes at least two arguments, got {}", self.operator.name(), n))
            }
            Operator::AtLeast { min } if min < 2 => {
                Some(format!("atleast operator requires min >= 2, got {}", min))
            }
            Operator::AtLeast { min } if n <= min as usize => Some(format!(
                "atleast operator requires more than {} arguments, got {}",
                min, n
            )),
            _ => None,
        };
        match reason {
            Some(reason) => Err(ModelError::InvalidFormula {
                gate: gate_name.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}
