//! Model construction and validation errors.

use thiserror::Error;

/// Errors raised while building or validating a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("duplicate definition of `{0}`")]
    DuplicateName(String),
    #[error("gate `{gate}`: {reason}")]
    InvalidFormula { gate: String, reason: String },
    #[error("cycle through gate `{0}`")]
    GateCycle(String),
    #[error("cycle through parameter `{0}`")]
    ParameterCycle(String),
    #[error("basic event `{0}` has no probability expression")]
    MissingProbability(String),
    #[error("basic event `{event}` probability {value} is outside [0, 1]")]
    ProbabilityRange { event: String, value: f64 },
    #[error("CCF group `{group}`: {reason}")]
    InvalidCcfGroup { group: String, reason: String },
    #[error("fault tree `{tree}`: {reason}")]
    InvalidFaultTree { tree: String, reason: String },
    #[error("event tree `{tree}`: {reason}")]
    InvalidEventTree { tree: String, reason: String },
    #[error("model is frozen; construction is not allowed after validation")]
    Frozen,
}

/// Domain violation during numeric expression evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("numerical error: {0}")]
pub struct NumericalError(pub String);

/// The full set of diagnostics collected by one validation run.
///
/// Validation does not stop at the first problem; every error found in the
/// model is reported together.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<ModelError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation error(s): ", self.0.len())?;
        let messages: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}
