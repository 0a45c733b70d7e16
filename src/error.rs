//! Engine error types.
//!
//! Only rejected input surfaces here. Infeasible plans and exhausted
//! budgets are ordinary [`SolveStatus`](crate::scheduler::SolveStatus)
//! values, not errors.

use thiserror::Error;

use crate::validation::ValidationError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed plan or request input. Carries every problem found.
    #[error("Invalid plan: {}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    /// Solver selector is not one of the known names.
    #[error("Unrecognized solver '{0}' (expected \"cpsat\" or \"dp\")")]
    UnrecognizedSolver(String),

    /// Engine configuration is out of range or unparseable.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Validation errors carried by this error, if any.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            EngineError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

impl From<Vec<ValidationError>> for EngineError {
    fn from(errors: Vec<ValidationError>) -> Self {
        EngineError::Validation(errors)
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
