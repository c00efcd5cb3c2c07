//! Error types for operation construction and engine execution

use thiserror::Error;

use crate::operation::OperationKind;
use crate::regex_error::PatternError;

/// Raised while building an [`Operation`](crate::Operation) from loose fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{kind} operation requires {field}")]
    MissingField {
        kind: OperationKind,
        field: &'static str,
    },

    #[error("{0} operation takes a pattern or an address, not both")]
    ConflictingSelector(OperationKind),

    #[error("Unknown sed operation: {0}")]
    UnknownCommand(String),
}

/// Raised by [`Engine::validate`](crate::Engine::validate) and carried as the
/// error message of failed reports.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unsupported operation type: {0}")]
    UnsupportedKind(OperationKind),

    #[error("{0} operation requires a pattern")]
    MissingPattern(OperationKind),

    #[error("{kind} operation by address '{address}' is not supported; use a pattern")]
    UnsupportedAddress {
        kind: OperationKind,
        address: String,
    },

    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    #[error("Batch operation failed at step {step}: {message}")]
    BatchStep { step: usize, message: String },
}
