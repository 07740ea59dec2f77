//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::intake::IntakeStep;

/// Domain errors represent violations of the traversal, intake and codec rules.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("cannot load decision tree from {source_name}: {reason}")]
    Load { source_name: String, reason: String },

    #[error("node not found: {0}")]
    Lookup(String),

    #[error("gating cycle detected: {}", .0.join(" -> "))]
    GatingCycle(Vec<String>),

    #[error("node {0} has neither a question nor a result")]
    InvalidNode(String),

    #[error("node {0} is not a decision node")]
    NotADecision(String),

    #[error("no visible option '{label}' on node {node}")]
    UnknownOption { node: String, label: String },

    #[error("nothing to go back to")]
    HistoryEmpty,

    #[error("decision tree is still loading")]
    LoadPending,

    #[error("no diagnosis in progress")]
    NotStarted,

    #[error("{step}: {message}")]
    Validation { step: IntakeStep, message: String },

    #[error("invalid resume code: {0}")]
    Decode(String),

    #[error("cannot encode session: {0}")]
    Encode(String),
}

impl DomainError {
    /// Errors the user can recover from without losing the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DomainError::Validation { .. }
                | DomainError::Decode(_)
                | DomainError::HistoryEmpty
                | DomainError::UnknownOption { .. }
                | DomainError::LoadPending
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
