use thiserror::Error;

/// Top-level error type for domain validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Unknown relationship type: {0}")]
    UnknownRelationshipType(String),
}
