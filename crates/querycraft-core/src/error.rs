//! Error types for the serialized-record boundary
//!
//! Model mutators and the transformation dispatcher are total and never
//! return these. They only surface when parsing or strictly validating
//! records that come from outside the process.

/// Query model error types
#[derive(Debug, thiserror::Error)]
pub enum QueryModelError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Invalid transformation spec: {0}")]
    InvalidTransformationSpec(String),

    #[error("Unknown transformation type '{kind}' at position {index}")]
    UnknownTransformationKind { index: usize, kind: String },
}
