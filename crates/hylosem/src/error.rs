//! Error types for structural and serialization failures.

use thiserror::Error;

/// Fatal structural problems: malformed terms that cannot be flattened
/// or deserialized. Distinct from [`crate::unify::UnifyFailure`], which
/// signals the ordinary, recoverable failure of a unification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("unable to flatten: {0}")]
    Unflattenable(String),

    #[error("no anchoring nominal for: {0}")]
    Unanchored(String),

    #[error("ill-typed diamond argument: {0}")]
    IllTypedDiamond(String),

    #[error("box terms cannot be deserialized")]
    UnsupportedBox,

    #[error("invalid element: {0}")]
    InvalidElement(String),

    #[error("serialization failed: {0}")]
    Json(String),
}

impl From<serde_json::Error> for StructuralError {
    fn from(err: serde_json::Error) -> StructuralError {
        StructuralError::Json(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StructuralError>;
