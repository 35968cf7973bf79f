//! Structured error types for sumexp.

use thiserror::Error;

/// Unified error type for every container operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SumExpError {
    /// A mask, label sequence, or replacement matrix has the wrong length.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A positional selector falls outside the axis.
    #[error("index {index} out of bounds for axis of length {len}")]
    IndexOutOfBounds { index: isize, len: usize },

    /// A literal label is not present on the axis.
    #[error("label not found: {0}")]
    LabelNotFound(String),

    /// Long-table decomposition or construction received unusable input.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The bind axis argument is neither 0 nor 1.
    #[error("incompatible bind: {0}")]
    IncompatibleBind(String),

    /// A relabel or subset would leave duplicate labels on an axis.
    #[error("duplicate label assignment: {0}")]
    DuplicateLabelAssignment(String),

    /// An assay's row or column labels differ from the container's.
    #[error("assay shape mismatch: {0}")]
    AssayShapeMismatch(String),

    /// An internal invariant was broken. Never caused by caller input.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Fieldless discriminant of [`SumExpError`], for matching by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DimensionMismatch,
    IndexOutOfBounds,
    LabelNotFound,
    MalformedInput,
    IncompatibleBind,
    DuplicateLabelAssignment,
    AssayShapeMismatch,
    Internal,
}

impl SumExpError {
    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SumExpError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            SumExpError::IndexOutOfBounds { .. } => ErrorKind::IndexOutOfBounds,
            SumExpError::LabelNotFound(_) => ErrorKind::LabelNotFound,
            SumExpError::MalformedInput(_) => ErrorKind::MalformedInput,
            SumExpError::IncompatibleBind(_) => ErrorKind::IncompatibleBind,
            SumExpError::DuplicateLabelAssignment(_) => ErrorKind::DuplicateLabelAssignment,
            SumExpError::AssayShapeMismatch(_) => ErrorKind::AssayShapeMismatch,
            SumExpError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience alias used throughout sumexp.
pub type Result<T> = std::result::Result<T, SumExpError>;
