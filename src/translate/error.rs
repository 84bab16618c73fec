//! Translation failures.

use crate::ast::SetOpKind;

/// Unsupported operation or method shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("{operation} is not supported: {reason}")]
    Unsupported { operation: String, reason: String },

    #[error("Invalid {operation}: {reason}")]
    Invalid { operation: String, reason: String },
}

impl TranslationError {
    pub fn unsupported(operation: &str, reason: impl Into<String>) -> Self {
        TranslationError::Unsupported {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid(operation: &str, reason: impl Into<String>) -> Self {
        TranslationError::Invalid {
            operation: operation.into(),
            reason: reason.into(),
        }
    }
}

/// Set-operation branches with different output column sequences.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} branches differ: left ({}) vs right ({})", .left.join(", "), .right.join(", "))]
pub struct SchemaMismatchError {
    pub kind: SetOpKind,
    pub left: Vec<String>,
    pub right: Vec<String>,
}

/// Reverse, TakeLast, SkipLast or Last without an ordering before it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} requires a preceding OrderBy")]
pub struct OrderingRequiredError {
    pub operation: String,
}

impl OrderingRequiredError {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.into(),
        }
    }
}

/// A feature the active dialect cannot express.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{feature} is not supported by dialect {dialect}")]
pub struct DialectUnsupportedError {
    pub dialect: String,
    pub feature: String,
}
