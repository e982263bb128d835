//! Error types for type graph compilation

use serde::Serialize;
use thiserror::Error;

/// Errors that abort the compilation of a type graph
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Unresolved reference '{reference}' on property '{owner}.{property}'")]
    UnresolvedReference {
        owner: String,
        property: String,
        reference: String,
    },

    #[error("Duplicate type name: {0}")]
    DuplicateType(String),

    #[error("Invalid property '{property}': {reason}")]
    InvalidProperty { property: String, reason: String },

    #[error("Invalid relation mapping '{mapping}': {reason}")]
    InvalidRelationMapping { mapping: String, reason: String },

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// Whether this error is a resolution failure (a name that could not be
    /// found in the graph or the schema registry)
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            CompileError::UnknownType(_) | CompileError::UnresolvedReference { .. }
        )
    }

    /// Whether this error stems from malformed input or mapping configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CompileError::InvalidProperty { .. }
                | CompileError::InvalidRelationMapping { .. }
                | CompileError::DuplicateType(_)
        )
    }
}

/// Warnings that may occur during compilation (non-fatal)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompileWarning {
    /// A reference to a type that is not part of the graph was dropped
    UnresolvedReference {
        owner: String,
        property: String,
        reference: String,
    },
    /// A union/intersection property has no relational representation
    CompositeProperty { owner: String, property: String },
}

impl std::fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileWarning::UnresolvedReference {
                owner,
                property,
                reference,
            } => {
                write!(
                    f,
                    "Property '{}.{}' references unknown type '{}' and was skipped",
                    owner, property, reference
                )
            }
            CompileWarning::CompositeProperty { owner, property } => {
                write!(
                    f,
                    "Composite property '{}.{}' is not stored in a column",
                    owner, property
                )
            }
        }
    }
}

/// Result type for compilation operations
pub type CompileResult<T> = Result<T, CompileError>;
