//! Error types for SQLSpec

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a statement validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    /// Placeholder count does not line up with the supplied parameters
    PlaceholderMismatch,
    /// An identifier contains characters that are never legal in a name
    ForbiddenIdentifier,
    /// A literal-equals-literal predicate that is always true
    Tautology,
    /// A function on the configured deny list
    ForbiddenFunction,
    /// A UNION arm that looks like an injection probe
    UnionInjection,
    /// An IN list that expanded to zero elements
    EmptyInList,
    /// A query builder was finalized without a source table
    MissingSource,
}

impl std::fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PlaceholderMismatch => "placeholder_mismatch",
            Self::ForbiddenIdentifier => "forbidden_identifier",
            Self::Tautology => "tautology",
            Self::ForbiddenFunction => "forbidden_function",
            Self::UnionInjection => "union_injection",
            Self::EmptyInList => "empty_in_list",
            Self::MissingSource => "missing_source",
        };
        write!(f, "{}", s)
    }
}

/// Core error type for SQLSpec operations
#[derive(Error, Debug)]
pub enum SqlSpecError {
    #[error("parse error{}: {reason}", .position.map(|p| format!(" at position {}", p)).unwrap_or_default())]
    Parse {
        position: Option<usize>,
        reason: String,
    },

    #[error("validation failed ({kind}): {message}")]
    Validation {
        kind: ValidationKind,
        message: String,
        location: Option<String>,
    },

    #[error("expected {expected} parameters, got {actual}")]
    ParameterCountMismatch { expected: usize, actual: usize },

    #[error("cannot coerce parameter {index} from {source_type} to {target}")]
    ParameterCoercion {
        index: usize,
        source_type: &'static str,
        target: String,
    },

    #[error("mixed parameter styles detected: {found:?}")]
    MixedStyles { found: Vec<crate::ParameterStyle> },

    #[error("duplicate statement name: {name}")]
    DuplicateStatement { name: String },

    #[error("malformed SQL file at line {line}: {message}")]
    MalformedFile { line: usize, message: String },

    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("execution failed for statement {operation_index}: {source}")]
    Execution {
        sql: String,
        operation_index: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SqlSpecError {
    /// Shorthand for a validation failure without a node location.
    pub fn validation(kind: ValidationKind, message: impl Into<String>) -> Self {
        Self::Validation {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Shorthand for a validation failure anchored to a node rendering.
    pub fn validation_at(
        kind: ValidationKind,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self::Validation {
            kind,
            message: message.into(),
            location: Some(location.into()),
        }
    }
}

/// Result type alias for SQLSpec operations
pub type Result<T> = std::result::Result<T, SqlSpecError>;
