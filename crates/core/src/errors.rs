//! Core error types for profile aggregation.
//!
//! Every failure inside the aggregation pipeline is expressed as an [`Error`].
//! Downstream transport details are reduced to the downstream's name; the
//! translator in [`crate::translate`] turns these into caller-facing errors.

use std::collections::BTreeSet;
use std::fmt;

use campus_remote::SourceError;
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::codelist::CodeKey;
use crate::profiles::FragmentKind;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for profile aggregation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Input validation failed: {}", format_violations(.0))]
    Validation(Vec<FieldViolation>),

    #[error("Dependency '{downstream}' is unavailable")]
    DependencyUnavailable { downstream: String, retriable: bool },

    #[error("Failed to aggregate the {fragment} fragment: {cause}")]
    PartialAggregation {
        fragment: FragmentKind,
        cause: Box<Error>,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Missing codelist entries: {}", format_keys(.0))]
    MissingCodelistEntries(BTreeSet<CodeKey>),

    #[error("Aggregation deadline exceeded")]
    DeadlineExceeded,

    #[error("Aggregation was cancelled")]
    Cancelled,

    #[error("Unexpected error: {0}")]
    Internal(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldViolation::new(field, message)])
    }

    pub fn unavailable(downstream: impl Into<String>) -> Self {
        Self::DependencyUnavailable {
            downstream: downstream.into(),
            retriable: true,
        }
    }

    pub fn partial(fragment: FragmentKind, cause: Error) -> Self {
        Self::PartialAggregation {
            fragment,
            cause: Box::new(cause),
        }
    }

    /// Convert a downstream failure cause, keeping only the downstream's name
    /// for transient failures.
    pub fn from_source(downstream: &str, cause: SourceError) -> Self {
        match cause {
            SourceError::Timeout { .. }
            | SourceError::Unavailable { .. }
            | SourceError::CircuitOpen { .. } => {
                debug!("Dependency '{}' unavailable: {}", downstream, cause);
                Self::unavailable(downstream)
            }
            SourceError::NotFound(what) => Self::NotFound {
                entity: "resource",
                id: what,
            },
            SourceError::InvalidArgument(message) => Self::invalid_field(downstream, message),
            SourceError::PermissionDenied(message) => Self::PermissionDenied(message),
            SourceError::Internal(message) => {
                Self::Internal(format!("{} failed: {}", downstream, message))
            }
        }
    }
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_keys(keys: &BTreeSet<CodeKey>) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
