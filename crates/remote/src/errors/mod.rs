//! Error types and retry classification for remote source calls.
//!
//! This module provides:
//! - [`SourceError`]: The failure cause carried by a non-successful fetch
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Failure causes reported by a downstream source or by the client wrapping it.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines whether the client may try the call again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The call did not complete before its deadline.
    #[error("Timeout: {downstream}")]
    Timeout {
        /// The downstream that timed out
        downstream: String,
    },

    /// The downstream could not be reached or reported itself unavailable.
    #[error("Unavailable: {downstream} - {message}")]
    Unavailable {
        /// The downstream that failed
        downstream: String,
        /// The raw failure message, for logs only
        message: String,
    },

    /// The circuit breaker is open for this downstream.
    /// No network attempt was made.
    #[error("Circuit open: {downstream}")]
    CircuitOpen {
        /// The downstream with an open circuit
        downstream: String,
    },

    /// The downstream has no record for the request.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The downstream rejected the request as malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The downstream refused the caller.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The downstream failed in a way that has no better classification.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SourceError {
    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Never`]: Semantic failure, the same request will fail again
    /// - [`RetryClass::WithBackoff`]: Transient failure, retry after a pause
    /// - [`RetryClass::CircuitOpen`]: The breaker rejected the call, do not retry
    ///
    /// # Examples
    ///
    /// ```
    /// use campus_remote::errors::{RetryClass, SourceError};
    ///
    /// let error = SourceError::Timeout { downstream: "study-plan".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = SourceError::NotFound("person 42".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Timeout { .. } | Self::Unavailable { .. } => RetryClass::WithBackoff,
            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
            Self::NotFound(_)
            | Self::InvalidArgument(_)
            | Self::PermissionDenied(_)
            | Self::Internal(_) => RetryClass::Never,
        }
    }

    /// Whether the failure may clear up on its own (timeout, unavailable, open circuit).
    pub fn is_transient(&self) -> bool {
        !matches!(self.retry_class(), RetryClass::Never)
    }

    /// Whether this failure should count against the downstream's circuit.
    pub(crate) fn counts_as_failure(&self) -> bool {
        self.retry_class() == RetryClass::WithBackoff
    }
}
