//! Terminal result of a single source fetch.

use crate::errors::SourceError;

/// Tagged terminal result of one source fetch.
///
/// Every call through a [`RemoteSourceClient`](crate::RemoteSourceClient) yields exactly one
/// of these. `Unavailable` carries a transient cause (timeout, unavailable, open circuit);
/// `Invalid` carries a semantic one (invalid argument, permission, internal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<T> {
    Success(T),
    NotFound,
    Unavailable(SourceError),
    Invalid(SourceError),
}

impl<T> FetchOutcome<T> {
    /// Classify a raw downstream result.
    ///
    /// `SourceError::NotFound` becomes [`FetchOutcome::NotFound`], transient errors become
    /// `Unavailable`, everything else becomes `Invalid`.
    pub fn from_result(result: Result<T, SourceError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(SourceError::NotFound(_)) => Self::NotFound,
            Err(e) if e.is_transient() => Self::Unavailable(e),
            Err(e) => Self::Invalid(e),
        }
    }

    pub fn map<U, F>(self, f: F) -> FetchOutcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => FetchOutcome::Success(f(value)),
            Self::NotFound => FetchOutcome::NotFound,
            Self::Unavailable(cause) => FetchOutcome::Unavailable(cause),
            Self::Invalid(cause) => FetchOutcome::Invalid(cause),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure cause, if the outcome carries one.
    pub fn cause(&self) -> Option<&SourceError> {
        match self {
            Self::Unavailable(cause) | Self::Invalid(cause) => Some(cause),
            Self::Success(_) | Self::NotFound => None,
        }
    }

    /// Whether another attempt might produce a different outcome.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(cause) if cause.counts_as_failure())
    }

    /// Short tag used in log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::NotFound => "not-found",
            Self::Unavailable(_) => "unavailable",
            Self::Invalid(_) => "invalid",
        }
    }
}

impl<T> From<Result<T, SourceError>> for FetchOutcome<T> {
    fn from(result: Result<T, SourceError>) -> Self {
        Self::from_result(result)
    }
}
