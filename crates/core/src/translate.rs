//! Translation of internal failures into caller-facing errors.
//!
//! | Internal signal | Kind | Code |
//! |-----------------|------|------|
//! | `NotFound` | `not-found` | 404 |
//! | `Validation` / `Invalid` | `bad-request` | 400 |
//! | `PermissionDenied` | `forbidden` | 403 |
//! | `DependencyUnavailable` / circuit open | `service-unavailable` | 503 |
//! | `DeadlineExceeded` | `gateway-timeout` | 504 |
//! | `PartialAggregation` | `bad-gateway` | 502 |
//! | `Cancelled` | `cancelled` | 499 |
//! | anything else | `internal-error` | 500 |

use std::fmt;

use campus_remote::{FetchOutcome, SourceError};
use log::{error, warn};
use serde::Serialize;

use crate::errors::{Error, FieldViolation};

/// Stable, machine-readable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Forbidden,
    ServiceUnavailable,
    GatewayTimeout,
    BadGateway,
    Cancelled,
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::BadRequest => "bad-request",
            Self::Forbidden => "forbidden",
            Self::ServiceUnavailable => "service-unavailable",
            Self::GatewayTimeout => "gateway-timeout",
            Self::BadGateway => "bad-gateway",
            Self::Cancelled => "cancelled",
            Self::InternalError => "internal-error",
        }
    }

    /// HTTP-style status code.
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::ServiceUnavailable => 503,
            Self::GatewayTimeout => 504,
            Self::BadGateway => 502,
            Self::Cancelled => 499,
            Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error as seen by callers of the profile service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalError {
    pub kind: ErrorKind,
    pub code: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<FieldViolation>,
}

impl ExternalError {
    fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code(),
            detail: detail.into(),
            violations: Vec::new(),
        }
    }

    fn internal() -> Self {
        Self::new(ErrorKind::InternalError, "An internal error occurred")
    }
}

impl fmt::Display for ExternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.code, self.detail)
    }
}

impl std::error::Error for ExternalError {}

impl From<Error> for ExternalError {
    fn from(error: Error) -> Self {
        to_external_error(&error)
    }
}

/// Map an internal error onto the external taxonomy.
///
/// Internal details are logged and replaced by a generic message.
pub fn to_external_error(error: &Error) -> ExternalError {
    match error {
        Error::NotFound { .. } => ExternalError::new(ErrorKind::NotFound, error.to_string()),
        Error::Validation(violations) => ExternalError {
            violations: violations.clone(),
            ..ExternalError::new(ErrorKind::BadRequest, "Input validation failed")
        },
        Error::PermissionDenied(_) => {
            warn!("{}", error);
            ExternalError::new(ErrorKind::Forbidden, "Access to the profile is not allowed")
        }
        Error::DependencyUnavailable { downstream, .. } => ExternalError::new(
            ErrorKind::ServiceUnavailable,
            format!("Dependency '{}' is temporarily unavailable", downstream),
        ),
        Error::DeadlineExceeded => ExternalError::new(
            ErrorKind::GatewayTimeout,
            "The profile could not be assembled in time",
        ),
        Error::Cancelled => ExternalError::new(ErrorKind::Cancelled, error.to_string()),
        Error::PartialAggregation { fragment, cause } => match cause.as_ref() {
            Error::PermissionDenied(_) => to_external_error(cause),
            _ => {
                warn!("{}", error);
                ExternalError::new(
                    ErrorKind::BadGateway,
                    format!("The {} part of the profile could not be assembled", fragment),
                )
            }
        },
        Error::MissingCodelistEntries(_) | Error::Internal(_) => {
            error!("Internal error withheld from caller: {}", error);
            ExternalError::internal()
        }
    }
}

/// Map a non-successful fetch outcome. Returns `None` for `Success`.
pub fn from_outcome<T>(downstream: &str, outcome: &FetchOutcome<T>) -> Option<ExternalError> {
    let error = match outcome {
        FetchOutcome::Success(_) => return None,
        FetchOutcome::NotFound => Error::not_found("resource", downstream),
        FetchOutcome::Unavailable(_) => Error::unavailable(downstream),
        FetchOutcome::Invalid(SourceError::PermissionDenied(message)) => {
            Error::PermissionDenied(message.clone())
        }
        FetchOutcome::Invalid(SourceError::InvalidArgument(message)) => {
            Error::invalid_field(downstream, message.clone())
        }
        FetchOutcome::Invalid(cause) => Error::Internal(format!("{}: {}", downstream, cause)),
    };
    Some(to_external_error(&error))
}
