//! Campus Core - profile aggregation and reference-data resolution.
//!
//! Composes one client-facing profile from a local person store and several
//! independently owned remote services, resolves coded values through the
//! codelist, and turns every failure into one structured error.
//!
//! Storage and transport are not part of this crate; they plug in through the
//! [`profiles::LocalStore`], [`profiles::RemoteProfileSource`] and
//! [`codelist::CodelistSource`] traits.

pub mod aggregation;
pub mod codelist;
pub mod config;
pub mod errors;
pub mod language;
pub mod profiles;
pub mod service;
pub mod translate;

pub use aggregation::{Aggregator, CancellationToken};
pub use codelist::{CodeKey, CodelistResolver, CodelistService, CodelistSource};
pub use config::AggregatorConfig;
pub use language::Language;
pub use profiles::{CompositeProfile, FragmentKind, ProfileId, SimpleProfile};
pub use service::ProfileService;
pub use translate::{to_external_error, ErrorKind, ExternalError};

// Re-export error types
pub use errors::Error;
pub use errors::Result;

// Re-export the resilience layer so adapters need only one dependency
pub use campus_remote::{FetchOutcome, SourceError};
