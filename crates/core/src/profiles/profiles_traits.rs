//! Profile source ports.
//!
//! These traits describe where raw fragments come from without naming any
//! storage or transport, so tests and deployments can plug in their own.

use async_trait::async_trait;
use campus_remote::FetchOutcome;

use super::profiles_model::{FragmentKind, ProfileId, RawFragment, RawProfileCore};
use crate::language::Language;

/// Read-only access to the locally owned person record.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get_fragment(&self, id: ProfileId) -> FetchOutcome<RawProfileCore>;
}

/// A remote service contributing one fragment of the profile.
///
/// Calls must be idempotent; the aggregator may repeat them after transient failures.
#[async_trait]
pub trait RemoteProfileSource: Send + Sync {
    /// Downstream identity, used for circuit breaking and in error reports.
    fn id(&self) -> &'static str;

    /// The fragment this source delivers.
    fn kind(&self) -> FragmentKind;

    /// Whether a `NotFound` from this source fails the aggregation.
    ///
    /// Optional sources that report `NotFound` leave their section empty.
    fn required(&self) -> bool {
        true
    }

    async fn get_fragment(&self, id: ProfileId, language: Language) -> FetchOutcome<RawFragment>;
}
