//! Codelist ports.

use async_trait::async_trait;
use campus_remote::FetchOutcome;

use super::codelist_model::{CodeKey, CodelistEntry, ResolvedMeanings};
use crate::errors::Result;
use crate::language::Language;

/// Raw access to the codelist store.
///
/// One call is one round trip. Entries that do not exist are simply absent
/// from the returned list.
#[async_trait]
pub trait CodelistSource: Send + Sync {
    async fn find_entries(&self, keys: &[CodeKey]) -> FetchOutcome<Vec<CodelistEntry>>;
}

/// Resolves coded values into localized meanings.
#[async_trait]
pub trait CodelistService: Send + Sync {
    /// Resolve every key in `keys`.
    ///
    /// Fails with [`Error::MissingCodelistEntries`](crate::Error::MissingCodelistEntries)
    /// naming exactly the keys that have no stored entry.
    async fn resolve_batch(&self, keys: &[CodeKey], language: Language)
        -> Result<ResolvedMeanings>;
}
