use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use campus_remote::{
    CallKey, CircuitBreaker, FetchOutcome, ReadThroughCache, RemoteSourceClient,
    SourceClientConfig,
};
use log::{debug, warn};

use super::codelist_model::{CodeKey, CodelistEntry, ResolvedMeanings};
use super::codelist_traits::{CodelistService, CodelistSource};
use crate::errors::{Error, Result};
use crate::language::Language;

/// Downstream name of the codelist store.
pub const CODELIST_DOWNSTREAM: &str = "codelist";

const RESOLVE_OPERATION: &str = "codelist.resolve";

/// Localized meanings keyed by code, as cached per language.
type MeaningMap = HashMap<CodeKey, String>;

/// Batch resolver over a [`CodelistSource`].
///
/// Each batch is deduplicated, sent in one round trip through a resilient
/// client and cached per language. Completeness is checked by set difference
/// between the requested and the returned keys.
pub struct CodelistResolver {
    source: Arc<dyn CodelistSource>,
    client: RemoteSourceClient<MeaningMap>,
}

impl CodelistResolver {
    pub fn new(source: Arc<dyn CodelistSource>, config: &SourceClientConfig) -> Self {
        let client = RemoteSourceClient::builder(CODELIST_DOWNSTREAM)
            .with_config(config)
            .circuit_breaker(Arc::new(CircuitBreaker::with_config(
                config.circuit_breaker.clone(),
            )))
            .cache(Arc::new(ReadThroughCache::new(config.cache_ttl)))
            .build();
        Self::with_client(source, client)
    }

    /// Use a pre-built client, e.g. one sharing a breaker with other downstreams.
    pub fn with_client(
        source: Arc<dyn CodelistSource>,
        client: RemoteSourceClient<MeaningMap>,
    ) -> Self {
        Self { source, client }
    }

    pub fn client(&self) -> &RemoteSourceClient<MeaningMap> {
        &self.client
    }

    /// Drop expired cached meanings. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.client
            .cache()
            .map(|cache| cache.purge_expired())
            .unwrap_or(0)
    }
}

/// One meaning per key. A key the source returned twice keeps its first entry.
fn localize(entries: Vec<CodelistEntry>, language: Language) -> MeaningMap {
    let mut meanings = MeaningMap::with_capacity(entries.len());
    for entry in entries {
        let meaning = entry.meaning(language);
        match meanings.entry(entry.key) {
            Entry::Occupied(existing) => {
                warn!(
                    "Codelist returned {} more than once; keeping '{}', ignoring '{}'",
                    existing.key(),
                    existing.get(),
                    meaning
                );
            }
            Entry::Vacant(slot) => {
                slot.insert(meaning);
            }
        }
    }
    meanings
}

/// Cache key of a deduplicated batch. JSON keeps codes containing separators unambiguous.
fn batch_request_key(batch: &[CodeKey]) -> Result<String> {
    serde_json::to_string(batch)
        .map_err(|e| Error::Internal(format!("codelist batch key could not be encoded: {}", e)))
}

#[async_trait]
impl CodelistService for CodelistResolver {
    async fn resolve_batch(
        &self,
        keys: &[CodeKey],
        language: Language,
    ) -> Result<ResolvedMeanings> {
        let requested: BTreeSet<CodeKey> = keys.iter().cloned().collect();
        if requested.is_empty() {
            return Ok(ResolvedMeanings::default());
        }

        let batch: Vec<CodeKey> = requested.iter().cloned().collect();
        let request_key = batch_request_key(&batch)?;
        debug!(
            "Resolving {} codelist key(s) in '{}'",
            batch.len(),
            language
        );

        let outcome = self
            .client
            .invoke(
                CallKey::new(RESOLVE_OPERATION, request_key, language.as_str()),
                || async {
                    self.source
                        .find_entries(&batch)
                        .await
                        .map(|entries| localize(entries, language))
                },
            )
            .await;

        match outcome {
            FetchOutcome::Success(mut meanings) => {
                meanings.retain(|key, _| requested.contains(key));

                let missing: BTreeSet<CodeKey> = requested
                    .iter()
                    .filter(|key| !meanings.contains_key(*key))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    warn!(
                        "{} of {} codelist key(s) have no stored entry",
                        missing.len(),
                        requested.len()
                    );
                    return Err(Error::MissingCodelistEntries(missing));
                }

                Ok(ResolvedMeanings::new(meanings))
            }
            FetchOutcome::NotFound => Err(Error::MissingCodelistEntries(requested)),
            FetchOutcome::Unavailable(cause) | FetchOutcome::Invalid(cause) => {
                Err(Error::from_source(CODELIST_DOWNSTREAM, cause))
            }
        }
    }
}
