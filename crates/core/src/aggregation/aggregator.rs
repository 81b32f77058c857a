//! Two-phase profile aggregation.
//!
//! Phase 1 fetches the local person record and every remote fragment
//! concurrently. Phase 2 resolves the codes found in those fragments, one
//! codelist batch per fragment, reading an immutable snapshot of phase 1.
//! Either every task succeeds or the whole aggregation fails with one error.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use campus_remote::{CallKey, CircuitBreaker, CircuitMetrics, FetchOutcome, RemoteSourceClient};
use log::{debug, info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::task_group::TaskGroup;
use crate::codelist::{CodeKey, CodelistService, ResolvedMeanings};
use crate::config::AggregatorConfig;
use crate::errors::{Error, Result};
use crate::language::Language;
use crate::profiles::{
    CompositeProfile, FragmentKind, LocalStore, PersonalInfo, ProfileId, RawFragment,
    RawProfileCore, RemoteProfileSource, SimpleProfile, LOCAL_STORE_DOWNSTREAM,
};

const LOCAL_OPERATION: &str = "local.get_fragment";
const REMOTE_OPERATION: &str = "profile.get_fragment";

#[derive(Clone)]
struct RemoteSlot {
    source: Arc<dyn RemoteProfileSource>,
    client: RemoteSourceClient<RawFragment>,
}

/// Result of one phase-1 task.
enum Fetched {
    Core(RawProfileCore),
    Remote(FragmentKind, Option<RawFragment>),
}

/// Everything phase 1 produced. Shared read-only with phase 2.
#[derive(Clone)]
struct FragmentSnapshot {
    core: RawProfileCore,
    remote: BTreeMap<FragmentKind, RawFragment>,
}

impl FragmentSnapshot {
    fn collect(fetched: Vec<Fetched>) -> Result<Self> {
        let mut core = None;
        let mut remote = BTreeMap::new();
        for item in fetched {
            match item {
                Fetched::Core(fragment) => core = Some(fragment),
                Fetched::Remote(kind, Some(fragment)) => {
                    remote.insert(kind, fragment);
                }
                Fetched::Remote(_, None) => {}
            }
        }

        let core = core.ok_or_else(|| Error::Internal("local fragment missing".to_string()))?;
        Ok(Self { core, remote })
    }

    fn code_keys(&self, kind: FragmentKind) -> Vec<CodeKey> {
        match kind {
            FragmentKind::Core => self.core.code_keys(),
            other => self
                .remote
                .get(&other)
                .map(RawFragment::code_keys)
                .unwrap_or_default(),
        }
    }

    fn kinds(&self) -> impl Iterator<Item = FragmentKind> + '_ {
        std::iter::once(FragmentKind::Core).chain(self.remote.keys().copied())
    }
}

/// Assembles [`CompositeProfile`]s from a local store, remote sources and a codelist.
///
/// Every source call goes through a [`RemoteSourceClient`]; all clients of one
/// aggregator share a circuit breaker, keyed by downstream id.
pub struct Aggregator {
    local: Arc<dyn LocalStore>,
    local_client: RemoteSourceClient<RawProfileCore>,
    remotes: Vec<RemoteSlot>,
    codelist: Arc<dyn CodelistService>,
    breaker: Arc<CircuitBreaker>,
    config: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        local: Arc<dyn LocalStore>,
        codelist: Arc<dyn CodelistService>,
        config: AggregatorConfig,
    ) -> Self {
        let breaker = Arc::new(CircuitBreaker::with_config(
            config.remote.circuit_breaker.clone(),
        ));
        let local_client = RemoteSourceClient::builder(LOCAL_STORE_DOWNSTREAM)
            .with_config(&config.remote)
            .deadline(config.local_deadline)
            .circuit_breaker(Arc::clone(&breaker))
            .build();

        Self {
            local,
            local_client,
            remotes: Vec::new(),
            codelist,
            breaker,
            config,
        }
    }

    /// Register a remote fragment source.
    ///
    /// One source per fragment kind; a later source replaces an earlier one of the same kind.
    pub fn with_remote_source(mut self, source: Arc<dyn RemoteProfileSource>) -> Self {
        let kind = source.kind();
        self.remotes.retain(|slot| slot.source.kind() != kind);

        let client = RemoteSourceClient::builder(source.id())
            .with_config(&self.config.remote)
            .circuit_breaker(Arc::clone(&self.breaker))
            .build();
        self.remotes.push(RemoteSlot { source, client });
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    pub fn circuit_breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Circuit state of the local store and every remote source.
    pub fn circuit_metrics(&self) -> Vec<CircuitMetrics> {
        self.breaker.metrics()
    }

    pub fn reset_circuit(&self, downstream: &str) {
        self.breaker.reset(&Cow::Owned(downstream.to_string()));
    }

    pub async fn assemble(&self, id: ProfileId, language: Language) -> Result<CompositeProfile> {
        self.assemble_until(id, language, CancellationToken::new()).await
    }

    /// Assemble a profile, giving up when `cancel` fires.
    ///
    /// On any failure no task started by this call is still running when it returns.
    pub async fn assemble_until(
        &self,
        id: ProfileId,
        language: Language,
        cancel: CancellationToken,
    ) -> Result<CompositeProfile> {
        let deadline = Instant::now() + self.config.overall_deadline;
        info!(
            "Assembling profile {} ('{}') from local store and {} remote source(s)",
            id,
            language,
            self.remotes.len()
        );

        let mut fetches = TaskGroup::new("fragment");
        fetches.spawn(fetch_local(
            Arc::clone(&self.local),
            self.local_client.clone(),
            id,
        ));
        for slot in &self.remotes {
            fetches.spawn(fetch_remote(slot.clone(), id, language));
        }
        let snapshot = Arc::new(FragmentSnapshot::collect(
            fetches.join_all(deadline, &cancel).await?,
        )?);
        debug!(
            "Fetched {} remote fragment(s) for profile {}",
            snapshot.remote.len(),
            id
        );

        let mut lookups = TaskGroup::new("codelist");
        for kind in snapshot.kinds() {
            if snapshot.code_keys(kind).is_empty() {
                continue;
            }
            let snapshot = Arc::clone(&snapshot);
            let codelist = Arc::clone(&self.codelist);
            lookups.spawn(async move {
                let keys = snapshot.code_keys(kind);
                resolve_fragment(codelist.as_ref(), kind, &keys, language).await
            });
        }
        let mut meanings: HashMap<FragmentKind, ResolvedMeanings> = lookups
            .join_all(deadline, &cancel)
            .await?
            .into_iter()
            .collect();

        let snapshot = Arc::try_unwrap(snapshot).unwrap_or_else(|shared| (*shared).clone());
        let mut meanings_for = |kind: FragmentKind| meanings.remove(&kind).unwrap_or_default();

        let personal = PersonalInfo::resolve(snapshot.core, &meanings_for(FragmentKind::Core))
            .map_err(|e| Error::partial(FragmentKind::Core, e))?;
        let mut profile = CompositeProfile::new(id, language, personal);
        for (kind, fragment) in snapshot.remote {
            profile
                .attach(fragment, &meanings_for(kind))
                .map_err(|e| Error::partial(kind, e))?;
        }

        info!("Assembled profile {} ('{}')", id, language);
        Ok(profile)
    }

    pub async fn assemble_simple(
        &self,
        id: ProfileId,
        language: Language,
    ) -> Result<SimpleProfile> {
        self.assemble_simple_until(id, language, CancellationToken::new())
            .await
    }

    /// Names, titles and gender from the local store only.
    pub async fn assemble_simple_until(
        &self,
        id: ProfileId,
        language: Language,
        cancel: CancellationToken,
    ) -> Result<SimpleProfile> {
        let deadline = Instant::now() + self.config.overall_deadline;
        info!("Assembling simple profile {} ('{}')", id, language);

        let mut fetches = TaskGroup::new("fragment");
        fetches.spawn(fetch_local(
            Arc::clone(&self.local),
            self.local_client.clone(),
            id,
        ));
        let core = match fetches.join_all(deadline, &cancel).await?.pop() {
            Some(Fetched::Core(core)) => core,
            _ => return Err(Error::Internal("local fragment missing".to_string())),
        };

        let keys = core.simple_code_keys();
        let meanings = if keys.is_empty() {
            ResolvedMeanings::default()
        } else {
            let codelist = Arc::clone(&self.codelist);
            let mut lookups = TaskGroup::new("codelist");
            lookups.spawn(async move {
                resolve_fragment(codelist.as_ref(), FragmentKind::Core, &keys, language).await
            });
            lookups
                .join_all(deadline, &cancel)
                .await?
                .pop()
                .map(|(_, meanings)| meanings)
                .unwrap_or_default()
        };

        let profile = SimpleProfile::resolve(id, core, &meanings)
            .map_err(|e| Error::partial(FragmentKind::Core, e))?;
        info!("Assembled simple profile {} ('{}')", id, language);
        Ok(profile)
    }
}

async fn fetch_local(
    local: Arc<dyn LocalStore>,
    client: RemoteSourceClient<RawProfileCore>,
    id: ProfileId,
) -> Result<Fetched> {
    let key = CallKey::new(LOCAL_OPERATION, id.to_string(), "");
    match client.invoke(key, || local.get_fragment(id)).await {
        FetchOutcome::Success(core) => Ok(Fetched::Core(core)),
        FetchOutcome::NotFound => Err(Error::not_found("person", id)),
        FetchOutcome::Unavailable(cause) => {
            warn!("Local store unavailable for profile {}: {}", id, cause);
            Err(Error::unavailable(LOCAL_STORE_DOWNSTREAM))
        }
        FetchOutcome::Invalid(cause) => Err(Error::partial(
            FragmentKind::Core,
            Error::from_source(LOCAL_STORE_DOWNSTREAM, cause),
        )),
    }
}

async fn fetch_remote(slot: RemoteSlot, id: ProfileId, language: Language) -> Result<Fetched> {
    let RemoteSlot { source, client } = slot;
    let kind = source.kind();
    let downstream = source.id();

    let key = CallKey::new(REMOTE_OPERATION, id.to_string(), language.as_str());
    match client.invoke(key, || source.get_fragment(id, language)).await {
        FetchOutcome::Success(fragment) if fragment.kind() == kind => {
            Ok(Fetched::Remote(kind, Some(fragment)))
        }
        FetchOutcome::Success(fragment) => Err(Error::partial(
            kind,
            Error::Internal(format!(
                "'{}' delivered a {} fragment",
                downstream,
                fragment.kind()
            )),
        )),
        FetchOutcome::NotFound if !source.required() => {
            debug!(
                "Optional source '{}' has no {} fragment for profile {}",
                downstream, kind, id
            );
            Ok(Fetched::Remote(kind, None))
        }
        FetchOutcome::NotFound => Err(Error::partial(kind, Error::not_found(kind.as_str(), id))),
        FetchOutcome::Unavailable(cause) => {
            warn!(
                "Remote source '{}' unavailable for profile {}: {}",
                downstream, id, cause
            );
            Err(Error::unavailable(downstream))
        }
        FetchOutcome::Invalid(cause) => {
            Err(Error::partial(kind, Error::from_source(downstream, cause)))
        }
    }
}

async fn resolve_fragment(
    codelist: &dyn CodelistService,
    kind: FragmentKind,
    keys: &[CodeKey],
    language: Language,
) -> Result<(FragmentKind, ResolvedMeanings)> {
    match codelist.resolve_batch(keys, language).await {
        Ok(meanings) => Ok((kind, meanings)),
        Err(e @ Error::MissingCodelistEntries(_)) => Err(Error::partial(kind, e)),
        Err(e) => Err(e),
    }
}
