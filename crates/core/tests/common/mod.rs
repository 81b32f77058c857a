//! Shared fakes for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use campus_core::codelist::{CodeKey, CodelistEntry, CodelistResolver, CodelistSource};
use campus_core::profiles::{
    FragmentKind, LocalStore, ProfileId, RawFragment, RawProfileCore, RemoteProfileSource,
};
use campus_core::{Aggregator, AggregatorConfig, FetchOutcome, Language, SourceError};
use campus_remote::{CircuitBreakerConfig, RetryPolicy, SourceClientConfig};

// =============================================================================
// Local store
// =============================================================================

pub struct FakeLocalStore {
    profiles: HashMap<u32, RawProfileCore>,
    /// Answer every read with `Invalid(cause)` instead.
    broken: Option<SourceError>,
    pub calls: AtomicUsize,
}

impl FakeLocalStore {
    pub fn with(id: u32, core: RawProfileCore) -> Self {
        Self {
            profiles: HashMap::from([(id, core)]),
            broken: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn broken(cause: SourceError) -> Self {
        Self {
            profiles: HashMap::new(),
            broken: Some(cause),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LocalStore for FakeLocalStore {
    async fn get_fragment(&self, id: ProfileId) -> FetchOutcome<RawProfileCore> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(cause) = &self.broken {
            return FetchOutcome::Invalid(cause.clone());
        }
        match self.profiles.get(&id.get()) {
            Some(core) => FetchOutcome::Success(core.clone()),
            None => FetchOutcome::NotFound,
        }
    }
}

// =============================================================================
// Remote sources
// =============================================================================

#[derive(Clone)]
pub enum Behavior {
    Return(RawFragment),
    NotFound,
    Unavailable,
    Invalid(SourceError),
    /// Sleep, then return the fragment.
    Slow(Duration, RawFragment),
}

pub struct FakeRemoteSource {
    id: &'static str,
    kind: FragmentKind,
    required: bool,
    behavior: Mutex<Behavior>,
    pub calls: AtomicUsize,
    /// Calls that ran to completion.
    pub completed: AtomicUsize,
}

impl FakeRemoteSource {
    pub fn new(id: &'static str, kind: FragmentKind, behavior: Behavior) -> Self {
        Self {
            id,
            kind,
            required: true,
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteProfileSource for FakeRemoteSource {
    fn id(&self) -> &'static str {
        self.id
    }

    fn kind(&self) -> FragmentKind {
        self.kind
    }

    fn required(&self) -> bool {
        self.required
    }

    async fn get_fragment(
        &self,
        _id: ProfileId,
        _language: Language,
    ) -> FetchOutcome<RawFragment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        let outcome = match behavior {
            Behavior::Return(fragment) => FetchOutcome::Success(fragment),
            Behavior::NotFound => FetchOutcome::NotFound,
            Behavior::Unavailable => FetchOutcome::Unavailable(SourceError::Unavailable {
                downstream: self.id.to_string(),
                message: "connection refused".to_string(),
            }),
            Behavior::Invalid(cause) => FetchOutcome::Invalid(cause),
            Behavior::Slow(pause, fragment) => {
                tokio::time::sleep(pause).await;
                FetchOutcome::Success(fragment)
            }
        };
        self.completed.fetch_add(1, Ordering::SeqCst);
        outcome
    }
}

// =============================================================================
// Codelist
// =============================================================================

pub struct FakeCodelist {
    entries: Vec<CodelistEntry>,
    pub calls: AtomicUsize,
}

impl FakeCodelist {
    pub fn new(entries: Vec<CodelistEntry>) -> Self {
        Self {
            entries,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodelistSource for FakeCodelist {
    async fn find_entries(&self, keys: &[CodeKey]) -> FetchOutcome<Vec<CodelistEntry>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FetchOutcome::Success(
            self.entries
                .iter()
                .filter(|entry| keys.contains(&entry.key))
                .cloned()
                .collect(),
        )
    }
}

pub fn entry(domain: &str, code: &str, cs: &str, en: &str) -> CodelistEntry {
    CodelistEntry {
        key: CodeKey::new(domain, code),
        meaning_cs: Some(cs.to_string()),
        meaning_en: Some(en.to_string()),
        abbreviation: None,
    }
}

pub fn catalog() -> Vec<CodelistEntry> {
    vec![
        entry("TITUL_PRED", "Ing", "inženýr", "Engineer"),
        entry("TITUL_ZA", "PhD", "doktor", "Doctor of Philosophy"),
        entry("POHLAVI", "M", "muž", "Male"),
        entry("POHLAVI", "Z", "žena", "Female"),
        entry("STAV", "1", "svobodný/á", "Single"),
        entry("CIS_BANK", "0100", "Komerční banka", "Komercni banka"),
        entry("FORMA_OBORU_NEW", "P", "prezenční", "full-time"),
        entry("STAT", "203", "Česká republika", "Czech Republic"),
        entry("STAT", "703", "Slovensko", "Slovakia"),
        entry("OBEC", "554804", "Ústí nad Labem", "Usti nad Labem"),
    ]
}

// =============================================================================
// Wiring
// =============================================================================

pub const PERSON: u32 = 4711;

pub fn person_id() -> ProfileId {
    ProfileId::new(PERSON).unwrap()
}

/// Fast retries and generous deadlines, so tests depend on outcomes rather than timing.
pub fn test_config() -> AggregatorConfig {
    AggregatorConfig {
        local_deadline: Duration::from_millis(500),
        overall_deadline: Duration::from_secs(2),
        remote: SourceClientConfig {
            deadline: Duration::from_millis(500),
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(5),
            },
            circuit_breaker: CircuitBreakerConfig::default(),
            cache_ttl: Duration::from_secs(60),
        },
    }
}

pub fn ing_male() -> RawProfileCore {
    RawProfileCore {
        first_name: "Petr".to_string(),
        last_name: "Svoboda".to_string(),
        title_prefix: Some("Ing".to_string()),
        gender: Some("M".to_string()),
        ..RawProfileCore::default()
    }
}

pub struct Fixture {
    pub local: Arc<FakeLocalStore>,
    pub codelist: Arc<FakeCodelist>,
    pub aggregator: Aggregator,
}

pub fn fixture(
    core: RawProfileCore,
    remotes: Vec<Arc<FakeRemoteSource>>,
    config: AggregatorConfig,
) -> Fixture {
    fixture_with_local(FakeLocalStore::with(PERSON, core), remotes, config)
}

pub fn fixture_with_local(
    local: FakeLocalStore,
    remotes: Vec<Arc<FakeRemoteSource>>,
    config: AggregatorConfig,
) -> Fixture {
    let local = Arc::new(local);
    let codelist = Arc::new(FakeCodelist::new(catalog()));
    let resolver = Arc::new(CodelistResolver::new(codelist.clone(), &config.remote));

    let mut aggregator = Aggregator::new(local.clone(), resolver, config);
    for remote in remotes {
        aggregator = aggregator.with_remote_source(remote);
    }

    Fixture {
        local,
        codelist,
        aggregator,
    }
}
