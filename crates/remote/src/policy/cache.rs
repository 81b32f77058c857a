//! TTL read-through cache for slow-changing reference data.
//!
//! Entries expire only by age; there is no size-based eviction. Profile data is
//! never stored here, only reference lookups such as codelist meanings.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use log::debug;

/// Identity of one call: `(operation, request key, language)`. Also the cache key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallKey {
    pub operation: Cow<'static, str>,
    pub request_key: String,
    pub language: String,
}

impl CallKey {
    pub fn new(
        operation: impl Into<Cow<'static, str>>,
        request_key: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            request_key: request_key.into(),
            language: language.into(),
        }
    }
}

#[derive(Debug)]
struct CachedEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Concurrent read-through cache with a fixed time-to-live.
///
/// Sharded internally, so readers and writers on different keys never contend
/// on a single lock.
#[derive(Debug)]
pub struct ReadThroughCache<V> {
    entries: DashMap<CallKey, CachedEntry<V>>,
    ttl: Duration,
}

impl<V: Clone> ReadThroughCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a fresh entry, dropping it if it has expired.
    pub fn get(&self, key: &CallKey) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        // The read guard is released above; removing while holding it would deadlock the shard.
        if expired {
            debug!("Cache entry expired for {:?}", key);
            self.entries
                .remove_if(key, |_, entry| entry.stored_at.elapsed() >= self.ttl);
        }
        None
    }

    pub fn insert(&self, key: CallKey, value: V) {
        self.entries.insert(
            key,
            CachedEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &CallKey) {
        self.entries.remove(key);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
