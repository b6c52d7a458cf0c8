//! Concurrent TTL cache with stale fallback.
//!
//! [`TtlCache`] is a `DashMap` keyed by string. Reads never block on I/O and
//! every single-key read-modify-write happens under the shard lock, so the
//! cache can be shared across tokio worker threads behind an `Arc`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use marketdash_cache::TtlCache;
//! use marketdash_core::ManualClock;
//!
//! let clock = Arc::new(ManualClock::new());
//! let cache: TtlCache<String> = TtlCache::new(clock.clone());
//!
//! cache.set("prices", "btc=1".to_string(), Duration::from_secs(60));
//! assert!(cache.get_fresh("prices").is_some());
//!
//! clock.advance(Duration::from_secs(61));
//! assert!(cache.get_fresh("prices").is_none());
//! assert_eq!(cache.get("prices").as_deref().map(String::as_str), Some("btc=1"));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use marketdash_core::SharedClock;
use serde::Serialize;
use time::OffsetDateTime;

use crate::entry::CacheEntry;
use crate::error::FetchError;

/// Default upper bound on the number of cached keys.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Where a value returned by [`TtlCache::fetch_with_fallback`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Served from cache within its TTL.
    Fresh,
    /// Just fetched from the upstream and written to the cache.
    Fetched,
    /// Upstream failed; served an expired entry.
    Stale,
}

impl Freshness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Fetched => "fetched",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value resolved through [`TtlCache::fetch_with_fallback`].
#[derive(Debug)]
pub struct Cached<V> {
    pub value: Arc<V>,
    pub freshness: Freshness,
    /// When the returned value was written to the cache.
    pub stored_at: OffsetDateTime,
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of entries currently in the cache (fresh and stale).
    pub entries: usize,
    /// Fresh lookups that found a value within its TTL.
    pub hits: u64,
    /// Fresh lookups that found nothing usable.
    pub misses: u64,
    /// Expired values served because the upstream failed.
    pub stale_hits: u64,
    /// Entries removed by the capacity bound or retention sweeps.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// In-memory TTL cache that retains stale entries as a fallback.
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    clock: SharedClock,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
    evictions: AtomicU64,
}

impl<V> TtlCache<V> {
    /// Create a cache holding up to [`DEFAULT_MAX_ENTRIES`] keys.
    pub fn new(clock: SharedClock) -> Self {
        Self::with_capacity(clock, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache holding up to `max_entries` keys.
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn with_capacity(clock: SharedClock, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Return the stored value regardless of freshness.
    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.get(key).map(|entry| Arc::clone(entry.data()))
    }

    /// Return the stored value only while it is within its TTL.
    pub fn get_fresh(&self, key: &str) -> Option<Arc<V>> {
        self.lookup_fresh(key).map(|entry| Arc::clone(entry.data()))
    }

    /// Store `value` under `key`, replacing any previous entry and resetting
    /// its write time to now.
    ///
    /// When a new key would exceed the capacity bound, the entry with the
    /// oldest write time is evicted first. Concurrent inserts of distinct new
    /// keys can overshoot the bound by the number of racing writers.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) -> Arc<V> {
        let key = key.into();
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        let value = Arc::clone(entry.data());

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        self.entries.insert(key, entry);
        value
    }

    /// Remove a single entry.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            tracing::debug!(key = %key, "cache entry invalidated");
        }
        removed
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Remove entries written more than `max_age` ago.
    ///
    /// Returns the number of entries removed. Entries younger than `max_age`
    /// stay even when stale, so they keep serving as fallback.
    pub fn purge_older_than(&self, max_age: Duration) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            if entry.age(now) >= max_age {
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }

        removed
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    /// Resolve `key` fresh-first, then upstream, then stale.
    ///
    /// 1. A fresh entry is returned without calling `fetch`.
    /// 2. Otherwise `fetch` runs; on success its value is stored with `ttl`.
    /// 3. If `fetch` fails, any stored entry (whatever its age) is returned.
    /// 4. Only when nothing is stored does the upstream error propagate.
    ///
    /// No lock is held while `fetch` runs. Concurrent misses for the same
    /// key each call the upstream; the last successful write wins.
    pub async fn fetch_with_fallback<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Cached<V>, FetchError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: fmt::Display,
    {
        if let Some(entry) = self.lookup_fresh(key) {
            return Ok(Cached {
                value: Arc::clone(entry.data()),
                freshness: Freshness::Fresh,
                stored_at: entry.stored_at(),
            });
        }

        match fetch().await {
            Ok(value) => {
                let stored_at = self.clock.now();
                let value = self.set(key, value, ttl);
                tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache refreshed from upstream");
                Ok(Cached {
                    value,
                    freshness: Freshness::Fetched,
                    stored_at,
                })
            }
            Err(error) => {
                let fallback = self.entries.get(key).map(|entry| entry.clone());
                match fallback {
                    Some(entry) => {
                        self.stale_hits.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            key = %key,
                            error = %error,
                            age_secs = entry.age(self.clock.now()).whole_seconds(),
                            "upstream failed, serving stale cache entry"
                        );
                        Ok(Cached {
                            value: Arc::clone(entry.data()),
                            freshness: Freshness::Stale,
                            stored_at: entry.stored_at(),
                        })
                    }
                    None => {
                        tracing::warn!(key = %key, error = %error, "upstream failed with no cached fallback");
                        Err(FetchError::new(key, error))
                    }
                }
            }
        }
    }

    fn lookup_fresh(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.clock.now();
        let found = self
            .entries
            .get(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.clone());

        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        found
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().stored_at())
            .map(|entry| entry.key().clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, max_entries = self.max_entries, "cache at capacity, evicted oldest entry");
        }
    }
}
