//! Cached entry with TTL support.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;

/// A cached value together with the moment it was written and its TTL.
///
/// The value is wrapped in `Arc` so cache hits hand out cheap clones of
/// potentially large upstream payloads.
#[derive(Debug)]
pub struct CacheEntry<V> {
    data: Arc<V>,
    stored_at: OffsetDateTime,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Create a new entry written at `stored_at`.
    pub fn new(value: V, stored_at: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            data: Arc::new(value),
            stored_at,
            ttl,
        }
    }

    pub fn data(&self) -> &Arc<V> {
        &self.data
    }

    pub fn stored_at(&self) -> OffsetDateTime {
        self.stored_at
    }

    /// Time elapsed since the entry was written.
    pub fn age(&self, now: OffsetDateTime) -> time::Duration {
        now - self.stored_at
    }

    /// `true` while `now - stored_at < ttl`.
    pub fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.age(now) < self.ttl
    }
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            stored_at: self.stored_at,
            ttl: self.ttl,
        }
    }
}
