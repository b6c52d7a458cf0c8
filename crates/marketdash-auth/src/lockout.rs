//! Failed-attempt lockout tracking.
//!
//! Each client identifier moves through three states:
//!
//! ```text
//! Clear --fail--> Accumulating (1..max) --max-th fail--> LockedOut (until locked_until)
//!   ^                    |                                     |
//!   +---- success -------+----- success / expiry purge --------+
//! ```
//!
//! The lockout window is fixed by the failure that triggered it. Failures
//! while already locked out are counted but never push `locked_until` later.
//!
//! Accumulating records idle for a full lockout window are forgotten: the
//! next failure starts over at one and [`LockoutTracker::purge_expired`]
//! drops them, so rotating client identifiers cannot grow the map forever.
//!
//! All read-modify-write sequences run inside a single `DashMap` entry guard,
//! so concurrent failures for the same client never lose an increment.

use std::time::Duration;

use dashmap::DashMap;
use marketdash_core::SharedClock;
use time::OffsetDateTime;

use crate::config::AuthConfig;

/// Failure bookkeeping for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockoutRecord {
    /// Consecutive failures since the last success or lockout expiry.
    pub failure_count: u32,
    /// Set once `failure_count` reaches the threshold.
    pub locked_until: Option<OffsetDateTime>,
    /// Time of the most recent failure.
    pub last_failure_at: Option<OffsetDateTime>,
}

impl LockoutRecord {
    /// `true` once a lockout was set and its window has passed.
    pub fn lockout_expired(&self, now: OffsetDateTime) -> bool {
        self.locked_until.is_some_and(|until| now >= until)
    }

    /// `true` for a record below the threshold with no failure for `idle`.
    pub fn idle_expired(&self, now: OffsetDateTime, idle: Duration) -> bool {
        self.locked_until.is_none() && self.last_failure_at.is_some_and(|at| now - at >= idle)
    }

    fn is_stale(&self, now: OffsetDateTime, idle: Duration) -> bool {
        self.lockout_expired(now) || self.idle_expired(now, idle)
    }
}

/// Observable lockout state of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    Clear,
    Accumulating { failures: u32 },
    LockedOut { until: OffsetDateTime },
}

/// Tracks failed authentication attempts per client identifier.
pub struct LockoutTracker {
    records: DashMap<String, LockoutRecord>,
    clock: SharedClock,
    max_failed_attempts: u32,
    lockout_duration: Duration,
}

impl LockoutTracker {
    pub fn new(clock: SharedClock, max_failed_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            records: DashMap::new(),
            clock,
            max_failed_attempts: max_failed_attempts.max(1),
            lockout_duration,
        }
    }

    pub fn from_config(config: &AuthConfig, clock: SharedClock) -> Self {
        Self::new(clock, config.max_failed_attempts, config.lockout_duration)
    }

    /// Whether `client_id` is currently blocked.
    ///
    /// An expired lockout is deleted here, so the client starts over from a
    /// clean record.
    pub fn is_locked_out(&self, client_id: &str) -> bool {
        let now = self.clock.now();

        if self
            .records
            .remove_if(client_id, |_, record| record.lockout_expired(now))
            .is_some()
        {
            tracing::debug!(client_id = %client_id, "Lockout expired, record purged");
            return false;
        }

        self.records
            .get(client_id)
            .is_some_and(|record| record.failure_count >= self.max_failed_attempts)
    }

    /// Count a failed attempt and start a lockout when the threshold is hit.
    ///
    /// A record whose lockout already lapsed (but was not purged yet), or
    /// that sat idle below the threshold for a full window, starts over at
    /// one failure.
    pub fn record_failed_attempt(&self, client_id: &str) -> LockoutState {
        let now = self.clock.now();
        let mut entry = self.records.entry(client_id.to_string()).or_default();
        let record = entry.value_mut();

        if record.is_stale(now, self.lockout_duration) {
            *record = LockoutRecord::default();
        }

        record.failure_count = record.failure_count.saturating_add(1);
        record.last_failure_at = Some(now);

        if record.failure_count >= self.max_failed_attempts && record.locked_until.is_none() {
            let until = now + self.lockout_duration;
            record.locked_until = Some(until);
            tracing::warn!(
                client_id = %client_id,
                failures = record.failure_count,
                lockout_secs = self.lockout_duration.as_secs(),
                "Client locked out after repeated failed attempts"
            );
        }

        self.state_of(record)
    }

    /// Forget every failure recorded for `client_id`.
    pub fn clear_failed_attempts(&self, client_id: &str) {
        self.records.remove(client_id);
    }

    /// Current state without purging anything.
    pub fn state(&self, client_id: &str) -> LockoutState {
        self.records
            .get(client_id)
            .map(|record| self.state_of(&record))
            .unwrap_or(LockoutState::Clear)
    }

    pub fn failure_count(&self, client_id: &str) -> u32 {
        self.records
            .get(client_id)
            .map(|record| record.failure_count)
            .unwrap_or(0)
    }

    pub fn locked_until(&self, client_id: &str) -> Option<OffsetDateTime> {
        self.records.get(client_id).and_then(|record| record.locked_until)
    }

    /// Remove every record whose lockout has lapsed, plus accumulating
    /// records idle for at least one lockout window.
    ///
    /// Returns the number of records removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;

        self.records.retain(|_, record| {
            if record.is_stale(now, self.lockout_duration) {
                removed += 1;
                false
            } else {
                true
            }
        });

        removed
    }

    /// Number of clients with a failure record.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn state_of(&self, record: &LockoutRecord) -> LockoutState {
        match record.locked_until {
            Some(until) if record.failure_count >= self.max_failed_attempts => {
                LockoutState::LockedOut { until }
            }
            _ if record.failure_count == 0 => LockoutState::Clear,
            _ => LockoutState::Accumulating {
                failures: record.failure_count,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marketdash_core::{Clock, ManualClock};
    use std::sync::Arc;

    const CLIENT: &str = "1.2.3.4";

    fn tracker() -> (LockoutTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let tracker = LockoutTracker::new(clock.clone(), 5, Duration::from_secs(15 * 60));
        (tracker, clock)
    }

    #[test]
    fn test_unknown_client_is_clear() {
        let (tracker, _clock) = tracker();
        assert!(!tracker.is_locked_out(CLIENT));
        assert_eq!(tracker.state(CLIENT), LockoutState::Clear);
        assert_eq!(tracker.failure_count(CLIENT), 0);
    }

    #[test]
    fn test_threshold_is_exactly_max_attempts() {
        let (tracker, _clock) = tracker();

        for n in 1..=4 {
            let state = tracker.record_failed_attempt(CLIENT);
            assert_eq!(state, LockoutState::Accumulating { failures: n });
            assert!(!tracker.is_locked_out(CLIENT), "after {n} failures");
        }

        let state = tracker.record_failed_attempt(CLIENT);
        assert!(matches!(state, LockoutState::LockedOut { .. }));
        assert!(tracker.is_locked_out(CLIENT));
    }

    #[test]
    fn test_failures_during_lockout_do_not_extend_it() {
        let (tracker, clock) = tracker();
        for _ in 0..5 {
            tracker.record_failed_attempt(CLIENT);
        }
        let until = tracker.locked_until(CLIENT).expect("locked");
        assert_eq!(until, clock.now() + Duration::from_secs(900));

        clock.advance(Duration::from_secs(60));
        tracker.record_failed_attempt(CLIENT);
        tracker.record_failed_attempt(CLIENT);

        assert_eq!(tracker.locked_until(CLIENT), Some(until));
        assert_eq!(tracker.failure_count(CLIENT), 7);
    }

    #[test]
    fn test_lockout_expiry_purges_record() {
        let (tracker, clock) = tracker();
        for _ in 0..5 {
            tracker.record_failed_attempt(CLIENT);
        }

        clock.advance(Duration::from_secs(899));
        assert!(tracker.is_locked_out(CLIENT));

        clock.advance(Duration::from_secs(1));
        assert!(!tracker.is_locked_out(CLIENT));
        assert!(tracker.is_empty());

        tracker.record_failed_attempt(CLIENT);
        assert_eq!(tracker.failure_count(CLIENT), 1);
    }

    #[test]
    fn test_failure_after_unpurged_expiry_starts_over() {
        let (tracker, clock) = tracker();
        for _ in 0..5 {
            tracker.record_failed_attempt(CLIENT);
        }
        clock.advance(Duration::from_secs(901));

        // No is_locked_out() in between, so the record is still there.
        let state = tracker.record_failed_attempt(CLIENT);
        assert_eq!(state, LockoutState::Accumulating { failures: 1 });
    }

    #[test]
    fn test_clear_resets_count() {
        let (tracker, _clock) = tracker();
        for _ in 0..3 {
            tracker.record_failed_attempt(CLIENT);
        }
        tracker.clear_failed_attempts(CLIENT);

        assert_eq!(tracker.state(CLIENT), LockoutState::Clear);
        tracker.record_failed_attempt(CLIENT);
        assert_eq!(tracker.failure_count(CLIENT), 1);
    }

    #[test]
    fn test_clients_are_tracked_independently() {
        let (tracker, _clock) = tracker();
        for _ in 0..5 {
            tracker.record_failed_attempt("10.0.0.1");
        }
        assert!(tracker.is_locked_out("10.0.0.1"));
        assert!(!tracker.is_locked_out("10.0.0.2"));
    }

    #[test]
    fn test_purge_expired_keeps_active_records() {
        let (tracker, clock) = tracker();
        for _ in 0..5 {
            tracker.record_failed_attempt("locked");
        }
        clock.advance(Duration::from_secs(600));
        tracker.record_failed_attempt("accumulating");

        clock.advance(Duration::from_secs(301));
        assert_eq!(tracker.purge_expired(), 1);
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.failure_count("accumulating"), 1);
    }

    #[test]
    fn test_idle_accumulating_records_are_purged() {
        let (tracker, clock) = tracker();
        for n in 0..1000 {
            tracker.record_failed_attempt(&format!("10.1.{}.{}", n / 256, n % 256));
        }
        assert_eq!(tracker.len(), 1000);

        clock.advance(Duration::from_secs(899));
        tracker.record_failed_attempt("10.1.0.0");
        assert_eq!(tracker.purge_expired(), 0);

        clock.advance(Duration::from_secs(1));
        assert_eq!(tracker.purge_expired(), 999);
        assert_eq!(tracker.failure_count("10.1.0.0"), 2);
    }

    #[test]
    fn test_idle_accumulating_record_starts_over() {
        let (tracker, clock) = tracker();
        for _ in 0..4 {
            tracker.record_failed_attempt(CLIENT);
        }

        clock.advance(Duration::from_secs(900));
        let state = tracker.record_failed_attempt(CLIENT);
        assert_eq!(state, LockoutState::Accumulating { failures: 1 });
        assert!(!tracker.is_locked_out(CLIENT));
    }

    #[test]
    fn test_failures_inside_window_keep_accumulating() {
        let (tracker, clock) = tracker();
        for _ in 0..4 {
            tracker.record_failed_attempt(CLIENT);
            clock.advance(Duration::from_secs(600));
        }
        let state = tracker.record_failed_attempt(CLIENT);
        assert!(matches!(state, LockoutState::LockedOut { .. }));
    }

    #[test]
    fn test_concurrent_failures_are_all_counted() {
        let clock = Arc::new(ManualClock::new());
        let tracker = Arc::new(LockoutTracker::new(clock, 1000, Duration::from_secs(60)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        tracker.record_failed_attempt(CLIENT);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(tracker.failure_count(CLIENT), 400);
    }
}
