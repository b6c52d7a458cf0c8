//! Periodic cleanup of expired sessions, lapsed lockouts and old cache
//! entries.

use std::sync::Arc;
use std::time::Duration;

use marketdash_auth::AdminAuthenticator;
use marketdash_cache::TtlCache;
use serde_json::Value;

/// Counts removed by one housekeeping pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HousekeepingReport {
    pub sessions: usize,
    pub lockouts: usize,
    pub cache_entries: usize,
}

impl HousekeepingReport {
    pub fn is_empty(&self) -> bool {
        self.sessions == 0 && self.lockouts == 0 && self.cache_entries == 0
    }
}

pub struct Housekeeper {
    authenticator: Arc<AdminAuthenticator>,
    cache: Arc<TtlCache<Value>>,
    stale_retention: Duration,
    interval: Duration,
}

impl Housekeeper {
    pub fn new(
        authenticator: Arc<AdminAuthenticator>,
        cache: Arc<TtlCache<Value>>,
        stale_retention: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            authenticator,
            cache,
            stale_retention,
            interval,
        }
    }

    /// Run one cleanup pass.
    pub fn run_once(&self) -> HousekeepingReport {
        HousekeepingReport {
            sessions: self.authenticator.sessions().cleanup_sessions(),
            lockouts: self.authenticator.lockout().purge_expired(),
            cache_entries: self.cache.purge_older_than(self.stale_retention),
        }
    }

    /// Start background cleanup task
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let report = self.run_once();
                if !report.is_empty() {
                    tracing::debug!(
                        sessions = report.sessions,
                        lockouts = report.lockouts,
                        cache_entries = report.cache_entries,
                        "Housekeeping removed expired state"
                    );
                }
            }
        })
    }
}
