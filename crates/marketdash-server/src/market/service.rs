//! Cached access to upstream market data.

use std::collections::BTreeMap;
use std::sync::Arc;

use marketdash_cache::{Cached, TtlCache};
use marketdash_core::SharedClock;
use serde_json::Value;

use crate::config::{CacheConfig, UpstreamConfig};
use crate::error::ApiError;
use crate::market::upstream::UpstreamSource;

/// Resolves `/api/market/{source}` requests through the shared cache.
pub struct MarketDataService {
    cache: Arc<TtlCache<Value>>,
    upstream: Arc<dyn UpstreamSource>,
    upstreams: BTreeMap<String, UpstreamConfig>,
    cache_config: CacheConfig,
}

impl MarketDataService {
    pub fn new(
        clock: SharedClock,
        upstream: Arc<dyn UpstreamSource>,
        upstreams: BTreeMap<String, UpstreamConfig>,
        cache_config: CacheConfig,
    ) -> Self {
        let cache = Arc::new(TtlCache::with_capacity(clock, cache_config.max_entries));
        Self {
            cache,
            upstream,
            upstreams,
            cache_config,
        }
    }

    pub fn cache(&self) -> &Arc<TtlCache<Value>> {
        &self.cache
    }

    /// Configured source names, sorted.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.upstreams.keys().map(String::as_str)
    }

    /// Cache key for a source.
    pub fn cache_key(source: &str) -> String {
        format!("market:{source}")
    }

    /// Fresh cache, then upstream, then stale cache.
    pub async fn fetch(&self, source: &str) -> Result<Cached<Value>, ApiError> {
        let upstream = self
            .upstreams
            .get(source)
            .ok_or_else(|| ApiError::UnknownSource(source.to_string()))?;

        let ttl = self.cache_config.ttl_for(upstream.tier);
        let key = Self::cache_key(source);

        let cached = self
            .cache
            .fetch_with_fallback(&key, ttl, || self.upstream.fetch(source, upstream))
            .await?;

        Ok(cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::CacheTier;
    use crate::market::upstream::UpstreamError;
    use async_trait::async_trait;
    use marketdash_cache::Freshness;
    use marketdash_core::ManualClock;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::time::Duration;

    /// Upstream that answers with a counter until switched off.
    struct ScriptedUpstream {
        calls: AtomicU64,
        healthy: AtomicBool,
    }

    impl ScriptedUpstream {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU64::new(0),
                healthy: AtomicBool::new(true),
            })
        }
    }

    #[async_trait]
    impl UpstreamSource for ScriptedUpstream {
        async fn fetch(&self, name: &str, _upstream: &UpstreamConfig) -> Result<Value, UpstreamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.healthy.load(Ordering::SeqCst) {
                Ok(json!({ "source": name, "call": n }))
            } else {
                Err(UpstreamError::Status(502))
            }
        }
    }

    fn service(upstream: Arc<ScriptedUpstream>) -> (MarketDataService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let mut upstreams = BTreeMap::new();
        upstreams.insert(
            "prices".to_string(),
            UpstreamConfig::new("http://unused", CacheTier::Short),
        );
        upstreams.insert(
            "tvl".to_string(),
            UpstreamConfig::new("http://unused", CacheTier::Long),
        );
        let service =
            MarketDataService::new(clock.clone(), upstream, upstreams, CacheConfig::default());
        (service, clock)
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let (service, _clock) = service(ScriptedUpstream::new());
        let err = service.fetch("nope").await.unwrap_err();
        assert!(matches!(err, ApiError::UnknownSource(ref s) if s == "nope"));
    }

    #[tokio::test]
    async fn test_tier_ttl_applies() {
        let upstream = ScriptedUpstream::new();
        let (service, clock) = service(upstream.clone());

        assert_eq!(service.fetch("prices").await.unwrap().freshness, Freshness::Fetched);
        assert_eq!(service.fetch("tvl").await.unwrap().freshness, Freshness::Fetched);

        clock.advance(Duration::from_secs(61));
        // Short tier (60s) expired, long tier (300s) has not.
        assert_eq!(service.fetch("prices").await.unwrap().freshness, Freshness::Fetched);
        assert_eq!(service.fetch("tvl").await.unwrap().freshness, Freshness::Fresh);
        assert_eq!(upstream.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stale_served_when_upstream_down() {
        let upstream = ScriptedUpstream::new();
        let (service, clock) = service(upstream.clone());

        let first = service.fetch("prices").await.unwrap();
        assert_eq!(first.value["call"], 1);

        upstream.healthy.store(false, Ordering::SeqCst);
        clock.advance(Duration::from_secs(120));

        let stale = service.fetch("prices").await.unwrap();
        assert_eq!(stale.freshness, Freshness::Stale);
        assert_eq!(stale.value["call"], 1);
        assert_eq!(service.cache().stats().stale_hits, 1);
    }

    #[tokio::test]
    async fn test_upstream_down_without_cache() {
        let upstream = ScriptedUpstream::new();
        upstream.healthy.store(false, Ordering::SeqCst);
        let (service, _clock) = service(upstream);

        let err = service.fetch("prices").await.unwrap_err();
        assert!(matches!(err, ApiError::UpstreamUnavailable { .. }));
    }

    #[test]
    fn test_cache_key_and_sources() {
        assert_eq!(MarketDataService::cache_key("tvl"), "market:tvl");
        let (service, _clock) = service(ScriptedUpstream::new());
        assert_eq!(service.sources().collect::<Vec<_>>(), vec!["prices", "tvl"]);
    }
}
