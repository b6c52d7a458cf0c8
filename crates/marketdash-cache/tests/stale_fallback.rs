//! Freshness and stale-fallback behaviour of `TtlCache` as seen by callers.

use std::sync::Arc;
use std::time::Duration;

use marketdash_cache::{Freshness, TtlCache};
use marketdash_core::ManualClock;
use serde_json::json;

#[derive(Debug)]
struct UpstreamDown;

impl std::fmt::Display for UpstreamDown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("upstream returned 503")
    }
}

#[test]
fn fresh_then_stale_for_various_ttls() {
    for ttl_secs in [1u64, 60, 120, 300, 3600] {
        let clock = Arc::new(ManualClock::new());
        let cache = TtlCache::new(clock.clone());
        let ttl = Duration::from_secs(ttl_secs);
        let value = json!({ "ttl": ttl_secs });

        cache.set("market:prices", value.clone(), ttl);
        assert_eq!(cache.get_fresh("market:prices").as_deref(), Some(&value));

        clock.advance(ttl - Duration::from_millis(1));
        assert_eq!(cache.get_fresh("market:prices").as_deref(), Some(&value));

        clock.advance(Duration::from_millis(2));
        assert!(cache.get_fresh("market:prices").is_none());
        assert_eq!(cache.get("market:prices").as_deref(), Some(&value));
    }
}

#[tokio::test]
async fn once_fetched_key_keeps_answering_while_upstream_is_down() {
    let clock = Arc::new(ManualClock::new());
    let cache = TtlCache::new(clock.clone());
    let ttl = Duration::from_secs(60);

    let first = cache
        .fetch_with_fallback("market:tvl", ttl, || async {
            Ok::<_, UpstreamDown>(json!({ "tvl": 100 }))
        })
        .await
        .expect("first fetch succeeds");
    assert_eq!(first.freshness, Freshness::Fetched);

    for _ in 0..5 {
        clock.advance(Duration::from_secs(3600));
        let served = cache
            .fetch_with_fallback("market:tvl", ttl, || async {
                Err::<serde_json::Value, _>(UpstreamDown)
            })
            .await
            .expect("stale fallback");
        assert_eq!(served.freshness, Freshness::Stale);
        assert_eq!(*served.value, json!({ "tvl": 100 }));
    }

    // A successful refetch replaces the fallback value.
    let refreshed = cache
        .fetch_with_fallback("market:tvl", ttl, || async {
            Ok::<_, UpstreamDown>(json!({ "tvl": 250 }))
        })
        .await
        .expect("refetch");
    assert_eq!(refreshed.freshness, Freshness::Fetched);
    assert_eq!(cache.get_fresh("market:tvl").as_deref(), Some(&json!({ "tvl": 250 })));
    assert_eq!(cache.stats().stale_hits, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_and_readers() {
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(TtlCache::<u64>::with_capacity(clock, 64));

    let mut handles = Vec::new();
    for task in 0..8u64 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            for i in 0..200u64 {
                let key = format!("k{}", (task * 7 + i) % 32);
                cache.set(key.clone(), i, Duration::from_secs(60));
                assert!(cache.get(&key).is_some());
            }
        }));
    }

    for handle in handles {
        handle.await.expect("task panicked");
    }

    assert!(cache.len() <= 32);
    assert_eq!(cache.stats().evictions, 0);
}
