//! Region resolver behavior against a scripted store.

use std::sync::Arc;
use std::time::Duration;

use cirrus_aws::s3::{InMemoryRegionCache, RegionCache, RegionResolver, ResolveError, StoreError};
use cirrus_aws::testing::MockBucketStore;
use cirrus_core::resilience::{BackoffStrategy, RetryConfig};
use tokio::time::Instant;

fn resolver_for(store: Arc<MockBucketStore>) -> (RegionResolver, Arc<InMemoryRegionCache>) {
    let cache = Arc::new(InMemoryRegionCache::new());
    (RegionResolver::new(store, cache.clone()), cache)
}

fn flaky() -> StoreError {
    StoreError::transient("GetBucketLocation", "connection reset by peer")
}

#[tokio::test]
async fn test_cache_hit_makes_no_remote_call() {
    let store = Arc::new(MockBucketStore::new().with_bucket("logs", Some("us-west-2")));
    let (resolver, cache) = resolver_for(store.clone());
    cache.insert("logs".into(), "eu-central-1".into());

    let region = resolver.resolve("logs").await.unwrap();

    assert_eq!(region, "eu-central-1");
    assert_eq!(store.location_calls("logs"), 0);
}

#[tokio::test]
async fn test_miss_populates_cache_for_next_call() {
    let store = Arc::new(MockBucketStore::new().with_bucket("logs", Some("us-west-2")));
    let (resolver, cache) = resolver_for(store.clone());

    assert_eq!(tokio_test::assert_ok!(resolver.resolve("logs").await), "us-west-2");
    assert_eq!(cache.get("logs").as_deref(), Some("us-west-2"));

    assert_eq!(resolver.resolve("logs").await.unwrap(), "us-west-2");
    assert_eq!(store.location_calls("logs"), 1);
}

#[tokio::test]
async fn test_blank_constraint_means_us_east_1() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("absent", None)
            .with_bucket("empty", Some(""))
            .with_bucket("legacy-eu", Some("EU")),
    );
    let (resolver, _) = resolver_for(store);

    assert_eq!(resolver.resolve("absent").await.unwrap(), "us-east-1");
    assert_eq!(resolver.resolve("empty").await.unwrap(), "us-east-1");
    assert_eq!(resolver.resolve("legacy-eu").await.unwrap(), "eu-west-1");
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_third_attempt_and_caches() {
    let store = Arc::new(MockBucketStore::new().with_location_replies(
        "logs",
        vec![Err(flaky()), Err(flaky()), Ok(Some("ap-northeast-1".into()))],
    ));
    let (resolver, cache) = resolver_for(store.clone());
    let start = Instant::now();

    let region = resolver.resolve("logs").await.unwrap();

    assert_eq!(region, "ap-northeast-1");
    assert_eq!(store.location_calls("logs"), 3);
    assert_eq!(cache.get("logs").as_deref(), Some("ap-northeast-1"));
    // 1s after the first failure, 2s after the second
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_three_failures_return_error_and_leave_cache_empty() {
    let store = Arc::new(MockBucketStore::new().with_location_replies("logs", vec![Err(flaky())]));
    let (resolver, cache) = resolver_for(store.clone());

    let err = resolver.resolve("logs").await.unwrap_err();

    match &err {
        ResolveError::Exhausted {
            bucket, attempts, ..
        } => {
            assert_eq!(bucket, "logs");
            assert_eq!(*attempts, 3);
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
    assert!(err.to_string().contains("logs"));
    assert_eq!(store.location_calls("logs"), 3);
    assert!(cache.get("logs").is_none());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_permanent_error_is_not_retried() {
    let store = Arc::new(MockBucketStore::new().with_location_replies(
        "private",
        vec![Err(StoreError::with_code(
            "GetBucketLocation",
            "AccessDenied",
            "Access Denied",
        ))],
    ));
    let (resolver, cache) = resolver_for(store.clone());

    let err = tokio_test::assert_err!(resolver.resolve("private").await);

    assert!(matches!(err, ResolveError::Rejected { .. }));
    assert_eq!(store.location_calls("private"), 1);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_custom_retry_budget() {
    let store = Arc::new(MockBucketStore::new().with_location_replies("logs", vec![Err(flaky())]));
    let (resolver, _) = resolver_for(store.clone());
    let resolver =
        resolver.with_retry(RetryConfig::new(5).backoff(BackoffStrategy::None));

    let err = resolver.resolve("logs").await.unwrap_err();

    assert!(matches!(err, ResolveError::Exhausted { attempts: 5, .. }));
    assert_eq!(store.location_calls("logs"), 5);
}

#[tokio::test]
async fn test_failure_then_later_success_is_cached() {
    let store = Arc::new(MockBucketStore::new().with_location_replies(
        "logs",
        vec![Err(flaky()), Ok(Some("sa-east-1".into()))],
    ));
    let (resolver, cache) = resolver_for(store.clone());
    let resolver = resolver.with_retry(RetryConfig::new(1));

    assert!(resolver.resolve("logs").await.is_err());
    assert!(cache.is_empty());

    assert_eq!(resolver.resolve("logs").await.unwrap(), "sa-east-1");
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_misses_for_same_bucket() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("logs", Some("eu-west-1"))
            .with_location_delay("logs", Duration::from_millis(50)),
    );
    let (resolver, cache) = resolver_for(store.clone());

    let (first, second) = tokio::join!(resolver.resolve("logs"), resolver.resolve("logs"));

    assert_eq!(tokio_test::assert_ok!(first), "eu-west-1");
    assert_eq!(tokio_test::assert_ok!(second), "eu-west-1");
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get("logs").as_deref(), Some("eu-west-1"));
    // both may miss and query the store; the writes agree
    let calls = store.location_calls("logs");
    assert!((1..=2).contains(&calls), "location calls = {calls}");
}
