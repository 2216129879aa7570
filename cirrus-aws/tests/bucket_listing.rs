//! Bucket lister behavior against a scripted store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cirrus_aws::s3::{
    BucketLister, InMemoryRegionCache, ListError, ListerConfig, RegionCache, RegionResolver,
    ResolutionPolicy, SENTINEL_REGION, StoreError,
};
use cirrus_aws::testing::{MockBucketStore, sample_creation_date};
use tokio::time::Instant;

fn lister_for(store: Arc<MockBucketStore>, config: ListerConfig) -> (BucketLister, Arc<InMemoryRegionCache>) {
    let cache = Arc::new(InMemoryRegionCache::new());
    let resolver = RegionResolver::new(store.clone(), cache.clone());
    (BucketLister::new(store, resolver).with_config(config), cache)
}

fn flaky() -> StoreError {
    StoreError::transient("GetBucketLocation", "service unavailable")
}

#[tokio::test]
async fn test_lists_every_bucket_with_region() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("alpha", Some("eu-west-2"))
            .with_bucket("beta", None)
            .with_bucket("gamma", Some("ap-south-1")),
    );
    let (lister, cache) = lister_for(store.clone(), ListerConfig::default());

    let records = lister.list_buckets().await.unwrap();

    assert_eq!(records.len(), 3);
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["alpha", "beta", "gamma"]);
    let regions: Vec<&str> = records.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(regions, ["eu-west-2", "us-east-1", "ap-south-1"]);
    assert!(records.iter().all(|r| r.creation_date == sample_creation_date()));
    assert_eq!(cache.len(), 3);
    assert_eq!(store.list_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_store_order_survives_out_of_order_completion() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("slowest", Some("us-west-1"))
            .with_bucket("middle", Some("us-west-2"))
            .with_bucket("fastest", Some("eu-north-1"))
            .with_location_delay("slowest", Duration::from_secs(3))
            .with_location_delay("middle", Duration::from_secs(2))
            .with_location_delay("fastest", Duration::from_secs(1)),
    );
    let (lister, _) = lister_for(store, ListerConfig::default());

    let records = lister.list_buckets().await.unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["slowest", "middle", "fastest"]);
    assert_eq!(records[0].region, "us-west-1");
    assert_eq!(records[2].region, "eu-north-1");
}

#[tokio::test]
async fn test_list_failure_returns_error_without_records() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("alpha", Some("eu-west-2"))
            .failing_list(StoreError::with_code("ListBuckets", "AccessDenied", "Access Denied")),
    );
    let (lister, _) = lister_for(store.clone(), ListerConfig::default());

    let err = lister.list_buckets().await.unwrap_err();

    assert!(matches!(err, ListError::List(_)));
    assert!(err.to_string().contains("failed to list buckets"));
    assert_eq!(store.total_location_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sentinel_policy_degrades_failed_bucket() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("alpha", Some("eu-west-2"))
            .with_location_replies("broken", vec![Err(flaky())])
            .with_bucket("gamma", Some("ap-south-1")),
    );
    let (lister, cache) = lister_for(store.clone(), ListerConfig::default());

    let records = lister.list_buckets().await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[1].name, "broken");
    assert_eq!(records[1].region, SENTINEL_REGION);
    assert_eq!(records[0].region, "eu-west-2");
    assert_eq!(store.location_calls("broken"), 3);
    assert!(cache.get("broken").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_strict_policy_fails_listing() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("alpha", Some("eu-west-2"))
            .with_location_replies("broken", vec![Err(flaky())]),
    );
    let (lister, _) = lister_for(
        store,
        ListerConfig::new().policy(ResolutionPolicy::Strict),
    );

    let err = lister.list_buckets().await.unwrap_err();

    match err {
        ListError::Resolution(err) => assert_eq!(err.bucket(), "broken"),
        other => panic!("expected resolution failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_account_lists_nothing() {
    let store = Arc::new(MockBucketStore::new());
    let (lister, _) = lister_for(store, ListerConfig::default());

    assert!(lister.list_buckets().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_listing_is_served_from_cache() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("alpha", Some("eu-west-2"))
            .with_bucket("beta", Some("us-east-2")),
    );
    let (lister, _) = lister_for(store.clone(), ListerConfig::default());

    let first = lister.list_buckets().await.unwrap();
    let second = lister.list_buckets().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.list_calls(), 2);
    assert_eq!(store.location_calls("alpha"), 1);
    assert_eq!(store.location_calls("beta"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let mut store = MockBucketStore::new();
    for i in 0..12 {
        store = store.with_bucket(&format!("bucket-{i:02}"), Some("us-west-2"));
    }
    let store = Arc::new(store.with_uniform_delay(Duration::from_secs(1)));
    let (lister, _) = lister_for(store.clone(), ListerConfig::new().max_concurrency(3));
    let start = Instant::now();

    let records = lister.list_buckets().await.unwrap();

    assert_eq!(records.len(), 12);
    assert_eq!(store.peak_in_flight(), 3);
    // four waves of three one-second lookups
    assert_eq!(start.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_lookups_run_concurrently() {
    let mut store = MockBucketStore::new();
    for i in 0..8 {
        store = store.with_bucket(&format!("bucket-{i}"), Some("eu-west-1"));
    }
    let store = Arc::new(store.with_uniform_delay(Duration::from_secs(2)));
    let (lister, _) = lister_for(store.clone(), ListerConfig::default());
    let start = Instant::now();

    let records = lister.list_buckets().await.unwrap();

    let names: HashSet<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names.len(), 8);
    assert_eq!(store.peak_in_flight(), 8);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_reports_sentinel_and_late_result_is_cached() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("quick", Some("eu-west-1"))
            .with_bucket("stuck", Some("us-west-1"))
            .with_location_delay("stuck", Duration::from_secs(60)),
    );
    let (lister, cache) = lister_for(
        store,
        ListerConfig::new().deadline(Duration::from_secs(30)),
    );
    let start = Instant::now();

    let records = lister.list_buckets().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(30));
    assert_eq!(records[0].region, "eu-west-1");
    assert_eq!(records[1].name, "stuck");
    assert_eq!(records[1].region, SENTINEL_REGION);
    assert!(cache.get("stuck").is_none());

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(cache.get("stuck").as_deref(), Some("us-west-1"));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_fails_strict_listing() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("stuck", Some("us-west-1"))
            .with_location_delay("stuck", Duration::from_secs(60)),
    );
    let (lister, _) = lister_for(
        store,
        ListerConfig::new()
            .deadline(Duration::from_secs(10))
            .policy(ResolutionPolicy::Strict),
    );

    let err = lister.list_buckets().await.unwrap_err();

    assert!(matches!(err, ListError::DeadlineExceeded(d) if d == Duration::from_secs(10)));
}

#[tokio::test(start_paused = true)]
async fn test_slow_enumeration_hits_deadline() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("alpha", Some("eu-west-2"))
            .with_list_delay(Duration::from_secs(45)),
    );
    let (lister, _) = lister_for(store.clone(), ListerConfig::default());

    let err = lister.list_buckets().await.unwrap_err();

    assert!(matches!(err, ListError::DeadlineExceeded(_)));
    assert_eq!(store.total_location_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_unbounded_deadline_still_lists() {
    let store = Arc::new(
        MockBucketStore::new()
            .with_bucket("alpha", Some("eu-west-2"))
            .with_bucket("slow", Some("us-west-1"))
            .with_location_delay("slow", Duration::from_secs(90)),
    );
    let (lister, cache) = lister_for(
        store,
        ListerConfig::new().deadline(Duration::from_secs(u64::MAX)),
    );

    let records = tokio_test::assert_ok!(lister.list_buckets().await);

    let regions: Vec<&str> = records.iter().map(|r| r.region.as_str()).collect();
    assert_eq!(regions, ["eu-west-2", "us-west-1"]);
    assert_eq!(cache.len(), 2);
}
