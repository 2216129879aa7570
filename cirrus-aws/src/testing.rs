//! In-memory [`BucketStore`] for tests.
//!
//! Location replies are scripted per bucket and consumed in order; the last
//! reply repeats once the script runs out. Calls are counted so tests can
//! assert how often the remote service would have been hit.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::s3::{BucketStore, BucketSummary, StoreError};

/// Creation date given to buckets added with [`MockBucketStore::with_bucket`].
pub fn sample_creation_date() -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(1_704_067_200, 0)
}

type LocationReply = Result<Option<String>, StoreError>;

#[derive(Default)]
pub struct MockBucketStore {
    buckets: Mutex<Vec<BucketSummary>>,
    list_failure: Mutex<Option<StoreError>>,
    list_delay: Mutex<Option<Duration>>,
    replies: Mutex<HashMap<String, VecDeque<LocationReply>>>,
    delays: Mutex<HashMap<String, Duration>>,
    list_calls: AtomicUsize,
    location_calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MockBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bucket whose location lookups always return `location`.
    pub fn with_bucket(self, name: &str, location: Option<&str>) -> Self {
        self.with_location_replies(name, vec![Ok(location.map(str::to_string))])
    }

    /// Add a bucket with a script of location replies.
    pub fn with_location_replies(self, name: &str, replies: Vec<LocationReply>) -> Self {
        self.buckets
            .lock()
            .push(BucketSummary::new(name, sample_creation_date()));
        self.replies
            .lock()
            .insert(name.to_string(), replies.into_iter().collect());
        self
    }

    /// Make every location lookup for `name` take `delay`.
    pub fn with_location_delay(self, name: &str, delay: Duration) -> Self {
        self.delays.lock().insert(name.to_string(), delay);
        self
    }

    /// Make every bucket's location lookup take `delay`.
    pub fn with_uniform_delay(self, delay: Duration) -> Self {
        let names: Vec<String> = self.buckets.lock().iter().map(|b| b.name.clone()).collect();
        {
            let mut delays = self.delays.lock();
            for name in names {
                delays.insert(name, delay);
            }
        }
        self
    }

    pub fn with_list_delay(self, delay: Duration) -> Self {
        *self.list_delay.lock() = Some(delay);
        self
    }

    pub fn failing_list(self, error: StoreError) -> Self {
        *self.list_failure.lock() = Some(error);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn location_calls(&self, bucket: &str) -> usize {
        self.location_calls.lock().get(bucket).copied().unwrap_or(0)
    }

    pub fn total_location_calls(&self) -> usize {
        self.location_calls.lock().values().sum()
    }

    /// Most location lookups observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, bucket: &str) -> LocationReply {
        let mut replies = self.replies.lock();
        match replies.get_mut(bucket) {
            Some(script) if script.len() > 1 => script
                .pop_front()
                .unwrap_or_else(|| Err(StoreError::transient("GetBucketLocation", "empty script"))),
            Some(script) => script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(StoreError::transient("GetBucketLocation", "empty script"))),
            None => Err(StoreError::with_code(
                "GetBucketLocation",
                "NoSuchBucket",
                format!("bucket {bucket} does not exist"),
            )),
        }
    }
}

#[async_trait]
impl BucketStore for MockBucketStore {
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.list_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let failure = self.list_failure.lock().clone();
        match failure {
            Some(err) => Err(err),
            None => Ok(self.buckets.lock().clone()),
        }
    }

    async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>, StoreError> {
        *self
            .location_calls
            .lock()
            .entry(bucket.to_string())
            .or_insert(0) += 1;

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self.delays.lock().get(bucket).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.next_reply(bucket)
    }
}
