//! Bucket region resolution.
//!
//! A cache lookup first; on a miss the bucket location is fetched with
//! retries and linear backoff, normalized, and cached. Failed resolutions
//! are never cached.

use std::sync::Arc;
use std::time::Duration;

use cirrus_core::resilience::{BackoffStrategy, Retry, RetryConfig};
use thiserror::Error;
use tracing::{debug, warn};

use super::cache::RegionCache;
use super::store::{BucketStore, StoreError};

/// Region S3 reports as an absent or empty location constraint.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Location lookups made per bucket before giving up.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Wait after the first failed lookup; each later wait grows by the same step.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(1);

/// Map a raw location constraint to a region name.
///
/// `None`, empty and whitespace-only constraints mean `us-east-1`. The legacy
/// `EU` constraint means `eu-west-1`. Anything else is already a region.
pub fn normalize_location(constraint: Option<&str>) -> String {
    match constraint.map(str::trim) {
        None | Some("") => DEFAULT_REGION.to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to get region for bucket {bucket} after {attempts} attempts: {source}")]
    Exhausted {
        bucket: String,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("failed to get region for bucket {bucket}: {source}")]
    Rejected {
        bucket: String,
        #[source]
        source: StoreError,
    },
}

impl ResolveError {
    pub fn bucket(&self) -> &str {
        match self {
            ResolveError::Exhausted { bucket, .. } | ResolveError::Rejected { bucket, .. } => bucket,
        }
    }

    /// The last remote failure.
    pub fn store_error(&self) -> &StoreError {
        match self {
            ResolveError::Exhausted { source, .. } | ResolveError::Rejected { source, .. } => source,
        }
    }
}

/// Resolves bucket regions through a shared [`RegionCache`].
///
/// Cheap to clone; clones share the store and the cache.
#[derive(Clone)]
pub struct RegionResolver {
    store: Arc<dyn BucketStore>,
    cache: Arc<dyn RegionCache>,
    retry: Retry,
}

impl RegionResolver {
    /// Resolver with the default retry policy: three attempts, waiting 1s
    /// then 2s between them.
    pub fn new(store: Arc<dyn BucketStore>, cache: Arc<dyn RegionCache>) -> Self {
        Self {
            store,
            cache,
            retry: Retry::new(Self::default_retry()),
        }
    }

    pub fn default_retry() -> RetryConfig {
        RetryConfig::new(DEFAULT_RETRY_ATTEMPTS)
            .backoff(BackoffStrategy::linear(DEFAULT_RETRY_BASE, DEFAULT_RETRY_BASE))
    }

    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = Retry::new(config);
        self
    }

    pub fn cache(&self) -> &Arc<dyn RegionCache> {
        &self.cache
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.retry.config()
    }

    /// Region of `bucket`, served from the cache when present.
    pub async fn resolve(&self, bucket: &str) -> Result<String, ResolveError> {
        if let Some(region) = self.cache.get(bucket) {
            debug!(bucket, region = %region, "region cache hit");
            return Ok(region);
        }

        debug!(bucket, "region cache miss, fetching bucket location");
        let constraint = self
            .retry
            .call_if(
                || self.store.get_bucket_location(bucket),
                |err: &StoreError| err.retryable,
            )
            .await
            .map_err(|err| {
                warn!(
                    bucket,
                    attempts = err.attempts,
                    error = %err.last_error,
                    "could not resolve bucket region"
                );
                if err.aborted {
                    ResolveError::Rejected {
                        bucket: bucket.to_string(),
                        source: err.last_error,
                    }
                } else {
                    ResolveError::Exhausted {
                        bucket: bucket.to_string(),
                        attempts: err.attempts,
                        source: err.last_error,
                    }
                }
            })?;

        let region = normalize_location(constraint.as_deref());
        self.cache.insert(bucket.to_string(), region.clone());
        debug!(bucket, region = %region, "bucket region cached");
        Ok(region)
    }
}

impl std::fmt::Debug for RegionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionResolver")
            .field("cached", &self.cache.len())
            .field("retry", self.retry.config())
            .finish()
    }
}
