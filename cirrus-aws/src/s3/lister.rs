//! Bucket listing with concurrent region resolution.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cirrus_core::resilience::{Bulkhead, with_timeout};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::region::{RegionResolver, ResolveError};
use super::store::{BucketStore, StoreError};

/// Region reported for a bucket whose region could not be determined.
pub const SENTINEL_REGION: &str = "unknown";

/// Default bound on a whole listing, remote calls and backoff included.
pub const DEFAULT_LIST_DEADLINE: Duration = Duration::from_secs(30);

/// Default number of region lookups in flight at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// What a listing does when a bucket's region cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// Report the bucket with region [`SENTINEL_REGION`] and keep going.
    #[default]
    Sentinel,
    /// Fail the whole listing.
    Strict,
}

impl ResolutionPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentinel" => Some(ResolutionPolicy::Sentinel),
            "strict" => Some(ResolutionPolicy::Strict),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPolicy::Sentinel => "sentinel",
            ResolutionPolicy::Strict => "strict",
        }
    }
}

/// A bucket with its resolved region.
///
/// Serializes as `{"name", "creation_date", "region"}` with an RFC 3339
/// creation date, or `null` when the service did not report one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRecord {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
    pub region: String,
}

#[derive(Debug, Clone)]
pub struct ListerConfig {
    pub deadline: Duration,
    pub max_concurrency: usize,
    pub policy: ResolutionPolicy,
}

impl Default for ListerConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_LIST_DEADLINE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            policy: ResolutionPolicy::default(),
        }
    }
}

impl ListerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Region lookups allowed in flight at once (minimum 1).
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    pub fn policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

#[derive(Debug, Error)]
pub enum ListError {
    #[error("failed to list buckets: {0}")]
    List(#[source] StoreError),

    #[error(transparent)]
    Resolution(#[from] ResolveError),

    #[error("bucket listing did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("region lookup task failed: {0}")]
    Task(String),
}

/// Lists buckets and resolves every bucket's region concurrently.
pub struct BucketLister {
    store: Arc<dyn BucketStore>,
    resolver: RegionResolver,
    config: ListerConfig,
}

impl BucketLister {
    /// Lister over `store`, resolving regions through `resolver`.
    ///
    /// The resolver usually wraps the same store, and its cache should
    /// outlive individual listings.
    pub fn new(store: Arc<dyn BucketStore>, resolver: RegionResolver) -> Self {
        Self {
            store,
            resolver,
            config: ListerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ListerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn resolver(&self) -> &RegionResolver {
        &self.resolver
    }

    pub fn config(&self) -> &ListerConfig {
        &self.config
    }

    /// List every bucket with its region, in the order the store returned them.
    ///
    /// Lookups still running when the deadline passes are detached rather
    /// than aborted, so a late success still lands in the region cache.
    pub async fn list_buckets(&self) -> Result<Vec<BucketRecord>, ListError> {
        // `None` when the deadline is too far out to represent
        let deadline = Instant::now().checked_add(self.config.deadline);
        let policy = self.config.policy;

        let buckets = match with_timeout(self.config.deadline, self.store.list_buckets()).await {
            Ok(Ok(buckets)) => buckets,
            Ok(Err(err)) => {
                error!(error = %err, "failed to list buckets");
                return Err(ListError::List(err));
            }
            Err(elapsed) => {
                error!(deadline = ?elapsed, "bucket listing timed out");
                return Err(ListError::DeadlineExceeded(elapsed));
            }
        };

        info!(
            count = buckets.len(),
            max_concurrency = self.config.max_concurrency,
            "listed buckets, resolving regions"
        );

        let bulkhead = Bulkhead::new("bucket-region", self.config.max_concurrency);
        let mut tasks = JoinSet::new();
        for (index, bucket) in buckets.iter().enumerate() {
            let resolver = self.resolver.clone();
            let bulkhead = bulkhead.clone();
            let name = bucket.name.clone();
            tasks.spawn(async move {
                let _permit = bulkhead.acquire().await;
                (index, resolver.resolve(&name).await)
            });
        }

        let mut regions: Vec<Option<String>> = vec![None; buckets.len()];
        let mut failed = 0usize;

        loop {
            let next = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, tasks.join_next()).await,
                None => Ok(tasks.join_next().await),
            };
            let joined = match next {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        outstanding = tasks.len(),
                        deadline = ?self.config.deadline,
                        "deadline reached before every bucket region resolved"
                    );
                    tasks.detach_all();
                    if policy == ResolutionPolicy::Strict {
                        return Err(ListError::DeadlineExceeded(self.config.deadline));
                    }
                    break;
                }
            };

            match joined {
                Ok((index, Ok(region))) => regions[index] = Some(region),
                Ok((_, Err(err))) => {
                    failed += 1;
                    if policy == ResolutionPolicy::Strict {
                        tasks.detach_all();
                        return Err(ListError::Resolution(err));
                    }
                    warn!(bucket = %err.bucket(), error = %err, "reporting bucket region as unknown");
                }
                Err(join_err) => {
                    failed += 1;
                    error!(error = %join_err, "region lookup task failed");
                    if policy == ResolutionPolicy::Strict {
                        tasks.detach_all();
                        return Err(ListError::Task(join_err.to_string()));
                    }
                }
            }
        }

        let records: Vec<BucketRecord> = buckets
            .into_iter()
            .zip(regions)
            .map(|(bucket, region)| BucketRecord {
                name: bucket.name,
                creation_date: bucket.creation_date,
                region: region.unwrap_or_else(|| SENTINEL_REGION.to_string()),
            })
            .collect();

        info!(count = records.len(), failed, "bucket listing complete");
        Ok(records)
    }
}
