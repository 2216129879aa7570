//! S3 bucket listing.
//!
//! [`BucketLister`] fetches every bucket from a [`BucketStore`] and resolves
//! each bucket's region concurrently through a [`RegionResolver`], which
//! consults a shared [`RegionCache`] before calling the service.

mod cache;
mod lister;
mod region;
mod store;

pub use cache::{InMemoryRegionCache, RegionCache};
pub use lister::{
    BucketLister, BucketRecord, DEFAULT_LIST_DEADLINE, DEFAULT_MAX_CONCURRENCY, ListError,
    ListerConfig, ResolutionPolicy, SENTINEL_REGION,
};
pub use region::{
    DEFAULT_REGION, DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BASE, RegionResolver, ResolveError,
    normalize_location,
};
#[cfg(feature = "s3")]
pub use store::S3BucketStore;
pub use store::{BucketStore, BucketSummary, StoreError, is_retryable_code};
