//! # Cirrus
//!
//! REST backend for an AWS dashboard. The interesting part is the S3 bucket
//! listing: every bucket's region is resolved concurrently, with retries,
//! through a shared region cache.
//!
//! - `cirrus-core` (re-exported at the root): HTTP primitives, router, server
//!   loop, CORS, logging, resilience
//! - [`aws`]: AWS configuration, the bucket store, region resolver and lister
//! - [`server`]: environment configuration and the `/s3/buckets` endpoint

pub use cirrus_core::*;

pub use cirrus_aws as aws;
pub use cirrus_server as server;

/// The types most callers need.
pub mod prelude {
    pub use cirrus_aws::s3::{
        BucketLister, BucketRecord, BucketStore, InMemoryRegionCache, ListError, ListerConfig,
        RegionCache, RegionResolver, ResolutionPolicy, ResolveError, StoreError,
    };
    pub use cirrus_aws::{AwsConfig, AwsServices};
    pub use cirrus_core::resilience::{BackoffStrategy, Retry, RetryConfig};
    pub use cirrus_core::{Application, CorsConfig, HttpRequest, HttpResponse, Router};
    pub use cirrus_server::{ServerConfig, build_app, build_lister};
}
