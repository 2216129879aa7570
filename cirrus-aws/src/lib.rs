//! # Cirrus AWS
//!
//! AWS integration for Cirrus: client configuration and the S3 bucket lister
//! with cached, retried region resolution.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cirrus_aws::{AwsConfig, AwsServices};
//! use cirrus_aws::s3::{BucketLister, InMemoryRegionCache, RegionResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AwsConfig::from_env().enable_s3().build();
//!     let services = AwsServices::new(config).await?;
//!
//!     let store = Arc::new(services.bucket_store()?);
//!     let resolver = RegionResolver::new(store.clone(), Arc::new(InMemoryRegionCache::new()));
//!     let lister = BucketLister::new(store, resolver);
//!
//!     for bucket in lister.list_buckets().await? {
//!         println!("{} {}", bucket.name, bucket.region);
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod services;

pub mod s3;

pub mod testing;

pub use config::{AwsConfig, AwsConfigBuilder, CredentialsSource};
pub use error::{AwsError, Result};
pub use services::AwsServices;

pub use aws_config;
pub use aws_credential_types;
pub use aws_types;

#[cfg(feature = "s3")]
pub use aws_sdk_s3;
