//! # Cirrus Server
//!
//! The REST backend behind the AWS dashboard. Serves `GET /s3/buckets`,
//! listing every bucket in the account with its region.
//!
//! Configuration comes from `CIRRUS_*` variables (optionally from a `.env`
//! file) and the standard AWS variables; see [`ServerConfig`].

pub mod config;
pub mod handlers;

use std::sync::Arc;

use cirrus_aws::s3::{BucketLister, BucketStore, InMemoryRegionCache, RegionResolver};
use cirrus_aws::{AwsConfig, AwsError, AwsServices};
use cirrus_core::{Application, Router};
use thiserror::Error;
use tracing::info;

pub use config::{ConfigError, ServerConfig};

/// Failures that stop the server from starting or serving.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Aws(#[from] AwsError),

    #[error(transparent)]
    Server(#[from] cirrus_core::Error),
}

/// Lister over `store` with a fresh region cache that lives as long as it does.
pub fn build_lister(store: Arc<dyn BucketStore>, config: &ServerConfig) -> BucketLister {
    let resolver = RegionResolver::new(store.clone(), Arc::new(InMemoryRegionCache::new()))
        .with_retry(config.retry_config());
    BucketLister::new(store, resolver).with_config(config.lister_config())
}

/// Routes and CORS for the dashboard API.
pub fn build_app(lister: Arc<BucketLister>, config: &ServerConfig) -> Application {
    let router = Router::new().get("/s3/buckets", move |_req| {
        let lister = lister.clone();
        async move { handlers::list_buckets(lister).await }
    });

    Application::new(router).with_cors(config.cors())
}

/// Connect to AWS and serve until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    let aws = AwsServices::new(AwsConfig::from_env().enable_s3().build()).await?;
    let store: Arc<dyn BucketStore> = Arc::new(aws.bucket_store()?);
    let lister = Arc::new(build_lister(store, &config));

    info!(
        addr = %config.socket_addr(),
        policy = config.region_policy.as_str(),
        deadline = ?config.list_deadline,
        "starting cirrus server"
    );

    build_app(lister, &config)
        .listen(config.socket_addr())
        .await?;

    info!("cirrus server stopped");
    Ok(())
}
