//! AWS services container.

#[cfg(feature = "s3")]
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

use crate::{AwsConfig, AwsError, CredentialsSource, Result};

/// Container for AWS service clients.
///
/// Clients are built lazily from one shared SDK configuration, and only for
/// services enabled on the [`AwsConfig`].
pub struct AwsServices {
    config: AwsConfig,
    sdk_config: aws_config::SdkConfig,

    #[cfg(feature = "s3")]
    s3: RwLock<Option<aws_sdk_s3::Client>>,
}

impl AwsServices {
    /// Resolve credentials and region, then build the container.
    pub async fn new(config: AwsConfig) -> Result<Arc<Self>> {
        let sdk_config = Self::build_sdk_config(&config).await?;

        info!(
            region = ?sdk_config.region(),
            services = ?config.enabled_services,
            endpoint = ?config.endpoint_url,
            "AWS services initialized"
        );

        Ok(Arc::new(Self {
            config,
            sdk_config,
            #[cfg(feature = "s3")]
            s3: RwLock::new(None),
        }))
    }

    async fn build_sdk_config(config: &AwsConfig) -> Result<aws_config::SdkConfig> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(aws_types::region::Region::new(region.clone()));
        }

        match &config.credentials {
            CredentialsSource::Profile(profile) => {
                loader = loader.profile_name(profile);
            }
            CredentialsSource::Explicit {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                if access_key_id.is_empty() || secret_access_key.is_empty() {
                    return Err(AwsError::Config(
                        "explicit credentials need both an access key id and a secret".into(),
                    ));
                }
                let creds = aws_credential_types::Credentials::new(
                    access_key_id,
                    secret_access_key,
                    session_token.clone(),
                    None,
                    "cirrus-explicit",
                );
                loader = loader.credentials_provider(creds);
            }
            CredentialsSource::Auto => {}
        }

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        Ok(loader.load().await)
    }

    /// Get the configuration.
    pub fn config(&self) -> &AwsConfig {
        &self.config
    }

    /// Get the resolved SDK configuration.
    pub fn sdk_config(&self) -> &aws_config::SdkConfig {
        &self.sdk_config
    }

    /// Region the SDK resolved, if any.
    pub fn region(&self) -> Option<&aws_types::region::Region> {
        self.sdk_config.region()
    }

    /// Get the S3 client, building it on first use.
    #[cfg(feature = "s3")]
    pub fn s3(&self) -> Result<aws_sdk_s3::Client> {
        if !self.config.is_enabled("s3") {
            return Err(AwsError::not_configured("s3"));
        }

        if let Some(client) = self.s3.read().as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.s3.write();
        let client = slot.get_or_insert_with(|| {
            let mut builder = aws_sdk_s3::config::Builder::from(&self.sdk_config);
            // Local S3 emulators do not serve virtual-hosted bucket names.
            if self.config.endpoint_url.is_some() {
                builder = builder.force_path_style(true);
            }
            info!("S3 client initialized");
            aws_sdk_s3::Client::from_conf(builder.build())
        });
        Ok(client.clone())
    }

    #[cfg(not(feature = "s3"))]
    pub fn s3(&self) -> Result<()> {
        Err(AwsError::not_enabled("s3"))
    }

    /// An S3-backed [`BucketStore`](crate::s3::BucketStore).
    #[cfg(feature = "s3")]
    pub fn bucket_store(&self) -> Result<crate::s3::S3BucketStore> {
        Ok(crate::s3::S3BucketStore::new(self.s3()?))
    }
}
