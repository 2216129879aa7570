//! AWS configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Credentials source for AWS authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialsSource {
    /// Named profile from `~/.aws/credentials`.
    Profile(String),
    /// Explicit static credentials.
    Explicit {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    /// Default AWS SDK provider chain (environment, profile, IMDS, web identity).
    #[default]
    Auto,
}

/// AWS service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsConfig {
    /// AWS region; the SDK's own resolution applies when unset.
    pub region: Option<String>,
    /// Credentials source.
    #[serde(default)]
    pub credentials: CredentialsSource,
    /// Custom endpoint URL (LocalStack, MinIO).
    pub endpoint_url: Option<String>,
    /// Enabled services.
    #[serde(default)]
    pub enabled_services: HashSet<String>,
}

impl AwsConfig {
    /// Create a builder.
    pub fn builder() -> AwsConfigBuilder {
        AwsConfigBuilder::new()
    }

    /// Start a builder from the standard AWS environment variables.
    pub fn from_env() -> AwsConfigBuilder {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`AwsConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> AwsConfigBuilder
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = AwsConfigBuilder::new();

        if let Some(region) = lookup("AWS_REGION").or_else(|| lookup("AWS_DEFAULT_REGION")) {
            builder = builder.region(region);
        }

        if let Some(endpoint) = lookup("AWS_ENDPOINT_URL") {
            builder = builder.endpoint_url(endpoint);
        }

        builder
    }

    /// Check if a service is enabled.
    pub fn is_enabled(&self, service: &str) -> bool {
        self.enabled_services.contains(service)
    }
}

/// Builder for AWS configuration.
#[derive(Debug, Default)]
pub struct AwsConfigBuilder {
    config: AwsConfig,
}

impl AwsConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AWS region.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Set the credentials source.
    pub fn credentials(mut self, credentials: CredentialsSource) -> Self {
        self.config.credentials = credentials;
        self
    }

    /// Use explicit credentials.
    pub fn explicit_credentials(
        self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials(CredentialsSource::Explicit {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: None,
        })
    }

    /// Use a named profile.
    pub fn profile(self, profile: impl Into<String>) -> Self {
        self.credentials(CredentialsSource::Profile(profile.into()))
    }

    /// Set a custom endpoint URL.
    pub fn endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint_url = Some(url.into());
        self
    }

    /// Enable a service by name.
    pub fn enable(mut self, service: impl Into<String>) -> Self {
        self.config.enabled_services.insert(service.into());
        self
    }

    /// Enable S3.
    pub fn enable_s3(self) -> Self {
        self.enable("s3")
    }

    /// Build the configuration.
    pub fn build(self) -> AwsConfig {
        self.config
    }
}
