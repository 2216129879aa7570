//! AWS error types.

use thiserror::Error;

/// Result type for AWS setup operations.
pub type Result<T> = std::result::Result<T, AwsError>;

/// Errors raised while configuring or loading AWS clients.
#[derive(Debug, Error)]
pub enum AwsError {
    /// Service not compiled in.
    #[error("Service '{0}' is not enabled. Enable the feature flag in Cargo.toml")]
    ServiceNotEnabled(&'static str),

    /// Service not configured.
    #[error("Service '{0}' is not configured. Call enable_{0}() on AwsConfig")]
    ServiceNotConfigured(&'static str),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AwsError {
    /// Create a service not enabled error.
    pub fn not_enabled(service: &'static str) -> Self {
        Self::ServiceNotEnabled(service)
    }

    /// Create a service not configured error.
    pub fn not_configured(service: &'static str) -> Self {
        Self::ServiceNotConfigured(service)
    }
}
