//! The remote bucket service seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes S3 returns for conditions another attempt will not fix.
const PERMANENT_ERROR_CODES: &[&str] = &["NoSuchBucket", "AccessDenied", "AllAccessDisabled"];

/// A bucket as returned by the bucket listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSummary {
    pub name: String,
    pub creation_date: Option<DateTime<Utc>>,
}

impl BucketSummary {
    pub fn new(name: impl Into<String>, creation_date: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            creation_date,
        }
    }
}

/// Failure of a single remote call.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed: {message}")]
pub struct StoreError {
    /// Remote operation name, e.g. `ListBuckets`.
    pub operation: &'static str,
    /// Service error code, when the service sent one.
    pub code: Option<String>,
    pub message: String,
    /// Whether repeating the call may succeed.
    pub retryable: bool,
}

impl StoreError {
    /// A failure that may clear up on another attempt.
    pub fn transient(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure carrying a service error code; retryability follows the code.
    pub fn with_code(
        operation: &'static str,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let code = code.into();
        Self {
            operation,
            retryable: is_retryable_code(Some(&code)),
            code: Some(code),
            message: message.into(),
        }
    }
}

/// Whether an S3 error code is worth another attempt.
pub fn is_retryable_code(code: Option<&str>) -> bool {
    !matches!(code, Some(code) if PERMANENT_ERROR_CODES.contains(&code))
}

/// Remote bucket operations used by the lister and resolver.
#[async_trait]
pub trait BucketStore: Send + Sync {
    /// Every bucket visible to the caller's credentials, in service order.
    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StoreError>;

    /// The raw location constraint for `bucket`; `None` or empty means
    /// the service default region.
    async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>, StoreError>;
}

#[cfg(feature = "s3")]
pub use self::sdk::S3BucketStore;

#[cfg(feature = "s3")]
mod sdk {
    use super::*;
    use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
    use tracing::debug;

    /// [`BucketStore`] backed by the AWS SDK S3 client.
    #[derive(Debug, Clone)]
    pub struct S3BucketStore {
        client: aws_sdk_s3::Client,
    }

    impl S3BucketStore {
        pub fn new(client: aws_sdk_s3::Client) -> Self {
            Self { client }
        }

        pub fn client(&self) -> &aws_sdk_s3::Client {
            &self.client
        }
    }

    fn store_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> StoreError
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let code = err.code().map(str::to_string);
        let message = err
            .message()
            .map(str::to_string)
            .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
        StoreError {
            operation,
            retryable: is_retryable_code(code.as_deref()),
            code,
            message,
        }
    }

    fn to_chrono(date: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(date.secs(), date.subsec_nanos())
    }

    #[async_trait]
    impl BucketStore for S3BucketStore {
        async fn list_buckets(&self) -> Result<Vec<BucketSummary>, StoreError> {
            let mut buckets = Vec::new();
            let mut continuation: Option<String> = None;

            loop {
                let output = self
                    .client
                    .list_buckets()
                    .set_continuation_token(continuation.take())
                    .send()
                    .await
                    .map_err(|e| store_error("ListBuckets", e))?;

                for bucket in output.buckets() {
                    let Some(name) = bucket.name() else {
                        debug!("skipping bucket without a name");
                        continue;
                    };
                    buckets.push(BucketSummary::new(
                        name,
                        bucket.creation_date().and_then(to_chrono),
                    ));
                }

                match output.continuation_token() {
                    Some(token) if !token.is_empty() => continuation = Some(token.to_string()),
                    _ => break,
                }
            }

            Ok(buckets)
        }

        async fn get_bucket_location(&self, bucket: &str) -> Result<Option<String>, StoreError> {
            let output = self
                .client
                .get_bucket_location()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| store_error("GetBucketLocation", e))?;

            Ok(output
                .location_constraint()
                .map(|constraint| constraint.as_str().to_string()))
        }
    }
}
