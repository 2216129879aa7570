// HTTP handlers for the S3 endpoints

use std::sync::Arc;

use cirrus_aws::s3::{BucketLister, ListError};
use cirrus_core::{Error, HttpResponse, Json};
use tracing::info;

/// `GET /s3/buckets`: every bucket with its region, as a JSON array.
pub async fn list_buckets(lister: Arc<BucketLister>) -> Result<HttpResponse, Error> {
    let records = lister.list_buckets().await.map_err(list_error_response)?;
    info!(count = records.len(), "served bucket listing");
    Json(records).into_response()
}

/// Map a listing failure onto the HTTP error it is reported as.
pub fn list_error_response(err: ListError) -> Error {
    match err {
        ListError::DeadlineExceeded(_) => Error::GatewayTimeout(err.to_string()),
        other => Error::Internal(other.to_string()),
    }
}
