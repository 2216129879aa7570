//! # Resilience Patterns
//!
//! Building blocks for talking to remote services that fail, stall, or need
//! to be called many times at once.
//!
//! - **Retry**: repeat a fallible operation with a backoff strategy and an
//!   optional retryable-error predicate
//! - **Timeout**: bound an operation (or a whole batch of them) by a deadline
//! - **Bulkhead**: bound how many operations run concurrently
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cirrus_core::resilience::{Bulkhead, Retry, RetryConfig, with_timeout};
//! use std::time::Duration;
//!
//! let retry = Retry::new(RetryConfig::new(3));
//! let bulkhead = Bulkhead::new("lookups", 8);
//!
//! let result = with_timeout(Duration::from_secs(30), async {
//!     let _permit = bulkhead.acquire().await;
//!     retry.call(|| remote_lookup()).await
//! })
//! .await;
//! ```

mod bulkhead;
mod retry;
mod timeout;

pub use bulkhead::*;
pub use retry::*;
pub use timeout::*;
