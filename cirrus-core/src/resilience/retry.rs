//! Retry with configurable backoff.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cirrus_core::resilience::{BackoffStrategy, Retry, RetryConfig};
//! use std::time::Duration;
//!
//! let retry = Retry::new(
//!     RetryConfig::new(3).backoff(BackoffStrategy::linear(
//!         Duration::from_secs(1),
//!         Duration::from_secs(1),
//!     )),
//! );
//!
//! let region = retry
//!     .call_if(|| store.get_bucket_location("logs"), |e| e.retryable)
//!     .await?;
//! ```

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff strategy for retries.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffStrategy {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Constant(Duration),
    /// Delay grows by `increment` with each attempt.
    Linear {
        /// Delay after the first failed attempt.
        initial: Duration,
        /// Added per subsequent attempt.
        increment: Duration,
        /// Upper bound.
        max: Duration,
    },
    /// Delay is multiplied by `multiplier` with each attempt.
    Exponential {
        /// Delay after the first failed attempt.
        initial: Duration,
        /// Growth factor, typically 2.0.
        multiplier: f64,
        /// Upper bound.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Constant backoff.
    pub fn constant(delay: Duration) -> Self {
        Self::Constant(delay)
    }

    /// Linear backoff capped at one minute.
    pub fn linear(initial: Duration, increment: Duration) -> Self {
        Self::Linear {
            initial,
            increment,
            max: Duration::from_secs(60),
        }
    }

    /// Exponential backoff (doubling) capped at one minute.
    pub fn exponential(initial: Duration) -> Self {
        Self::Exponential {
            initial,
            multiplier: 2.0,
            max: Duration::from_secs(60),
        }
    }

    /// Replace the upper bound.
    pub fn with_max(self, max: Duration) -> Self {
        match self {
            Self::Linear {
                initial, increment, ..
            } => Self::Linear {
                initial,
                increment,
                max,
            },
            Self::Exponential {
                initial,
                multiplier,
                ..
            } => Self::Exponential {
                initial,
                multiplier,
                max,
            },
            other => other,
        }
    }

    /// Delay to wait after the given failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Constant(delay) => *delay,
            Self::Linear {
                initial,
                increment,
                max,
            } => initial
                .saturating_add(increment.saturating_mul(attempt))
                .min(*max),
            Self::Exponential {
                initial,
                multiplier,
                max,
            } => {
                let factor = multiplier.powi(attempt as i32);
                let millis = (initial.as_millis() as f64 * factor) as u64;
                Duration::from_millis(millis).min(*max)
            }
        }
    }
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::exponential(Duration::from_millis(100))
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: BackoffStrategy::default(),
        }
    }
}

impl RetryConfig {
    /// Create a configuration with the given attempt budget.
    ///
    /// A budget of zero is treated as one attempt.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Set the backoff strategy.
    pub fn backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Returned when an operation did not succeed within its retry budget.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Error from the final attempt.
    pub last_error: E,
    /// Attempts actually made.
    pub attempts: u32,
    /// Whether the predicate stopped retrying before the budget ran out.
    pub aborted: bool,
}

impl<E> RetryError<E> {
    /// Unwrap the final error.
    pub fn into_inner(self) -> E {
        self.last_error
    }
}

impl<E: std::fmt::Display> std::fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed after {} attempt(s): {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for RetryError<E> {}

/// Retry executor.
#[derive(Debug, Clone, Default)]
pub struct Retry {
    config: RetryConfig,
}

impl Retry {
    /// Create a new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `f` until it succeeds or the attempt budget is spent.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.call_if(f, |_| true).await
    }

    /// Like [`Retry::call`], but gives up as soon as `should_retry` rejects an error.
    pub async fn call_if<F, Fut, T, E, P>(
        &self,
        mut f: F,
        should_retry: P,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let error = match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "retry succeeded");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            attempt += 1;

            if !should_retry(&error) {
                debug!(attempt, error = %error, "error is not retryable, giving up");
                return Err(RetryError {
                    last_error: error,
                    attempts: attempt,
                    aborted: true,
                });
            }

            if attempt >= max_attempts {
                warn!(
                    attempt,
                    max_attempts,
                    error = %error,
                    "final retry attempt failed"
                );
                return Err(RetryError {
                    last_error: error,
                    attempts: attempt,
                    aborted: false,
                });
            }

            let delay = self.config.backoff.delay_for_attempt(attempt - 1);
            debug!(
                attempt,
                delay = ?delay,
                error = %error,
                "attempt failed, waiting before retry"
            );
            if delay > Duration::ZERO {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
