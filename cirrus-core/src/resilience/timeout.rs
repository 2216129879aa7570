//! Deadlines for async operations.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Timeout error.
#[derive(Debug)]
pub enum TimeoutError<E> {
    /// The deadline passed before the operation finished.
    Elapsed(Duration),
    /// The operation finished with an error.
    Execution(E),
}

impl<E: std::fmt::Display> std::fmt::Display for TimeoutError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Elapsed(d) => write!(f, "operation timed out after {:?}", d),
            Self::Execution(e) => write!(f, "operation failed: {}", e),
        }
    }
}

impl<E: std::fmt::Debug + std::fmt::Display> std::error::Error for TimeoutError<E> {}

/// Named timeout executor.
#[derive(Debug, Clone)]
pub struct Timeout {
    name: String,
    duration: Duration,
}

impl Timeout {
    /// Create a timeout with a name used in log output.
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }

    /// Configured duration.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run a fallible future under the deadline.
    pub async fn call<Fut, T, E>(&self, fut: Fut) -> Result<T, TimeoutError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(self.duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TimeoutError::Execution(e)),
            Err(_) => {
                warn!(name = %self.name, duration = ?self.duration, "operation timed out");
                Err(TimeoutError::Elapsed(self.duration))
            }
        }
    }
}

/// Run a future under a deadline, returning the deadline on expiry.
pub async fn with_timeout<Fut, T>(duration: Duration, fut: Fut) -> Result<T, Duration>
where
    Fut: Future<Output = T>,
{
    tokio::time::timeout(duration, fut)
        .await
        .map_err(|_| duration)
}
