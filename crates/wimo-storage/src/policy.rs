//! Timeout and retry policy applied to backend calls.

use std::future::Future;

use tokio::time::Duration;

use crate::error::StorageError;

/// How the persistence facade guards each backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallPolicy {
    /// Upper bound for a single backend call. `None` disables the timeout.
    pub timeout: Option<Duration>,

    /// Total attempts for retryable reads. Values below 1 behave as 1.
    pub max_attempts: u32,

    /// Initial retry backoff. Doubles on each retry.
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(5)),
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

impl CallPolicy {
    /// A policy with a single attempt and no timeout.
    #[must_use]
    pub fn passthrough() -> Self {
        Self {
            timeout: None,
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.backoff = backoff;
        self
    }

    /// Runs one backend call under the configured timeout.
    pub async fn call<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| StorageError::timeout(operation, limit))?,
            None => fut.await,
        }
    }

    /// Runs a backend call, repeating it on retryable failures.
    ///
    /// Only idempotent operations may go through here.
    pub async fn call_with_retry<T, F, Fut>(
        &self,
        operation: &'static str,
        mut make_call: F,
    ) -> Result<T, StorageError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempts = 0;
        let mut backoff = self.backoff;

        loop {
            match self.call(operation, make_call()).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempts += 1;
                    if !e.is_retryable() || attempts >= max_attempts {
                        return Err(e);
                    }

                    tracing::warn!(
                        operation,
                        attempt = attempts,
                        max_attempts,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Storage call failed, retrying"
                    );

                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }
}
