//! Music API Retry Logic
//!
//! Wraps a music-service call with bounded retry and server-directed backoff.
//!
//! **Algorithm:**
//! 1. Attempt operation
//! 2. If successful, return result
//! 3. If the error is transient (per [`RetryPolicy::backoff_for`]):
//!    a. If attempts remain: log WARN, sleep the backoff, retry
//!    b. Otherwise: log ERROR, return the last error
//! 4. If other error: return error immediately (no retry)
//!
//! **Backoff Strategy:**
//! - Rate limited: the server's `Retry-After` (10s when absent)
//! - Connectivity: fixed 1s
//!
//! Sleeping goes through the [`Sleeper`] trait so tests can record exact waits
//! instead of sleeping.

use crate::services::music_service::MusicApiError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Source of the delay between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry budget and wait-time rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Wait when a rate-limit response carries no `Retry-After`
    pub default_rate_limit_wait: Duration,
    /// Wait after a connectivity failure
    pub transient_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            default_rate_limit_wait: Duration::from_secs(10),
            transient_wait: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Wait before the next attempt, or `None` when the error is not retryable
    pub fn backoff_for(&self, error: &MusicApiError) -> Option<Duration> {
        match error {
            MusicApiError::RateLimited { retry_after } => {
                Some(retry_after.unwrap_or(self.default_rate_limit_wait))
            }
            MusicApiError::Connectivity(_) => Some(self.transient_wait),
            _ => None,
        }
    }
}

/// Executes music-service calls under a [`RetryPolicy`]
///
/// Holds no per-call state; each `invoke` tracks its own attempt count.
#[derive(Clone)]
pub struct RateLimitedInvoker {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RateLimitedInvoker {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    /// Invoker that sleeps on the tokio timer
    pub fn with_policy(policy: RetryPolicy) -> Self {
        Self::new(policy, Arc::new(TokioSleeper))
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    ///
    /// # Arguments
    /// * `operation_name` - Name for logging (e.g., "create playlist")
    /// * `operation` - Closure producing one attempt of the call
    pub async fn invoke<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T, MusicApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, MusicApiError>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            if attempt > 1 {
                tracing::debug!(operation = operation_name, attempt, "Retrying music API call");
            }

            let err = match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::debug!(
                            operation = operation_name,
                            attempt,
                            "Music API call succeeded after retry"
                        );
                    }
                    return Ok(result);
                }
                Err(err) => err,
            };

            let Some(wait) = self.policy.backoff_for(&err) else {
                return Err(err);
            };

            if attempt >= self.policy.max_attempts {
                tracing::error!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    "Music API call failed: retry attempts exhausted"
                );
                return Err(err);
            }

            tracing::warn!(
                operation = operation_name,
                attempt,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "Transient music API error, will retry after backoff"
            );

            self.sleeper.sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSleeper {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    fn invoker(max_attempts: u32) -> (RateLimitedInvoker, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let invoker = RateLimitedInvoker::new(RetryPolicy::with_max_attempts(max_attempts), sleeper.clone());
        (invoker, sleeper)
    }

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let (invoker, sleeper) = invoker(3);

        let result = invoker.invoke("test_op", || async { Ok::<i32, MusicApiError>(42) }).await;

        assert_eq!(result.unwrap(), 42);
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_sleeps_server_suggested_wait() {
        let (invoker, sleeper) = invoker(3);
        let mut attempts = 0;

        let result = invoker
            .invoke("test_op", || {
                attempts += 1;
                let attempt = attempts;
                async move {
                    if attempt == 1 {
                        Err(MusicApiError::RateLimited {
                            retry_after: Some(Duration::from_secs(7)),
                        })
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts, 2);
        assert_eq!(*sleeper.waits.lock().unwrap(), vec![Duration::from_secs(7)]);
    }

    #[tokio::test]
    async fn test_rate_limit_without_hint_waits_default() {
        let (invoker, sleeper) = invoker(3);
        let mut attempts = 0;

        let _ = invoker
            .invoke("test_op", || {
                attempts += 1;
                let attempt = attempts;
                async move {
                    if attempt == 1 {
                        Err(MusicApiError::RateLimited { retry_after: None })
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(*sleeper.waits.lock().unwrap(), vec![Duration::from_secs(10)]);
    }

    #[tokio::test]
    async fn test_connectivity_exhaustion_reraises_last_error() {
        let (invoker, sleeper) = invoker(4);
        let mut attempts = 0;

        let result = invoker
            .invoke("test_op", || {
                attempts += 1;
                let attempt = attempts;
                async move { Err::<(), _>(MusicApiError::Connectivity(format!("reset {}", attempt))) }
            })
            .await;

        assert_eq!(result, Err(MusicApiError::Connectivity("reset 4".to_string())));
        assert_eq!(attempts, 4);
        assert_eq!(*sleeper.waits.lock().unwrap(), vec![Duration::from_secs(1); 3]);
    }

    #[tokio::test]
    async fn test_non_transient_error_fails_immediately() {
        let (invoker, sleeper) = invoker(5);
        let mut attempts = 0;

        let result = invoker
            .invoke("test_op", || {
                attempts += 1;
                async move { Err::<(), _>(MusicApiError::Api(400, "invalid seed".into())) }
            })
            .await;

        assert!(matches!(result, Err(MusicApiError::Api(400, _))));
        assert_eq!(attempts, 1); // Should not retry
        assert!(sleeper.waits.lock().unwrap().is_empty());
    }
}
