//! Bounded retry with exponential backoff
//!
//! Every attempt runs under the policy's per-attempt timeout. Retries stop when
//! the attempt cap is reached, when the next backoff would cross the overall
//! deadline, or when the cancellation token fires. An attempt that is already
//! running is never interrupted by cancellation; only the wait between attempts
//! is.

use crate::core::export::policy::RetryPolicy;
use crate::domain::{QuireError, Result};
use crate::log_retry_attempt;
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Run `operation` until it succeeds or the retry policy gives up.
///
/// The closure receives the 1-based attempt number. Errors for which
/// [`QuireError::is_retryable`] is false are returned immediately.
pub async fn run_with_retry<T, F, Fut>(
    label: &str,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Err(QuireError::Cancelled(format!(
                "{label} not started after attempt {attempt}"
            )));
        }
        attempt += 1;

        let outcome = match tokio::time::timeout(policy.attempt_timeout, operation(attempt)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(QuireError::Timeout(format!(
                "{label} attempt {attempt} exceeded {}s",
                policy.attempt_timeout.as_secs_f64()
            ))),
        };

        let error = match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(label, attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            tracing::debug!(label, attempt, error = %error, "Permanent failure, not retrying");
            return Err(error);
        }

        if attempt >= max_attempts {
            tracing::warn!(
                label,
                attempts = attempt,
                error = %error,
                "Retry attempts exhausted"
            );
            return Err(error);
        }

        let delay = policy.backoff_for(attempt);
        if started.elapsed() + delay >= policy.deadline {
            tracing::warn!(
                label,
                attempts = attempt,
                deadline_secs = policy.deadline.as_secs(),
                error = %error,
                "Retry deadline reached"
            );
            return Err(error);
        }

        log_retry_attempt!(attempt + 1, max_attempts, error.to_string());
        tracing::debug!(label, delay_ms = delay.as_millis() as u64, "Backing off");

        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(QuireError::Cancelled(format!(
                    "{label} cancelled while waiting to retry"
                )));
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
