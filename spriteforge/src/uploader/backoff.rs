//! Exponential backoff for retriable remote operations.
//!
//! Both phases of the upload protocol (submit and poll) retry independently
//! with the same delay law: `min(base * 2^(k-1), cap)` for the k-th retry.
//! Delays are scheduled with `tokio::time::sleep`, never busy-waits.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Default maximum attempts for the submit phase (including the first).
pub const DEFAULT_SUBMIT_ATTEMPTS: u32 = 5;

/// Default maximum attempts for the poll phase (including the first).
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;

/// How a retriable operation backs off between attempts.
///
/// `max_attempts` counts the initial attempt; a policy with `max_attempts`
/// of 1 never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the initial one.
    pub max_attempts: u32,
    /// Delay after the first failure.
    pub base_delay: Duration,
    /// Cap applied to the exponential delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Policy for asset submissions: 5 attempts, 1s base, 16s cap.
    pub fn submit() -> Self {
        Self {
            max_attempts: DEFAULT_SUBMIT_ATTEMPTS,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(16_000),
        }
    }

    /// Policy for operation polling: 10 attempts, 315ms base, 15s cap.
    pub fn poll() -> Self {
        Self {
            max_attempts: DEFAULT_POLL_ATTEMPTS,
            base_delay: Duration::from_millis(315),
            max_delay: Duration::from_millis(15_000),
        }
    }

    /// Delay before retry `attempt` (1-based), or `None` when the budget is
    /// exhausted.
    ///
    /// `attempt` is the number of attempts already made; the returned delay
    /// precedes attempt `attempt + 1`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 2f64.powi(attempt.saturating_sub(1) as i32);
        let delay_ms = self.base_delay.as_millis() as f64 * factor;
        let delay = Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as f64) as u64);
        Some(delay.min(self.max_delay))
    }
}

/// Run `operation` until it succeeds or the policy's budget is exhausted.
///
/// Surfaces the last error once no more retries are allowed. Each failure is
/// logged with the attempt count and the delay before the next try.
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => match policy.delay_for_attempt(attempt) {
                Some(delay) => {
                    warn!(
                        operation = what,
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    warn!(
                        operation = what,
                        attempts = attempt,
                        error = %err,
                        "retry budget exhausted"
                    );
                    return Err(err);
                }
            },
        }
    }
}
