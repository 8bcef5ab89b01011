//! Bounded retry with a fixed backoff.
//!
//! One helper serves the status poll loop, the outer close retry and tag
//! pushing. Waits are `tokio::time::sleep` raced against a
//! [`CancellationToken`], so nothing spins and cancellation is prompt.

use crate::error::{Result, StagingError};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Attempt budget and the wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Wait after a failed attempt, skipped after the last one
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

/// Attempt counter for loops that cannot be expressed as a closure, e.g.
/// when each attempt needs `&mut self`.
///
/// ```no_run
/// # use kodegen_bundler_staging::staging::retry::{Backoff, RetryPolicy};
/// # use kodegen_bundler_staging::{Result, StagingError};
/// # use tokio_util::sync::CancellationToken;
/// # async fn attempt() -> Result<()> { Ok(()) }
/// # async fn example(policy: RetryPolicy, cancel: CancellationToken) -> Result<()> {
/// let mut backoff = Backoff::new(policy, &cancel, "Upload");
/// loop {
///     backoff.ensure_active()?;
///     match attempt().await {
///         Ok(()) => return Ok(()),
///         Err(e) => backoff.retry_after(e, StagingError::is_retryable).await?,
///     }
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct Backoff<'a> {
    policy: RetryPolicy,
    cancel: &'a CancellationToken,
    label: &'a str,
    attempt: u32,
}

impl<'a> Backoff<'a> {
    pub fn new(policy: RetryPolicy, cancel: &'a CancellationToken, label: &'a str) -> Self {
        Self {
            policy,
            cancel,
            label,
            attempt: 1,
        }
    }

    /// Current attempt, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Fails with [`StagingError::Cancelled`] once the token has fired.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(StagingError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Decides what happens after a failed attempt.
    ///
    /// Returns `Ok(())` after waiting when another attempt is allowed, or
    /// hands `error` back when it is fatal or the budget is spent.
    pub async fn retry_after<P>(&mut self, error: StagingError, should_retry: P) -> Result<()>
    where
        P: Fn(&StagingError) -> bool,
    {
        if self.attempt >= self.max_attempts() || !should_retry(&error) {
            return Err(error);
        }

        log::warn!(
            "{} attempt {}/{} failed: {}. Retrying in {}s",
            self.label,
            self.attempt,
            self.max_attempts(),
            error,
            self.policy.interval.as_secs()
        );
        wait(self.policy.interval, self.cancel).await?;
        self.attempt += 1;
        Ok(())
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent.
///
/// `operation` receives the 1-based attempt number. At most
/// `max_attempts - 1` waits happen. The error of the final attempt is
/// returned unchanged.
pub async fn retry_with_backoff<T, F, Fut, P>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    should_retry: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&StagingError) -> bool,
{
    let mut backoff = Backoff::new(policy, cancel, label);

    loop {
        backoff.ensure_active()?;
        match operation(backoff.attempt()).await {
            Ok(value) => return Ok(value),
            Err(e) => backoff.retry_after(e, &should_retry).await?,
        }
    }
}

/// Sleeps for `duration` unless `cancel` fires first.
pub async fn wait(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => Err(StagingError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> StagingError {
        StagingError::Transport {
            url: "https://example.invalid".into(),
            reason: "connection reset".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_success() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let value = retry_with_backoff(
            RetryPolicy::new(5, Duration::from_secs(60)),
            &CancellationToken::new(),
            "test",
            StagingError::is_retryable,
            |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { if attempt < 3 { Err(transient()) } else { Ok(attempt) } }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn returns_last_error_when_budget_is_spent() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(
            RetryPolicy::new(3, Duration::from_secs(1)),
            &CancellationToken::new(),
            "test",
            StagingError::is_retryable,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            },
        )
        .await;

        assert!(matches!(result, Err(StagingError::Transport { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(
            RetryPolicy::new(3, Duration::from_secs(1)),
            &CancellationToken::new(),
            "test",
            StagingError::is_retryable,
            |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(StagingError::RemoteRejected {
                        message: "denied".into(),
                    })
                }
            },
        )
        .await;

        assert!(matches!(result, Err(StagingError::RemoteRejected { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_the_wait() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let result: Result<()> = retry_with_backoff(
            RetryPolicy::new(10, Duration::from_secs(600)),
            &cancel,
            "test",
            StagingError::is_retryable,
            |_| async { Err(transient()) },
        )
        .await;

        assert!(matches!(result, Err(StagingError::Cancelled)));
    }
}
