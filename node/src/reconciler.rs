// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Settlement/Sync Reconciler.
//!
//! Bridges "broadcast accepted" and "observable in reads" with bounded
//! polling. Polls are stateless, so dropping a pending future at any await
//! point has no side effects.

use std::future::Future;

use crate::config::{BackoffPolicy, PollOptions};
use crate::errors::NodeError;

/// Polls until `predicate` holds, at most `options.max_attempts` times.
///
/// The first poll is immediate; later polls are spaced by
/// `options.interval`. Retryable poll errors use up an attempt, any other
/// error is returned at once.
pub async fn await_condition<T, F, Fut, P>(mut poll: F, mut predicate: P, options: &PollOptions) -> Result<T, NodeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NodeError>>,
    P: FnMut(&T) -> bool,
{
    for attempt in 1..=options.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(options.interval).await;
        }
        metrics::increment_counter!("platform_reconcile_attempts");

        match poll().await {
            Ok(value) if predicate(&value) => {
                tracing::debug!(attempt, "condition satisfied");
                return Ok(value);
            }
            Ok(_) => {}
            Err(e) if e.is_retryable() => {
                tracing::warn!(attempt, error = %e, "poll failed, will retry");
            }
            Err(e) => return Err(e),
        }
    }

    tracing::warn!(attempts = options.max_attempts, "condition not met");
    Err(NodeError::Timeout { attempts: options.max_attempts })
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up.
pub async fn retry_with_backoff<T, F, Fut>(mut op: F, policy: &BackoffPolicy) -> Result<T, NodeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NodeError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(attempt, ?delay, error = %e, "transient failure, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RemoteError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn options(max_attempts: u32) -> PollOptions {
        PollOptions::new(Duration::from_millis(100), max_attempts)
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_on_first_satisfying_poll() {
        let calls = &AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let value = await_condition(
            || async move { Ok::<_, NodeError>(calls.fetch_add(1, Ordering::SeqCst) + 1) },
            |n| *n == 3,
            &options(5),
        )
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Two sleeps between three polls.
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let err = await_condition(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, NodeError>(false)
            },
            |done| *done,
            &options(4),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, NodeError::Timeout { attempts: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_consume_attempts() {
        let calls = &AtomicU32::new(0);
        let value = await_condition(
            || async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(NodeError::Remote(RemoteError::Unavailable("flaky".into()))),
                    n => Ok(n),
                }
            },
            |_| true,
            &options(3),
        )
        .await
        .unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_stops_polling() {
        let calls = &AtomicU32::new(0);
        let err = await_condition(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(NodeError::Codec("bad".into()))
            },
            |_| true,
            &options(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, NodeError::Codec(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_retries_transport_failures_only() {
        let policy = BackoffPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            multiplier: 2,
        };

        let calls = &AtomicU32::new(0);
        let start = tokio::time::Instant::now();
        let err = retry_with_backoff(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(NodeError::Remote(RemoteError::Unavailable("down".into())))
            },
            &policy,
        )
        .await
        .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(300));

        let calls = &AtomicU32::new(0);
        let err = retry_with_backoff(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(NodeError::Timeout { attempts: 1 })
            },
            &policy,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, NodeError::Timeout { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
