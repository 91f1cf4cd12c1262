//! Fail-open utilities for graceful degradation
//!
//! A harness run must always end with a verdict, so side work such as
//! checkpoint screenshots or the final settle wait goes through these helpers:
//! failures and timeouts are logged via `tracing::warn!` and turn into `None`.
//!
//! DO NOT use fail-open for:
//! - Browser launch (a run without a browser has nothing to observe)
//! - Initial navigation (same)

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::Result;

/// Run an operation that should fail open
///
/// Logs the error and returns `None` on failure.
///
/// ```no_run
/// use zkcheck_core::fail_open::fail_open;
/// use zkcheck_core::Result;
///
/// async fn capture() -> Result<()> {
///     Ok(())
/// }
///
/// async fn example() {
///     let saved = fail_open("checkpoint screenshot", capture()).await;
///     // saved is None if capture() failed
/// }
/// ```
pub async fn fail_open<Fut, T>(operation_name: &str, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T>>,
{
    match fut.await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

/// Like [`fail_open`] but also gives up once `limit` elapses
///
/// Exceeding the limit is treated the same as an error: the operation is
/// reported as not observed, the caller carries on.
pub async fn fail_open_within<Fut, T>(operation_name: &str, limit: Duration, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(val)) => Some(val),
        Ok(Err(e)) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
        Err(_) => {
            warn!(
                "{} exceeded {}ms (fail-open)",
                operation_name,
                limit.as_millis()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HarnessError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", async { Ok::<_, HarnessError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_failure() {
        let result = fail_open("test_op", async {
            Err::<i32, _>(HarnessError::Screenshot("disk full".to_string()))
        })
        .await;
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_fail_open_within_completes() {
        let result = fail_open_within("test_op", Duration::from_secs(1), async {
            Ok::<_, HarnessError>("done")
        })
        .await;
        assert_eq!(result, Some("done"));
    }

    #[tokio::test]
    async fn test_fail_open_within_times_out() {
        let result = fail_open_within("test_op", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, HarnessError>(1)
        })
        .await;
        assert_eq!(result, None);
    }
}
