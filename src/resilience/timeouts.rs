//! Timeout enforcement.
//!
//! Every storage call is wrapped in a deadline. An elapsed deadline is an
//! infrastructure failure, distinct from the business outcome of the call.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The operation did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{operation} timed out after {}ms", .limit.as_millis())]
pub struct DeadlineExceeded {
    pub operation: &'static str,
    pub limit: Duration,
}

/// Run `fut` to completion or fail once `limit` elapses.
///
/// The inner future is dropped on timeout.
pub async fn with_deadline<F>(
    operation: &'static str,
    limit: Duration,
    fut: F,
) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DeadlineExceeded { operation, limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn completes_within_deadline() {
        let out = with_deadline("fast", Duration::from_secs(3), async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn fails_after_deadline() {
        let err = with_deadline("slow", Duration::from_secs(3), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
        })
        .await
        .unwrap_err();
        assert_eq!(err.operation, "slow");
        assert_eq!(err.to_string(), "slow timed out after 3000ms");
    }
}
