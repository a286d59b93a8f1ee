//! Racing an operation against a deadline without cancelling it.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The raced operation was still running when the deadline passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Run `fut` on its own task and wait at most `limit` for it.
///
/// On timeout only the caller stops waiting: the task is detached and keeps
/// running to completion, and its output is dropped.
pub async fn race_timeout<F>(limit: Duration, fut: F) -> Result<F::Output, TimedOut>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = tokio::spawn(fut);
    match tokio::time::timeout(limit, handle).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Ok(Err(_)) | Err(_) => Err(TimedOut(limit)),
    }
}
