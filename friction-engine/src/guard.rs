//! Timeout and cancellation wrapper applied to every external call.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::CallFailure;

/// Run `fut` until it settles, its timeout elapses or `cancel` fires.
///
/// Cancellation wins over a simultaneously ready result so a cancelled run
/// never starts acting on fresh data.
pub async fn guarded<T, F>(
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, CallFailure>
where
    F: Future<Output = anyhow::Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(CallFailure::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CallFailure::Cancelled),
        outcome = tokio::time::timeout(timeout, fut) => match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(CallFailure::failed(&err)),
            Err(_) => Err(CallFailure::timed_out(timeout)),
        },
    }
}
