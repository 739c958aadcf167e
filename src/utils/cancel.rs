//! Cancellation and deadline helpers shared by the core operations

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::error::{AppError, AppResult};

/// Run `fut` until it completes or `cancel` fires.
///
/// Dropping the inner future aborts whatever remote call it had in flight.
pub async fn cancellable<T, F>(cancel: &CancellationToken, what: &str, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled(format!("{} was cancelled", what))),
        result = fut => result,
    }
}

/// Bound `fut` by an optional deadline, cancelling `cancel` when it expires.
pub async fn with_deadline<T, F>(
    deadline: Option<Duration>,
    cancel: &CancellationToken,
    fut: F,
) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    let Some(deadline) = deadline else {
        return fut.await;
    };

    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => {
            cancel.cancel();
            Err(AppError::Cancelled(format!(
                "request exceeded its {}s deadline",
                deadline.as_secs()
            )))
        }
    }
}
