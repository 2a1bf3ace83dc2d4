//! Bounded operations under a caller's cancellation token

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `op` under both the caller's `cancel` token and a `deadline`.
///
/// `op` receives a child token that is cancelled when either side fires, so
/// an in-flight request is aborted. Caller cancellation is reported as
/// [`Error::Cancelled`]; the deadline firing is reported as
/// [`Error::Timeout`]. If both are ready at once, cancellation wins.
pub async fn with_deadline<T, F, Fut>(
    cancel: &CancellationToken,
    deadline: Duration,
    op: F,
) -> Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let linked = cancel.child_token();
    let _guard = linked.clone().drop_guard();
    let fut = op(linked.clone());

    tokio::select! {
        biased;

        () = cancel.cancelled() => Err(Error::Cancelled),

        () = tokio::time::sleep(deadline) => Err(Error::timeout(deadline)),

        result = fut => match result {
            // The linked token only fires on its own when the parent did.
            Err(Error::Cancelled) if !cancel.is_cancelled() => Err(Error::timeout(deadline)),
            other => other,
        },
    }
}
