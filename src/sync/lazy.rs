//! Single-flight lazy initializer
//!
//! Wraps one async factory so it runs at most once. Every caller, concurrent
//! or later, observes the same outcome; a failure is shared too and never
//! retried.

use crate::error::{Error, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

type SharedOutcome<T> = Shared<BoxFuture<'static, std::result::Result<T, Arc<Error>>>>;

/// Lazily computed value shared by all callers
pub struct AsyncLazy<T>
where
    T: Clone + Send + Sync + 'static,
{
    outcome: SharedOutcome<T>,
    started: AtomicBool,
}

impl<T> AsyncLazy<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Run `factory` on the first caller's task
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let outcome = async move { factory().await.map_err(Arc::new) }
            .boxed()
            .shared();
        Self {
            outcome,
            started: AtomicBool::new(false),
        }
    }

    /// Run `factory` on its own runtime task, so it keeps going even if
    /// every waiter goes away
    pub fn spawned<F, Fut>(factory: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        Self::new(move || async move {
            match tokio::spawn(factory()).await {
                Ok(result) => result,
                Err(join) => Err(Error::Other(format!("initializer task failed: {join}"))),
            }
        })
    }

    /// Already-computed value
    pub fn ready(value: T) -> Self {
        Self::new(move || async move { Ok(value) })
    }

    /// Start the computation without waiting for it. Must be called from
    /// inside a tokio runtime. Does nothing if already started.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Pre-warming lazy value");
        let outcome = self.outcome.clone();
        tokio::spawn(async move {
            // Outcome is observed through `get`.
            let _ = outcome.await;
        });
    }

    /// Wait for the value, starting it if needed
    pub async fn get(&self) -> Result<T> {
        self.started.store(true, Ordering::SeqCst);
        self.outcome.clone().await.map_err(Error::Shared)
    }

    /// Like [`get`](Self::get), but stop waiting when `cancel` fires.
    ///
    /// Cancelling one waiter does not cancel the shared computation.
    pub async fn get_with_cancel(&self, cancel: &CancellationToken) -> Result<T> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            result = self.get() => result,
        }
    }

    /// True once `get` or `start` has been called
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Completed outcome, if any, without waiting
    pub fn peek(&self) -> Option<Result<T>> {
        self.outcome
            .peek()
            .map(|outcome| outcome.clone().map_err(Error::Shared))
    }
}

impl<T> std::fmt::Debug for AsyncLazy<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncLazy")
            .field("started", &self.is_started())
            .field("completed", &self.outcome.peek().is_some())
            .finish()
    }
}
