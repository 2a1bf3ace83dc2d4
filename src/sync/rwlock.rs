//! Fair reader/writer lock
//!
//! State is a single counter (`>0` active readers, `0` free, `-1` one
//! writer), a FIFO of queued writers and one batch of parked readers.
//! Once a writer is queued, new readers park behind it. A released writer
//! hands off to the next live writer; only when none is left is the whole
//! reader batch admitted at once.
//!
//! Waiters are oneshot channels. A waiter that gives up closes its receiver,
//! so a later grant attempt fails and the waiter is skipped.

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Which side of the lock a handle holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockKind {
    Read,
    Write,
}

/// Point-in-time view of the lock, for diagnostics and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSnapshot {
    /// `>0` readers, `0` free, `-1` writer
    pub status: isize,
    /// Writers waiting, including ones that have given up but are not yet pruned
    pub queued_writers: usize,
    /// Live readers parked in the pending batch
    pub pending_readers: usize,
}

#[derive(Debug, Default)]
struct LockState {
    status: isize,
    writers: VecDeque<oneshot::Sender<()>>,
    reader_batch: Vec<oneshot::Sender<()>>,
}

impl LockState {
    fn prune_writers(&mut self) {
        self.writers.retain(|tx| !tx.is_closed());
    }

    fn release_reader(&mut self) {
        debug_assert!(self.status > 0, "reader released while not held");
        self.status = (self.status - 1).max(0);
        if self.status == 0 {
            self.grant_next();
        }
    }

    fn release_writer(&mut self) {
        debug_assert_eq!(self.status, -1, "writer released while not held");
        self.status = 0;
        self.grant_next();
    }

    /// Lock just became free: next live writer, else the reader batch
    fn grant_next(&mut self) {
        while let Some(tx) = self.writers.pop_front() {
            if tx.send(()).is_ok() {
                self.status = -1;
                trace!("rwlock: writer handed ownership");
                return;
            }
        }
        self.admit_readers();
    }

    /// Wake the whole parked batch; requires no writer holding the lock
    fn admit_readers(&mut self) {
        let mut admitted = 0;
        for tx in self.reader_batch.drain(..) {
            if tx.send(()).is_ok() {
                admitted += 1;
            }
        }
        self.status += admitted;
        if admitted > 0 {
            trace!("rwlock: admitted {admitted} parked readers");
        }
    }
}

type SharedState = Arc<Mutex<LockState>>;

fn lock_state(state: &SharedState) -> MutexGuard<'_, LockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Async reader/writer lock with writer priority
///
/// The lock guards no data itself; holders of a [`LockHandle`] are entitled
/// to read or mutate whatever the lock is paired with. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FairRwLock {
    state: SharedState,
}

impl FairRwLock {
    /// Create an unlocked lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the reader side
    pub async fn read(&self, cancel: &CancellationToken) -> Result<LockHandle> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let rx = {
            let mut state = lock_state(&self.state);
            state.prune_writers();
            if state.status >= 0 && state.writers.is_empty() {
                state.status += 1;
                return Ok(self.handle(LockKind::Read));
            }
            let (tx, rx) = oneshot::channel();
            state.reader_batch.push(tx);
            rx
        };

        self.wait(rx, LockKind::Read, cancel).await
    }

    /// Acquire the writer side
    pub async fn write(&self, cancel: &CancellationToken) -> Result<LockHandle> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let rx = {
            let mut state = lock_state(&self.state);
            if state.status == 0 {
                state.status = -1;
                return Ok(self.handle(LockKind::Write));
            }
            let (tx, rx) = oneshot::channel();
            state.writers.push_back(tx);
            rx
        };

        self.wait(rx, LockKind::Write, cancel).await
    }

    /// Take the reader side only if no waiting is needed
    pub fn try_read(&self) -> Option<LockHandle> {
        let mut state = lock_state(&self.state);
        state.prune_writers();
        if state.status >= 0 && state.writers.is_empty() {
            state.status += 1;
            Some(self.handle(LockKind::Read))
        } else {
            None
        }
    }

    /// Take the writer side only if the lock is free
    pub fn try_write(&self) -> Option<LockHandle> {
        let mut state = lock_state(&self.state);
        if state.status == 0 {
            state.status = -1;
            Some(self.handle(LockKind::Write))
        } else {
            None
        }
    }

    /// Current counter and queue lengths
    pub fn snapshot(&self) -> LockSnapshot {
        let state = lock_state(&self.state);
        LockSnapshot {
            status: state.status,
            queued_writers: state.writers.len(),
            pending_readers: state.reader_batch.len(),
        }
    }

    fn handle(&self, kind: LockKind) -> LockHandle {
        LockHandle {
            state: Arc::clone(&self.state),
            kind,
            released: false,
        }
    }

    async fn wait(
        &self,
        rx: oneshot::Receiver<()>,
        kind: LockKind,
        cancel: &CancellationToken,
    ) -> Result<LockHandle> {
        let mut waiter = Waiter {
            state: Arc::clone(&self.state),
            kind,
            rx,
            granted: false,
        };

        tokio::select! {
            biased;

            () = cancel.cancelled() => Err(Error::Cancelled),

            res = &mut waiter.rx => match res {
                Ok(()) => {
                    waiter.granted = true;
                    Ok(self.handle(kind))
                }
                // Senders live in the state the waiter itself keeps alive.
                Err(_) => Err(Error::Other("lock waiter dropped without grant".into())),
            },
        }
    }
}

/// A queued acquisition; cleans up if abandoned before completing
struct Waiter {
    state: SharedState,
    kind: LockKind,
    rx: oneshot::Receiver<()>,
    granted: bool,
}

impl Drop for Waiter {
    fn drop(&mut self) {
        if self.granted {
            return;
        }

        // After close() no grant can land; one that already did is returned.
        self.rx.close();
        let raced_grant = self.rx.try_recv().is_ok();

        let mut state = lock_state(&self.state);
        match (self.kind, raced_grant) {
            (LockKind::Read, true) => state.release_reader(),
            (LockKind::Write, true) => state.release_writer(),
            (LockKind::Read, false) => state.reader_batch.retain(|tx| !tx.is_closed()),
            (LockKind::Write, false) => {
                state.prune_writers();
                if state.writers.is_empty() && state.status >= 0 {
                    state.admit_readers();
                }
            }
        }
    }
}

/// Scoped capability for one side of a [`FairRwLock`]
///
/// Dropping the handle releases it. Explicit [`release`](Self::release) is
/// idempotent.
#[derive(Debug)]
pub struct LockHandle {
    state: SharedState,
    kind: LockKind,
    released: bool,
}

impl LockHandle {
    /// Which side this handle holds
    pub fn kind(&self) -> LockKind {
        self.kind
    }

    /// True once released
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Release the lock; a second call does nothing
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut state = lock_state(&self.state);
        match self.kind {
            LockKind::Read => state.release_reader(),
            LockKind::Write => state.release_writer(),
        }
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.release();
    }
}
