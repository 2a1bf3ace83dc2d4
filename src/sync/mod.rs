//! Async coordination primitives
//!
//! - [`FairRwLock`] - reader/writer lock with writer priority and batched
//!   reader wake-up, guarding shared site metadata
//! - [`AsyncLazy`] - single-flight lazy initializer

mod lazy;
mod rwlock;

pub use lazy::AsyncLazy;
pub use rwlock::{FairRwLock, LockHandle, LockKind, LockSnapshot};
