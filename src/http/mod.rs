//! HTTP transport module
//!
//! The core never talks to the network directly; it goes through the
//! [`Transport`] trait. [`HttpClient`] is the reqwest-backed implementation.
//!
//! # Features
//!
//! - **Cancellation**: every call takes a `CancellationToken`, checked before sending
//! - **Deadlines**: [`with_deadline`] links a caller token with a bounded timeout
//! - **Throttling**: optional token-bucket pacing using governor
//!
//! There is no retry or backoff here; that belongs to the session layer.

mod client;
mod deadline;
mod rate_limit;
mod transport;

pub use client::HttpClient;
pub use deadline::with_deadline;
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use transport::Transport;
