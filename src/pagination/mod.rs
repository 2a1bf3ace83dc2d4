//! Pagination module
//!
//! Turns the server's cursor-based listing protocol into a single
//! forward-only sequence of result pages.
//!
//! # Overview
//!
//! Each response may carry continuation data in one of two shapes:
//!
//! - **Modern**: `{"continue": {"apcontinue": "B", "continue": "-||"}}`
//! - **Legacy**: `{"query-continue": {"allpages": {"apfrom": "B"}}}`
//!
//! [`ContinuationCursor`] captures whichever is present and merges it into
//! the next request's parameters. [`QueryEnumerator`] drives the
//! request/response loop and yields raw payloads found under the result key.

mod enumerator;
mod types;

pub use enumerator::QueryEnumerator;
pub use types::{
    Advance, ContinuationCursor, ContinuationShape, EnumeratorState, RawResultPage,
    LEGACY_CONTINUE_KEY, MODERN_CONTINUE_KEY,
};

#[cfg(test)]
mod tests;
