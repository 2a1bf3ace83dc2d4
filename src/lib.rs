// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # wikiclient
//!
//! Async client core for MediaWiki-style JSON APIs.
//!
//! ## Features
//!
//! - **Endpoint Discovery**: Turn a bare host or any page URL into the API URL,
//!   following RSD hints when the direct probe fails
//! - **Continuation Queries**: Page through `list=`/`prop=` results with both
//!   the modern `continue` and legacy `query-continue` formats
//! - **Fair Metadata Locking**: Writer-priority async reader/writer lock with
//!   cancellable acquisition
//! - **Single-Flight Init**: Expensive setup runs once and every caller shares
//!   the outcome
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wikiclient::{params, Site, SiteConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> wikiclient::Result<()> {
//!     let site = Site::from_config(SiteConfig::new("en.wikipedia.org"))?;
//!     let cancel = CancellationToken::new();
//!
//!     let info = site.site_info(&cancel).await?;
//!     println!("{}", info["general"]["sitename"]);
//!
//!     let query = params([("action", "query"), ("list", "allpages"), ("format", "json")]);
//!     let pages = site.query(query, &cancel).await?.collect_all(&cancel).await?;
//!     println!("{} pages", pages.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                            Site                              │
//! │  api_endpoint()   query()   site_info()   token()            │
//! └──────────────────────────────────────────────────────────────┘
//!          │                 │                     │
//! ┌────────┴──────┬──────────┴──────┬──────────────┴────────────┐
//! │   Discovery   │   Pagination    │          Sync             │
//! ├───────────────┼─────────────────┼───────────────────────────┤
//! │ Direct probe  │ Continue cursor │ FairRwLock                │
//! │ RSD fallback  │ Legacy merge    │ AsyncLazy                 │
//! └───────────────┴─────────────────┴───────────────────────────┘
//!          │                 │
//! ┌────────┴─────────────────┴───────────────────────────────────┐
//! │  HTTP: Transport trait, reqwest client, deadlines, throttle  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Site configuration
pub mod config;

/// HTTP transport, deadlines and rate limiting
pub mod http;

/// API response envelope handling
pub mod decode;

/// Continuation cursor and paginated query enumerator
pub mod pagination;

/// API endpoint discovery
pub mod discovery;

/// Fair reader/writer lock and single-flight initializer
pub mod sync;

/// Site handle tying discovery, queries and metadata together
pub mod site;

/// Command-line interface
pub mod cli;

#[cfg(test)]
mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{HttpConfig, SiteConfig};
pub use discovery::{DiscoveryReport, EndpointDiscovery};
pub use http::{HttpClient, Transport};
pub use pagination::{Advance, ContinuationCursor, QueryEnumerator};
pub use site::{MetadataStore, Site};
pub use sync::{AsyncLazy, FairRwLock, LockHandle};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
