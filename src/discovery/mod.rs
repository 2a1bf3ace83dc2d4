//! Endpoint discovery module
//!
//! Locates and validates the JSON API URL for a user-supplied URL or bare
//! host expression.
//!
//! # Strategy
//!
//! 1. Normalize the expression and add a scheme if it has none
//! 2. Probe `<candidate>?action=query&format=json` directly
//! 3. Otherwise fetch the expression as a document (2xx or 4xx accepted),
//!    look for an `href="...?action=rsd"` hint, resolve it and probe again
//!
//! Not finding an endpoint is `Ok(None)`, not an error.

mod engine;
mod types;

pub use engine::EndpointDiscovery;
pub use types::{
    extract_rsd_base, is_api_body, normalize_expression, strip_query, DiscoveryReport,
    EndpointCandidate, ProbeOutcome,
};
