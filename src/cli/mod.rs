//! CLI module
//!
//! Command-line interface for poking at a wiki API.
//!
//! # Commands
//!
//! - `discover` - Resolve an endpoint expression to an API URL
//! - `site-info` - Print site metadata
//! - `list` - Run a paginated query and print each page
//! - `token` - Fetch a token of the given kind

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
