//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Wiki API client CLI
#[derive(Parser, Debug)]
#[command(name = "wikiclient")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Endpoint expression (URL or bare host); overrides the config file
    #[arg(short, long, global = true)]
    pub endpoint: Option<String>,

    /// Site configuration file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the API endpoint for an expression
    Discover {
        /// URL or bare host
        expression: String,

        /// Also print every probed candidate
        #[arg(long)]
        detailed: bool,
    },

    /// Show site metadata
    SiteInfo {
        /// Fetch fresh metadata instead of the first cached load
        #[arg(long)]
        refresh: bool,
    },

    /// Run a paginated query
    List {
        /// Request parameter as key=value (repeatable)
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// Stop after this many pages
        #[arg(long)]
        max_pages: Option<u64>,
    },

    /// Fetch a token
    Token {
        /// Token kind, e.g. csrf
        #[arg(default_value = "csrf")]
        kind: String,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

fn parse_param(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))
}
