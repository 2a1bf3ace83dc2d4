//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::SiteConfig;
use crate::discovery::{EndpointDiscovery, ProbeOutcome};
use crate::error::{Error, Result};
use crate::http::{HttpClient, Transport};
use crate::pagination::Advance;
use crate::site::Site;
use crate::types::QueryParams;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
    cancel: CancellationToken,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            cancel: CancellationToken::new(),
        }
    }

    /// Token cancelled on ctrl-c
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let cancel = self.cancel.clone();
        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                cancel.cancel();
            }
        });

        let result = match &self.cli.command {
            Commands::Discover {
                expression,
                detailed,
            } => self.discover(expression, *detailed).await,
            Commands::SiteInfo { refresh } => self.site_info(*refresh).await,
            Commands::List { params, max_pages } => self.list(params, *max_pages).await,
            Commands::Token { kind } => self.token(kind).await,
        };

        interrupt.abort();
        result
    }

    /// Load site configuration from the config file and/or `--endpoint`
    fn load_config(&self) -> Result<SiteConfig> {
        let config = match (&self.cli.config, &self.cli.endpoint) {
            (Some(path), endpoint) => {
                let config = SiteConfig::from_file(path)?;
                match endpoint {
                    Some(endpoint) => config.with_endpoint(endpoint.clone()),
                    None => config,
                }
            }
            (None, Some(endpoint)) => SiteConfig::new(endpoint.clone()),
            (None, None) => {
                return Err(Error::config(
                    "No site given (use --endpoint or --config)",
                ))
            }
        };
        config.validate()?;
        Ok(config)
    }

    fn build_site(&self) -> Result<Site> {
        let config = self.load_config()?;
        info!("Using site {}", config.endpoint);
        let site = Site::from_config(config)?;
        site.warm_up();
        Ok(site)
    }

    /// Run discovery on a bare expression
    async fn discover(&self, expression: &str, detailed: bool) -> Result<()> {
        let config = match &self.cli.config {
            Some(path) => SiteConfig::from_file(path)?,
            None => SiteConfig::new(expression),
        };
        let transport: Arc<dyn Transport> =
            Arc::new(HttpClient::with_config(config.http.clone())?);
        let discovery =
            EndpointDiscovery::new(transport).with_probe_timeout(config.probe_timeout());

        let report = discovery.discover_detailed(expression, &self.cancel).await?;

        if detailed {
            for candidate in &report.candidates {
                let outcome = match &candidate.outcome {
                    ProbeOutcome::Untested => "untested",
                    ProbeOutcome::Confirmed(_) => "confirmed",
                    ProbeOutcome::Rejected => "rejected",
                };
                self.output_message(&json!({
                    "type": "CANDIDATE",
                    "candidate": { "url": candidate.url, "outcome": outcome }
                }));
            }
        }

        match report.endpoint {
            Some(endpoint) => {
                self.output_message(&json!({ "type": "ENDPOINT", "endpoint": endpoint }));
                Ok(())
            }
            None => Err(Error::EndpointNotFound {
                expression: expression.to_string(),
            }),
        }
    }

    async fn site_info(&self, refresh: bool) -> Result<()> {
        let site = self.build_site()?;
        let info = if refresh {
            site.refresh_site_info(&self.cancel).await?
        } else {
            site.site_info(&self.cancel).await?
        };
        let endpoint = site.api_endpoint(&self.cancel).await?;
        self.output_message(&json!({
            "type": "SITE_INFO",
            "endpoint": endpoint,
            "site_info": info.as_ref(),
        }));
        Ok(())
    }

    async fn list(&self, pairs: &[(String, String)], max_pages: Option<u64>) -> Result<()> {
        let site = self.build_site()?;

        let mut params: QueryParams = pairs.iter().cloned().collect();
        params
            .entry("action".to_string())
            .or_insert_with(|| "query".to_string());
        params
            .entry("format".to_string())
            .or_insert_with(|| "json".to_string());

        let mut enumerator = site.query(params, &self.cancel).await?;
        let mut page_number = 0_u64;
        while max_pages.map_or(true, |max| page_number < max) {
            match enumerator.advance(&self.cancel).await? {
                Advance::Page(page) => {
                    page_number += 1;
                    self.output_message(&json!({
                        "type": "PAGE",
                        "page": page_number,
                        "data": page,
                    }));
                }
                Advance::End => break,
            }
        }

        self.output_message(&json!({
            "type": "SUMMARY",
            "pages": page_number,
            "empty_pages": enumerator.empty_pages(),
            "complete": enumerator.state().is_terminal(),
        }));
        Ok(())
    }

    async fn token(&self, kind: &str) -> Result<()> {
        let site = self.build_site()?;
        let token = site.token(kind, &self.cancel).await?;
        self.output_message(&json!({ "type": "TOKEN", "kind": kind, "token": token }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}
