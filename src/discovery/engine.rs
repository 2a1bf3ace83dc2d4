//! Probe engine

use super::types::{
    extract_rsd_base, is_api_body, normalize_expression, strip_query, DiscoveryReport,
    EndpointCandidate, ProbeOutcome,
};
use crate::config::DEFAULT_PROBE_TIMEOUT_SECS;
use crate::error::Result;
use crate::http::{with_deadline, Transport};
use crate::types::{params, HttpResponse, QueryParams};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Locates the JSON API endpoint behind a URL or host expression
///
/// Each network step runs under the probe deadline linked with the caller's
/// token. A deadline hit is `Error::Timeout`; caller cancellation is
/// `Error::Cancelled`. Non-200 probe statuses and bodies that are not JSON
/// only reject the candidate. Transport faults propagate.
pub struct EndpointDiscovery {
    transport: Arc<dyn Transport>,
    probe_timeout: Duration,
}

impl EndpointDiscovery {
    /// Create a discovery engine with the default 10 second probe deadline
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
        }
    }

    /// Set the probe deadline
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Probe deadline
    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Find the API endpoint for `expression`, or `None`
    pub async fn discover(
        &self,
        expression: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        Ok(self.discover_detailed(expression, cancel).await?.endpoint)
    }

    /// Like [`discover`](Self::discover), also reporting every candidate tried
    pub async fn discover_detailed(
        &self,
        expression: &str,
        cancel: &CancellationToken,
    ) -> Result<DiscoveryReport> {
        let candidate = normalize_expression(expression)?;
        let mut report = DiscoveryReport::default();

        debug!("Probing {candidate} directly");
        if self.try_candidate(&candidate, &mut report, cancel).await? {
            return Ok(report);
        }

        debug!("Direct probe failed; fetching {candidate} for an RSD hint");
        let document = self.fetch(&candidate, &QueryParams::new(), cancel).await?;
        if !(document.is_success() || document.is_client_error()) {
            debug!("Document fetch returned {}; giving up", document.status);
            return Ok(report);
        }

        let Some(base) = extract_rsd_base(&document.body) else {
            debug!("No RSD hint in {}", document.url);
            return Ok(report);
        };
        let resolved = match Url::parse(&document.url).and_then(|url| url.join(base)) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("Unusable RSD hint {base:?} in {}: {e}", document.url);
                return Ok(report);
            }
        };

        debug!("Probing RSD hint {resolved}");
        self.try_candidate(resolved.as_str(), &mut report, cancel)
            .await?;
        Ok(report)
    }

    /// Probe one candidate URL; `Some` with the confirmed URL on success
    pub async fn probe(
        &self,
        candidate: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let probe_params = params([("action", "query"), ("format", "json")]);
        let response = self.fetch(candidate, &probe_params, cancel).await?;

        if response.status != 200 || !is_api_body(&response.body) {
            debug!(
                "Rejected {candidate}: status {}, {} byte body",
                response.status,
                response.body.len()
            );
            return Ok(None);
        }
        Ok(Some(strip_query(&response.url).to_string()))
    }

    async fn try_candidate(
        &self,
        url: &str,
        report: &mut DiscoveryReport,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let mut candidate = EndpointCandidate::new(url);
        let confirmed = self.probe(url, cancel).await?;
        candidate.outcome = match &confirmed {
            Some(endpoint) => ProbeOutcome::Confirmed(endpoint.clone()),
            None => ProbeOutcome::Rejected,
        };
        report.candidates.push(candidate);

        match confirmed {
            Some(endpoint) => {
                info!("Discovered API endpoint {endpoint}");
                report.endpoint = Some(endpoint);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fetch(
        &self,
        url: &str,
        query: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse> {
        let transport = Arc::clone(&self.transport);
        with_deadline(cancel, self.probe_timeout, |linked| async move {
            transport.get(url, query, &linked).await
        })
        .await
    }
}

impl std::fmt::Debug for EndpointDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointDiscovery")
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}
