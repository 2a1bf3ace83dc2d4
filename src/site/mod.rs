//! Site handle
//!
//! Ties the pieces together for one wiki: the endpoint is resolved once
//! through [`EndpointDiscovery`] behind an [`AsyncLazy`], paginated queries
//! run against it, and site metadata (siteinfo, tokens) lives in a
//! [`MetadataStore`] guarded by the fair reader/writer lock.
//!
//! Network fetches for metadata happen outside the lock; only the copy in or
//! out of the store holds it.

mod metadata;

pub use metadata::MetadataStore;

use crate::config::SiteConfig;
use crate::decode::{decode_envelope, take_key};
use crate::discovery::EndpointDiscovery;
use crate::error::{Error, Result};
use crate::http::{HttpClient, Transport};
use crate::pagination::QueryEnumerator;
use crate::sync::AsyncLazy;
use crate::types::{params, JsonValue, Method, QueryParams};
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

/// `siprop` requested for site metadata
const SITEINFO_PROPS: &str = "general|namespaces|namespacealiases";

/// One wiki site
pub struct Site {
    transport: Arc<dyn Transport>,
    config: SiteConfig,
    endpoint: Arc<AsyncLazy<String>>,
    initial_info: AsyncLazy<Arc<JsonValue>>,
    metadata: MetadataStore,
    _shutdown: DropGuard,
}

impl Site {
    /// Create a site whose endpoint is found by discovery on first use
    pub fn new(transport: Arc<dyn Transport>, config: SiteConfig) -> Result<Self> {
        config.validate()?;
        let shutdown = CancellationToken::new();

        let discovery =
            EndpointDiscovery::new(Arc::clone(&transport)).with_probe_timeout(config.probe_timeout());
        let expression = config.endpoint.clone();
        let token = shutdown.clone();
        let endpoint = AsyncLazy::spawned(move || async move {
            discovery
                .discover(&expression, &token)
                .await?
                .ok_or(Error::EndpointNotFound { expression })
        });

        Ok(Self::assemble(transport, config, endpoint, shutdown))
    }

    /// Create a site with an already-known API endpoint; no discovery runs
    pub fn with_known_endpoint(
        transport: Arc<dyn Transport>,
        config: SiteConfig,
        endpoint: impl Into<String>,
    ) -> Result<Self> {
        config.validate()?;
        let endpoint = AsyncLazy::ready(endpoint.into());
        Ok(Self::assemble(
            transport,
            config,
            endpoint,
            CancellationToken::new(),
        ))
    }

    /// Create a site backed by a reqwest client built from `config.http`
    pub fn from_config(config: SiteConfig) -> Result<Self> {
        let client = HttpClient::with_config(config.http.clone())?;
        Self::new(Arc::new(client), config)
    }

    fn assemble(
        transport: Arc<dyn Transport>,
        config: SiteConfig,
        endpoint: AsyncLazy<String>,
        shutdown: CancellationToken,
    ) -> Self {
        let endpoint = Arc::new(endpoint);

        let initial_info = {
            let transport = Arc::clone(&transport);
            let endpoint = Arc::clone(&endpoint);
            let token = shutdown.clone();
            let method = config.method;
            let result_key = config.result_key.clone();
            AsyncLazy::new(move || async move {
                let url = endpoint.get().await?;
                let info =
                    fetch_site_info(transport.as_ref(), &url, method, &result_key, &token).await?;
                Ok(Arc::new(info))
            })
        };

        Self {
            transport,
            config,
            endpoint,
            initial_info,
            metadata: MetadataStore::new(),
            _shutdown: shutdown.drop_guard(),
        }
    }

    /// Site configuration
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Transport used for every request
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Lock-guarded metadata store
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Start endpoint resolution in the background without waiting
    pub fn warm_up(&self) {
        self.endpoint.start();
    }

    /// Resolved API endpoint. Every caller shares one discovery run and its
    /// outcome; "not found" surfaces as `EndpointNotFound`.
    pub async fn api_endpoint(&self, cancel: &CancellationToken) -> Result<String> {
        self.endpoint.get_with_cancel(cancel).await
    }

    /// One non-paginated API request
    pub async fn request(
        &self,
        params: &QueryParams,
        cancel: &CancellationToken,
    ) -> Result<JsonValue> {
        let url = self.api_endpoint(cancel).await?;
        let response = self
            .transport
            .send(self.config.method, &url, params, cancel)
            .await?;
        decode_envelope(response)
    }

    /// Paginated query over `params` (which must name a listing action)
    pub async fn query(
        &self,
        params: QueryParams,
        cancel: &CancellationToken,
    ) -> Result<QueryEnumerator> {
        let url = self.api_endpoint(cancel).await?;
        Ok(QueryEnumerator::new(Arc::clone(&self.transport), url, params)
            .with_method(self.config.method)
            .with_result_key(self.config.result_key.clone()))
    }

    /// Site metadata, loading it on first use
    pub async fn site_info(&self, cancel: &CancellationToken) -> Result<Arc<JsonValue>> {
        if let Some(info) = self.metadata.site_info(cancel).await? {
            return Ok(info);
        }
        let loaded = self.initial_info.get_with_cancel(cancel).await?;
        self.metadata.install_site_info(loaded, cancel).await
    }

    /// Fetch metadata again and replace the stored copy
    pub async fn refresh_site_info(&self, cancel: &CancellationToken) -> Result<Arc<JsonValue>> {
        let url = self.api_endpoint(cancel).await?;
        let info = Arc::new(
            fetch_site_info(
                self.transport.as_ref(),
                &url,
                self.config.method,
                &self.config.result_key,
                cancel,
            )
            .await?,
        );
        self.metadata
            .replace_site_info(Arc::clone(&info), cancel)
            .await?;
        info!("Refreshed site info for {url}");
        Ok(info)
    }

    /// Namespace table from site metadata
    pub async fn namespaces(&self, cancel: &CancellationToken) -> Result<JsonValue> {
        let info = self.site_info(cancel).await?;
        info.get("namespaces")
            .cloned()
            .ok_or_else(|| Error::malformed("site info has no namespaces"))
    }

    /// Token of `kind` (e.g. `csrf`), fetched and cached on first use
    pub async fn token(&self, kind: &str, cancel: &CancellationToken) -> Result<String> {
        if let Some(token) = self.metadata.token(kind, cancel).await? {
            return Ok(token);
        }

        debug!("Fetching {kind} token");
        let body = self
            .request(
                &params([
                    ("action", "query"),
                    ("meta", "tokens"),
                    ("type", kind),
                    ("format", "json"),
                ]),
                cancel,
            )
            .await?;
        let token = body
            .pointer(&format!("/{}/tokens/{kind}token", self.config.result_key))
            .and_then(JsonValue::as_str)
            .ok_or_else(|| Error::malformed(format!("response has no {kind} token")))?
            .to_string();

        self.metadata
            .insert_token(kind, token.clone(), cancel)
            .await?;
        Ok(token)
    }

    /// Drop every cached token
    pub async fn invalidate_tokens(&self, cancel: &CancellationToken) -> Result<()> {
        self.metadata.clear_tokens(cancel).await
    }
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

async fn fetch_site_info(
    transport: &dyn Transport,
    url: &str,
    method: Method,
    result_key: &str,
    cancel: &CancellationToken,
) -> Result<JsonValue> {
    let request = params([
        ("action", "query"),
        ("meta", "siteinfo"),
        ("siprop", SITEINFO_PROPS),
        ("format", "json"),
    ]);
    let mut body = decode_envelope(transport.send(method, url, &request, cancel).await?)?;
    take_key(&mut body, result_key).ok_or_else(|| Error::malformed("site info response is empty"))
}
