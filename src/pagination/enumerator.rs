//! Continuation-driven query enumerator

use super::types::{Advance, ContinuationCursor, EnumeratorState, RawResultPage};
use crate::config::DEFAULT_RESULT_KEY;
use crate::decode::{decode_envelope, take_key};
use crate::error::{Error, Result};
use crate::http::Transport;
use crate::types::{Method, QueryParams};
use futures::Stream;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Pull-based sequence over a paginated listing
///
/// Built from a base parameter set that already names a listing action
/// (e.g. `action=query&list=allpages`). Each [`advance`](Self::advance)
/// issues as many round trips as needed to produce the next non-empty page.
/// Not restartable: once `End` or an error is returned the instance is done.
pub struct QueryEnumerator {
    transport: Arc<dyn Transport>,
    endpoint: String,
    params: QueryParams,
    method: Method,
    result_key: String,
    state: EnumeratorState,
    cursor: ContinuationCursor,
    pages_yielded: u64,
    empty_pages: u64,
}

impl QueryEnumerator {
    /// Create an enumerator over `endpoint` starting from `params`
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        params: QueryParams,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            params,
            method: Method::GET,
            result_key: DEFAULT_RESULT_KEY.to_string(),
            state: EnumeratorState::Running,
            cursor: ContinuationCursor::empty(),
            pages_yielded: 0,
            empty_pages: 0,
        }
    }

    /// Set the request method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set the key results are found under
    #[must_use]
    pub fn with_result_key(mut self, key: impl Into<String>) -> Self {
        self.result_key = key.into();
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> EnumeratorState {
        self.state
    }

    /// Parameters the next request would carry
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Cursor from the most recent response
    pub fn cursor(&self) -> &ContinuationCursor {
        &self.cursor
    }

    /// Pages returned so far
    pub fn pages_yielded(&self) -> u64 {
        self.pages_yielded
    }

    /// Responses that carried continuation but no payload
    pub fn empty_pages(&self) -> u64 {
        self.empty_pages
    }

    /// Produce the next page, `End`, or the first fault.
    ///
    /// Cancellation is checked before every request. After `End` this keeps
    /// returning `End`; after a fault it returns
    /// [`Error::EnumerationFinished`].
    pub async fn advance(&mut self, cancel: &CancellationToken) -> Result<Advance> {
        match self.state {
            EnumeratorState::Ended => return Ok(Advance::End),
            EnumeratorState::Faulted => return Err(Error::EnumerationFinished),
            EnumeratorState::Running => {}
        }

        match self.step(cancel).await {
            Ok(Advance::End) => {
                self.state = EnumeratorState::Ended;
                Ok(Advance::End)
            }
            Ok(page) => Ok(page),
            Err(e) => {
                debug!("Query enumeration against {} faulted: {e}", self.endpoint);
                self.state = EnumeratorState::Faulted;
                Err(e)
            }
        }
    }

    async fn step(&mut self, cancel: &CancellationToken) -> Result<Advance> {
        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let response = self
                .transport
                .send(self.method, &self.endpoint, &self.params, cancel)
                .await?;

            let mut body = decode_envelope(response)?;
            let cursor = ContinuationCursor::from_response(&body);
            let page = take_key(&mut body, &self.result_key);

            if cursor.is_empty() {
                self.cursor = cursor;
                return Ok(match page {
                    Some(page) => {
                        self.state = EnumeratorState::Ended;
                        self.pages_yielded += 1;
                        Advance::Page(page)
                    }
                    None => Advance::End,
                });
            }

            if !cursor.apply_to(&mut self.params) {
                debug!(
                    "Continuation from {} left the request unchanged; querying again",
                    self.endpoint
                );
            }
            self.cursor = cursor;

            match page {
                Some(page) => {
                    self.pages_yielded += 1;
                    return Ok(Advance::Page(page));
                }
                None => {
                    self.empty_pages += 1;
                    warn!(
                        "Empty page from {} with continuation present; querying again",
                        self.endpoint
                    );
                }
            }
        }
    }

    /// Drain the remaining pages into a vector
    pub async fn collect_all(mut self, cancel: &CancellationToken) -> Result<Vec<RawResultPage>> {
        let mut pages = Vec::new();
        while let Advance::Page(page) = self.advance(cancel).await? {
            pages.push(page);
        }
        Ok(pages)
    }

    /// Adapt into a stream that ends after `End` or the first error
    pub fn into_stream(
        self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<RawResultPage>> + Send {
        futures::stream::unfold(Some(self), move |enumerator| {
            let cancel = cancel.clone();
            async move {
                let mut enumerator = enumerator?;
                match enumerator.advance(&cancel).await {
                    Ok(Advance::Page(page)) => Some((Ok(page), Some(enumerator))),
                    Ok(Advance::End) => None,
                    Err(e) => Some((Err(e), None)),
                }
            }
        })
    }
}

impl std::fmt::Debug for QueryEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEnumerator")
            .field("endpoint", &self.endpoint)
            .field("params", &self.params)
            .field("state", &self.state)
            .field("pages_yielded", &self.pages_yielded)
            .finish_non_exhaustive()
    }
}
