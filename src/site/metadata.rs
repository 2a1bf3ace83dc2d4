//! Lock-guarded site metadata

use crate::error::Result;
use crate::sync::FairRwLock;
use crate::types::JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct MetadataCell {
    site_info: Option<Arc<JsonValue>>,
    tokens: HashMap<String, String>,
}

/// Site metadata shared by every operation on one site
///
/// Reads take the reader side of [`FairRwLock`], updates the writer side.
/// Nothing here performs I/O, so the lock is only held for the copy.
#[derive(Debug, Default)]
pub struct MetadataStore {
    lock: FairRwLock,
    // Exclusion comes from `lock`; the mutex only provides interior mutability.
    cell: Mutex<MetadataCell>,
}

impl MetadataStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding this store
    pub fn lock(&self) -> &FairRwLock {
        &self.lock
    }

    fn cell(&self) -> MutexGuard<'_, MetadataCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current site info, if loaded
    pub async fn site_info(&self, cancel: &CancellationToken) -> Result<Option<Arc<JsonValue>>> {
        let _read = self.lock.read(cancel).await?;
        let info = self.cell().site_info.clone();
        Ok(info)
    }

    /// Store `info` unless something is already there; returns what is stored
    pub async fn install_site_info(
        &self,
        info: Arc<JsonValue>,
        cancel: &CancellationToken,
    ) -> Result<Arc<JsonValue>> {
        let _write = self.lock.write(cancel).await?;
        let stored = Arc::clone(self.cell().site_info.get_or_insert(info));
        Ok(stored)
    }

    /// Replace site info unconditionally
    pub async fn replace_site_info(
        &self,
        info: Arc<JsonValue>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _write = self.lock.write(cancel).await?;
        self.cell().site_info = Some(info);
        Ok(())
    }

    /// Cached token of `kind`
    pub async fn token(&self, kind: &str, cancel: &CancellationToken) -> Result<Option<String>> {
        let _read = self.lock.read(cancel).await?;
        let token = self.cell().tokens.get(kind).cloned();
        Ok(token)
    }

    /// Cache a token
    pub async fn insert_token(
        &self,
        kind: &str,
        value: String,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let _write = self.lock.write(cancel).await?;
        self.cell().tokens.insert(kind.to_string(), value);
        Ok(())
    }

    /// Forget every cached token
    pub async fn clear_tokens(&self, cancel: &CancellationToken) -> Result<()> {
        let _write = self.lock.write(cancel).await?;
        self.cell().tokens.clear();
        Ok(())
    }
}
