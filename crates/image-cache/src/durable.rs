//! Optional disk-backed tier
//!
//! [`DurableTier`] is what the coordinator talks to. It hides whether a store
//! is configured at all and swallows every store error, so an absent store,
//! a failing store and a plain miss all look the same to the caller.

use async_trait::async_trait;
use file_blob_cache::{Blob, BlobCache};

pub use file_blob_cache::CacheStats as DurableStats;
use std::sync::Arc;
use tracing::{debug, warn};

pub type DurableResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// A key/value store of image blobs keyed by source URL
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn get(&self, key: &str) -> DurableResult<Option<Blob>>;

    /// Must tolerate repeated writes of the same key
    async fn put(&self, key: &str, blob: &Blob) -> DurableResult<()>;

    async fn delete_all(&self) -> DurableResult<()>;

    /// Entry counts and hit rates, for stores that keep them
    async fn stats(&self) -> DurableResult<Option<DurableStats>> {
        Ok(None)
    }
}

#[async_trait]
impl DurableStore for BlobCache {
    async fn get(&self, key: &str) -> DurableResult<Option<Blob>> {
        Ok(BlobCache::get(self, key).await?)
    }

    async fn put(&self, key: &str, blob: &Blob) -> DurableResult<()> {
        Ok(BlobCache::put(self, key, blob).await?)
    }

    async fn delete_all(&self) -> DurableResult<()> {
        Ok(BlobCache::delete_all(self).await?)
    }

    async fn stats(&self) -> DurableResult<Option<DurableStats>> {
        Ok(Some(BlobCache::stats(self).await))
    }
}

/// Best-effort wrapper around an optional [`DurableStore`]
#[derive(Clone, Default)]
pub struct DurableTier {
    store: Option<Arc<dyn DurableStore>>,
}

impl DurableTier {
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A tier with no backing store: every lookup misses, every write is dropped
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    pub async fn get(&self, key: &str) -> Option<Blob> {
        let store = self.store.as_ref()?;
        match store.get(key).await {
            Ok(found) => found,
            Err(e) => {
                debug!(url = %key, error = %e, "Durable lookup failed, treating as miss");
                None
            }
        }
    }

    pub async fn put(&self, key: &str, blob: &Blob) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(e) = store.put(key, blob).await {
            warn!(url = %key, error = %e, "Failed to persist image");
        }
    }

    pub async fn delete_all(&self) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        if let Err(e) = store.delete_all().await {
            warn!(error = %e, "Failed to clear durable image store");
        }
    }

    pub async fn stats(&self) -> Option<DurableStats> {
        let store = self.store.as_ref()?;
        match store.stats().await {
            Ok(stats) => stats,
            Err(e) => {
                debug!(error = %e, "Failed to read durable store stats");
                None
            }
        }
    }
}

impl std::fmt::Debug for DurableTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableTier")
            .field("available", &self.is_available())
            .finish()
    }
}
