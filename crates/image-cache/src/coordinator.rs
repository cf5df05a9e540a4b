//! The cache coordinator: memory tier, durable tier, network, and fill
//! deduplication behind a single `resolve`

use crate::config::{
    ImageCacheConfig, PreloadOptions, DEFAULT_LOADING_TIMEOUT, DURABLE_NAMESPACE,
};
use crate::durable::{DurableStats, DurableTier};
use crate::fetch::ImageFetcher;
use crate::in_flight::InFlightTracker;
use crate::store::HandleStore;
use crate::types::{CacheStats, ImageRef};
use file_blob_cache::{Blob, BlobCache};
use image_fetcher::HttpFetcher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(0);

struct Inner {
    handles: HandleStore,
    in_flight: Arc<InFlightTracker<ImageRef>>,
    durable: DurableTier,
    /// Durable writes hold it shared, `clear_all` exclusively
    durable_writes: RwLock<()>,
    fetcher: Arc<dyn ImageFetcher>,
}

/// Deduplicating two-tier image cache
///
/// Cloning is cheap and every clone shares the same state. Each instance has
/// its own handle namespace, so two caches never issue the same handle URI.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<Inner>,
    pub(crate) preload_options: PreloadOptions,
    loading_timeout: Duration,
}

impl ImageCache {
    pub fn new(fetcher: Arc<dyn ImageFetcher>, durable: DurableTier) -> Self {
        let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(Inner {
                handles: HandleStore::new(format!("scrapbook/{}", session)),
                in_flight: Arc::new(InFlightTracker::new()),
                durable,
                durable_writes: RwLock::new(()),
                fetcher,
            }),
            preload_options: PreloadOptions::default(),
            loading_timeout: DEFAULT_LOADING_TIMEOUT,
        }
    }

    /// Defaults used by [`ImageCache::preload`]
    pub fn with_preload_options(mut self, options: PreloadOptions) -> Self {
        self.preload_options = options;
        self
    }

    /// Loading cap used by bindings created with [`ImageBinding::for_cache`]
    ///
    /// [`ImageBinding::for_cache`]: crate::binding::ImageBinding::for_cache
    pub fn with_loading_timeout(mut self, timeout: Duration) -> Self {
        self.loading_timeout = timeout;
        self
    }

    pub fn loading_timeout(&self) -> Duration {
        self.loading_timeout
    }

    /// Build a cache from configuration with the HTTP fetcher and, if a cache
    /// directory is configured and usable, a file-backed durable tier
    pub async fn open(config: &ImageCacheConfig) -> Self {
        let fetcher = Arc::new(HttpFetcher::with_timeout(config.fetch_timeout));

        let durable = match &config.cache_dir {
            Some(dir) => {
                let store = BlobCache::new(dir.clone(), DURABLE_NAMESPACE);
                match store.init().await {
                    Ok(()) => DurableTier::new(Arc::new(store)),
                    Err(e) => {
                        warn!(cache_dir = ?dir, error = %e, "Durable image store unavailable, running memory-only");
                        DurableTier::disabled()
                    }
                }
            }
            None => {
                info!("Durable image store disabled, running memory-only");
                DurableTier::disabled()
            }
        };

        Self::new(fetcher, durable)
            .with_preload_options(config.preload)
            .with_loading_timeout(config.loading_timeout)
    }

    pub fn durable_available(&self) -> bool {
        self.inner.durable.is_available()
    }

    /// Resolve a remote URL to a local handle
    ///
    /// Never fails: an empty URL, a failed fetch, or any other problem yields
    /// `ImageRef::Remote` with the URL unchanged. Concurrent calls for the same
    /// URL share one fill, so at most one network request is made per URL.
    pub async fn resolve(&self, url: &str) -> ImageRef {
        if url.is_empty() {
            return ImageRef::Remote(String::new());
        }

        if let Some(handle) = self.inner.handles.get(url) {
            return ImageRef::Local(handle);
        }

        let inner = Arc::clone(&self.inner);
        let epoch = inner.handles.epoch();
        let owned = url.to_string();
        self.inner
            .in_flight
            .get_or_create(url, move || fill(inner, owned, epoch))
            .await
    }

    /// Whether a handle is in memory right now. Does not look at the durable
    /// tier.
    pub fn is_resolved(&self, url: &str) -> bool {
        self.inner.handles.contains(url)
    }

    /// The cached handle if present, otherwise the URL unchanged
    pub fn peek(&self, url: &str) -> ImageRef {
        match self.inner.handles.get(url) {
            Some(handle) => ImageRef::Local(handle),
            None => ImageRef::Remote(url.to_string()),
        }
    }

    /// Release every handle, forget running fills, and wipe the durable tier
    ///
    /// Fills already running still finish and answer their waiters, but do
    /// not repopulate the cache.
    pub async fn clear_all(&self) {
        let _writes = self.inner.durable_writes.write().await;
        let released = self.inner.handles.release_all();
        let abandoned = self.inner.in_flight.clear();
        self.inner.durable.delete_all().await;
        info!(released, abandoned, "Cleared image cache");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_cached: self.inner.handles.len(),
            loading: self.inner.in_flight.len(),
        }
    }

    /// Store-level counters from the durable tier, if it keeps any
    pub async fn durable_stats(&self) -> Option<DurableStats> {
        self.inner.durable.stats().await
    }
}

/// One cache fill: durable tier, then network
async fn fill(inner: Arc<Inner>, url: String, epoch: u64) -> ImageRef {
    // A fill that finished between the caller's lookup and registration
    if let Some(handle) = inner.handles.get(&url) {
        return ImageRef::Local(handle);
    }

    if let Some(blob) = inner.durable.get(&url).await {
        debug!(url = %url, size = blob.data.len(), "Durable cache hit");
        let handle = inner.handles.mint(&url, blob.content_type, blob.data);
        return ImageRef::Local(inner.handles.insert(&url, handle, epoch));
    }

    let image = match inner.fetcher.fetch(&url).await {
        Ok(image) => image,
        Err(e) => {
            warn!(url = %url, error = %e, "Image fetch failed, falling back to remote URL");
            return ImageRef::Remote(url);
        }
    };

    let blob = Blob::new(image.data, image.content_type);
    let handle = inner
        .handles
        .mint(&url, blob.content_type.clone(), blob.data.clone());
    let handle = inner.handles.insert(&url, handle, epoch);
    debug!(url = %url, uri = %handle.uri(), "Cached image in memory");

    // The epoch check and the write must not straddle a clear
    let _writes = inner.durable_writes.read().await;
    if inner.handles.epoch() == epoch {
        inner.durable.put(&url, &blob).await;
    } else {
        debug!(url = %url, "Cache cleared during fill, skipping durable write");
    }

    ImageRef::Local(handle)
}
